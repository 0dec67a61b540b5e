// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! # Beacon Runtime
//!
//! Wires the script state, the main-loop scheduler and notifiers together.
//! Shutting the runtime down invalidates every handle to its state, so
//! background work that outlives it degrades into no-ops.

pub mod config;
pub mod logging;
mod runtime;
mod tasks;

pub use config::RuntimeConfig;
pub use runtime::Runtime;
