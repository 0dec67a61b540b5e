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

//! # Beacon Script
//!
//! The scripting side of the notification core: script values, the listener
//! registry, the [`ScriptState`] that runtime handles point at, and the
//! [`Notifier`] that delivers events to listeners from any thread.

#![warn(missing_docs)]

pub mod channels;
pub mod error;
pub mod notifier;
pub mod registry;
pub mod state;
pub mod value;

pub use channels::ChannelCallbacks;
pub use error::ScriptError;
pub use notifier::{ListenerMode, Notifier};
pub use registry::{ListenerRef, ListenerRegistry};
pub use state::ScriptState;
pub use value::{ScriptFunction, ScriptTable, ScriptValue};
