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

//! # Beacon Core
//!
//! Foundational crate for delivering work from background threads into a
//! single-threaded scripting runtime.
//!
//! - [`handle`]: invalidation-based handles to resources whose owner may
//!   destroy them at any time.
//! - [`scheduler`] and [`task`]: a lock-free, single-consumer task queue
//!   drained once per main-loop tick.
//! - [`event`]: the payloads handed to scripting listeners.

#![warn(missing_docs)]

pub mod event;
pub mod handle;
pub mod scheduler;
pub mod task;

mod stack;

pub use event::{EventBox, EventTable, VirtualEvent};
pub use handle::{
    create_owned_resource, Handle, HandleAllocator, HandleError, HandleStats, OwnerHandle,
};
pub use scheduler::{RunStats, Scheduler, TaskSender};
pub use task::{Task, TaskContext, TaskId};
