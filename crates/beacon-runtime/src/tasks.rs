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

//! Tasks the runtime schedules on its own behalf.

use std::time::Instant;

use beacon_core::event::FrameEvent;
use beacon_core::{EventBox, Handle, Task, TaskContext};
use beacon_script::ScriptState;

/// Delivers one event to every runtime-wide listener for its name.
pub(crate) struct BroadcastTask {
    state: Handle<ScriptState>,
    event: Option<EventBox>,
}

impl BroadcastTask {
    pub(crate) fn new(state: Handle<ScriptState>, event: EventBox) -> Self {
        Self {
            state,
            event: Some(event),
        }
    }
}

impl Task for BroadcastTask {
    fn execute(&mut self, _ctx: &mut TaskContext<'_>) {
        let Some(event) = self.event.take() else {
            return;
        };
        if let Some(state) = self.state.get() {
            let handled = state.dispatch_event(event.as_ref());
            log::trace!("'{}' handled by {handled} listener(s).", event.name());
        }
    }
}

/// Broadcasts `enterFrame` on every drain until the state goes away.
pub(crate) struct FrameTask {
    state: Handle<ScriptState>,
    started: Instant,
}

impl FrameTask {
    pub(crate) fn new(state: Handle<ScriptState>) -> Self {
        Self {
            state,
            started: Instant::now(),
        }
    }
}

impl Task for FrameTask {
    fn execute(&mut self, ctx: &mut TaskContext<'_>) {
        let Some(state) = self.state.get() else {
            ctx.retire();
            return;
        };
        state.dispatch_event(&FrameEvent {
            frame: ctx.tick(),
            time: self.started.elapsed().as_secs_f64() * 1000.0,
        });
    }

    fn keep_alive(&self) -> bool {
        true
    }
}
