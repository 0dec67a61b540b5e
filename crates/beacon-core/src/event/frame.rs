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

use serde::Serialize;
use serde_json::Value;

use super::{EventTable, VirtualEvent};

/// Broadcast to runtime listeners once per main-loop tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FrameEvent {
    /// The tick number, starting at 1.
    pub frame: u64,
    /// Milliseconds since the runtime started.
    pub time: f64,
}

impl FrameEvent {
    /// The event name listeners are keyed on.
    pub const NAME: &'static str = "enterFrame";
}

impl VirtualEvent for FrameEvent {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn push(&self, table: &mut EventTable) {
        if let Ok(Value::Object(fields)) = serde_json::to_value(self) {
            table.extend(fields);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::to_table;

    #[test]
    fn test_frame_fields_are_pushed() {
        let table = to_table(&FrameEvent {
            frame: 3,
            time: 50.0,
        });

        assert_eq!(table["name"], "enterFrame");
        assert_eq!(table["frame"], 3);
        assert_eq!(table["time"], 50.0);
        assert_eq!(table.len(), 3);
    }
}
