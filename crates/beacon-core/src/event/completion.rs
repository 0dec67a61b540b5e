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

/// Reported when playback on an audio channel ends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompletionEvent {
    /// The mixer channel that finished.
    pub channel: u32,
    /// The backend source the channel was bound to.
    pub source: u32,
    /// `true` if playback reached its end, `false` if it was stopped early.
    pub completed: bool,
    /// Lifecycle phase of the channel.
    pub phase: &'static str,
}

impl CompletionEvent {
    /// The event name listeners are keyed on.
    pub const NAME: &'static str = "completion";

    /// Creates a completion event in the `"stopped"` phase.
    pub fn new(channel: u32, source: u32, completed: bool) -> Self {
        Self {
            channel,
            source,
            completed,
            phase: "stopped",
        }
    }
}

impl VirtualEvent for CompletionEvent {
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
    fn test_completion_fields_are_pushed() {
        let table = to_table(&CompletionEvent::new(3, 17, true));

        assert_eq!(table["name"], "completion");
        assert_eq!(table["channel"], 3);
        assert_eq!(table["source"], 17);
        assert_eq!(table["completed"], true);
        assert_eq!(table["phase"], "stopped");
    }
}
