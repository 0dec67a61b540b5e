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

//! Event payloads handed to scripting listeners.
//!
//! An event is opaque to the core: it has a name and knows how to write
//! itself into an [`EventTable`], the table a listener receives. Background
//! producers construct events, hand them to a notifier, and the event is
//! dropped once dispatched or discarded.

mod completion;
mod error;
mod frame;

pub use self::completion::CompletionEvent;
pub use self::error::ErrorEvent;
pub use self::frame::FrameEvent;

use serde_json::Value;

/// The table a listener receives: field names mapped to plain values.
pub type EventTable = serde_json::Map<String, Value>;

/// The field every event table carries with the event's name.
pub const NAME_KEY: &str = "name";

/// An opaque payload describing what happened.
pub trait VirtualEvent: Send {
    /// The event name, e.g. `"completion"`.
    fn name(&self) -> &str;

    /// Writes the event's fields into `table`.
    ///
    /// The `name` field is already present when this is called.
    fn push(&self, _table: &mut EventTable) {}
}

/// An owned, type-erased event.
pub type EventBox = Box<dyn VirtualEvent>;

/// Builds the table a listener receives for `event`.
pub fn to_table(event: &dyn VirtualEvent) -> EventTable {
    let mut table = EventTable::new();
    table.insert(NAME_KEY.to_owned(), Value::from(event.name()));
    event.push(&mut table);
    table
}

/// A named event carrying arbitrary fields.
///
/// Useful for collaborators that do not need a dedicated event type.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomEvent {
    name: String,
    fields: EventTable,
}

impl CustomEvent {
    /// Creates an event with no fields.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: EventTable::new(),
        }
    }

    /// Adds a field, replacing any previous value under `key`.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }
}

impl VirtualEvent for CustomEvent {
    fn name(&self) -> &str {
        &self.name
    }

    fn push(&self, table: &mut EventTable) {
        for (key, value) in &self.fields {
            table.insert(key.clone(), value.clone());
        }
    }
}
