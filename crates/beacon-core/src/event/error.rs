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

use serde_json::Value;

use super::{EventTable, VirtualEvent};

/// Field set to `true` on events that report a failure.
pub const IS_ERROR_KEY: &str = "isError";
/// Field holding the failure's message.
pub const ERROR_MESSAGE_KEY: &str = "errorMessage";
/// Field holding the failure's numeric code.
pub const ERROR_CODE_KEY: &str = "errorCode";

/// An event that may report a failure from a background operation.
///
/// `isError` is always present; message and code only when an error was set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorEvent {
    name: String,
    error: Option<(String, i64)>,
}

impl ErrorEvent {
    /// Creates a successful event named `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            error: None,
        }
    }

    /// Creates an event named `name` reporting `message` and `code`.
    pub fn failed(name: impl Into<String>, message: impl Into<String>, code: i64) -> Self {
        Self {
            name: name.into(),
            error: Some((message.into(), code)),
        }
    }

    /// Returns `true` if this event reports a failure.
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

impl VirtualEvent for ErrorEvent {
    fn name(&self) -> &str {
        &self.name
    }

    fn push(&self, table: &mut EventTable) {
        table.insert(IS_ERROR_KEY.to_owned(), Value::Bool(self.is_error()));
        if let Some((message, code)) = &self.error {
            table.insert(ERROR_MESSAGE_KEY.to_owned(), Value::from(message.as_str()));
            table.insert(ERROR_CODE_KEY.to_owned(), Value::from(*code));
        }
    }
}
