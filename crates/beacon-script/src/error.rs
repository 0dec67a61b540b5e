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

//! Errors raised by script listeners.

use thiserror::Error;

/// A failure reported by a listener while handling an event.
///
/// Listener failures never propagate out of a dispatch; the script state
/// logs and counts them.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScriptError {
    /// The listener raised an error.
    #[error("runtime error: {message}")]
    Runtime {
        /// The message raised by the listener.
        message: String,
    },
    /// The listener refused the event's payload.
    #[error("bad event field '{field}': {reason}")]
    BadField {
        /// The offending field.
        field: String,
        /// Why it was rejected.
        reason: String,
    },
}

impl ScriptError {
    /// Creates a [`ScriptError::Runtime`] error.
    pub fn runtime(message: impl Into<String>) -> Self {
        Self::Runtime {
            message: message.into(),
        }
    }

    /// Creates a [`ScriptError::BadField`] error.
    pub fn bad_field(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::BadField {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Returns a short stable label for logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            ScriptError::Runtime { .. } => "script_runtime",
            ScriptError::BadField { .. } => "script_bad_field",
        }
    }
}
