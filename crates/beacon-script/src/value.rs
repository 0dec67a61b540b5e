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

//! Values living on the scripting side.
//!
//! Only functions and tables can act as listeners. A table listener handles
//! an event through its field named after the event, e.g. `completion`.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use beacon_core::EventTable;

use crate::error::ScriptError;

type Callback = dyn Fn(&EventTable) -> Result<(), ScriptError> + Send + Sync;

/// A callable script value.
#[derive(Clone)]
pub struct ScriptFunction(Arc<Callback>);

impl ScriptFunction {
    /// Wraps a Rust closure as a script function.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&EventTable) -> Result<(), ScriptError> + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Invokes the function with an event table.
    pub fn call(&self, event: &EventTable) -> Result<(), ScriptError> {
        (self.0)(event)
    }

    /// Returns `true` if both values are the same function.
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Arc::ptr_eq(&a.0, &b.0)
    }
}

impl fmt::Debug for ScriptFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ScriptFunction({:p})", Arc::as_ptr(&self.0))
    }
}

/// A shared, mutable script table.
#[derive(Clone, Default)]
pub struct ScriptTable(Arc<Mutex<HashMap<String, ScriptValue>>>);

impl ScriptTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    fn fields(&self) -> MutexGuard<'_, HashMap<String, ScriptValue>> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Stores `value` under `key`. Storing `Nil` removes the field.
    pub fn set(&self, key: impl Into<String>, value: ScriptValue) {
        let key = key.into();
        let mut fields = self.fields();
        if matches!(value, ScriptValue::Nil) {
            fields.remove(&key);
        } else {
            fields.insert(key, value);
        }
    }

    /// Returns a copy of the value stored under `key`.
    pub fn get(&self, key: &str) -> Option<ScriptValue> {
        self.fields().get(key).cloned()
    }

    /// Builder form of [`set`](Self::set) for a handler function.
    #[must_use]
    pub fn with_handler<F>(self, event_name: &str, f: F) -> Self
    where
        F: Fn(&EventTable) -> Result<(), ScriptError> + Send + Sync + 'static,
    {
        self.set(event_name, ScriptValue::Function(ScriptFunction::new(f)));
        self
    }

    /// The number of fields.
    pub fn len(&self) -> usize {
        self.fields().len()
    }

    /// Returns `true` if the table has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields().is_empty()
    }

    /// Returns `true` if both values are the same table.
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Arc::ptr_eq(&a.0, &b.0)
    }
}

impl fmt::Debug for ScriptTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<String> = self.fields().keys().cloned().collect();
        keys.sort();
        f.debug_struct("ScriptTable").field("keys", &keys).finish()
    }
}

/// Any value the scripting side can hand to the core.
#[derive(Clone, Debug, Default)]
pub enum ScriptValue {
    /// The absence of a value.
    #[default]
    Nil,
    /// A boolean.
    Boolean(bool),
    /// A number.
    Number(f64),
    /// A string.
    String(String),
    /// A callable.
    Function(ScriptFunction),
    /// A table.
    Table(ScriptTable),
}

impl ScriptValue {
    /// Wraps a Rust closure as a function value.
    pub fn function<F>(f: F) -> Self
    where
        F: Fn(&EventTable) -> Result<(), ScriptError> + Send + Sync + 'static,
    {
        Self::Function(ScriptFunction::new(f))
    }

    /// Returns `true` for values that may be registered as listeners.
    pub fn is_listener(&self) -> bool {
        matches!(self, ScriptValue::Function(_) | ScriptValue::Table(_))
    }

    /// The scripting type name, for diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            ScriptValue::Nil => "nil",
            ScriptValue::Boolean(_) => "boolean",
            ScriptValue::Number(_) => "number",
            ScriptValue::String(_) => "string",
            ScriptValue::Function(_) => "function",
            ScriptValue::Table(_) => "table",
        }
    }
}

impl From<bool> for ScriptValue {
    fn from(value: bool) -> Self {
        ScriptValue::Boolean(value)
    }
}

impl From<f64> for ScriptValue {
    fn from(value: f64) -> Self {
        ScriptValue::Number(value)
    }
}

impl From<&str> for ScriptValue {
    fn from(value: &str) -> Self {
        ScriptValue::String(value.to_owned())
    }
}

impl From<String> for ScriptValue {
    fn from(value: String) -> Self {
        ScriptValue::String(value)
    }
}

impl From<ScriptFunction> for ScriptValue {
    fn from(value: ScriptFunction) -> Self {
        ScriptValue::Function(value)
    }
}

impl From<ScriptTable> for ScriptValue {
    fn from(value: ScriptTable) -> Self {
        ScriptValue::Table(value)
    }
}
