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

//! The scripting state shared by every notifier of a runtime.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use beacon_core::event::to_table;
use beacon_core::VirtualEvent;

use crate::error::ScriptError;
use crate::registry::{ListenerRef, ListenerRegistry};
use crate::value::ScriptValue;

/// The scripting state.
///
/// Runtime handles point at a `ScriptState`; once the runtime shuts down the
/// handles turn invalid and nothing touches the state again. Listener failures
/// are logged and counted, never propagated.
#[derive(Debug, Default)]
pub struct ScriptState {
    registry: Mutex<ListenerRegistry>,
    runtime_listeners: Mutex<HashMap<String, Vec<ScriptValue>>>,
    calls: AtomicUsize,
    errors: AtomicUsize,
}

impl ScriptState {
    /// Creates an empty state.
    pub fn new() -> Self {
        Self::default()
    }

    fn registry(&self) -> MutexGuard<'_, ListenerRegistry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn runtime_listeners(&self) -> MutexGuard<'_, HashMap<String, Vec<ScriptValue>>> {
        self.runtime_listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Keeps `value` reachable from native code.
    pub fn register(&self, value: ScriptValue) -> ListenerRef {
        self.registry().insert(value)
    }

    /// Drops a reference taken with [`register`](Self::register).
    ///
    /// Releasing [`ListenerRef::NONE`] or a stale reference does nothing.
    pub fn release(&self, reference: ListenerRef) {
        if reference.is_none() {
            return;
        }
        // The value is dropped after the lock is released.
        let released = self.registry().release(reference);
        drop(released);
    }

    /// Returns a copy of the value behind `reference`.
    pub fn value(&self, reference: ListenerRef) -> Option<ScriptValue> {
        self.registry().get(reference).cloned()
    }

    /// The number of registered values.
    pub fn listener_count(&self) -> usize {
        self.registry().len()
    }

    /// Invokes `listener` with `event`.
    ///
    /// A function is called with the event table. A table is called through
    /// its field named after the event; a table without such a field ignores
    /// the event.
    ///
    /// ## Arguments
    /// * `listener` - A function or a table.
    /// * `event` - The event converted into the listener's argument table.
    /// ## Returns
    /// * `true` if a function ran without error.
    pub fn call(&self, listener: &ScriptValue, event: &dyn VirtualEvent) -> bool {
        let function = match listener {
            ScriptValue::Function(f) => f.clone(),
            ScriptValue::Table(table) => match table.get(event.name()) {
                Some(ScriptValue::Function(f)) => f,
                _ => {
                    log::trace!("table listener has no '{}' handler", event.name());
                    return false;
                }
            },
            other => {
                log::warn!(
                    "cannot dispatch '{}' to a {} value",
                    event.name(),
                    other.type_name()
                );
                return false;
            }
        };

        self.calls.fetch_add(1, Ordering::Relaxed);
        let table = to_table(event);
        match function.call(&table) {
            Ok(()) => true,
            Err(err) => {
                self.report(event.name(), &err);
                false
            }
        }
    }

    /// Invokes the listener behind `reference`, if it is still registered.
    pub fn call_ref(&self, reference: ListenerRef, event: &dyn VirtualEvent) -> bool {
        // Clone out of the registry so the listener runs without the lock held.
        match self.value(reference) {
            Some(listener) => self.call(&listener, event),
            None => false,
        }
    }

    /// Adds a runtime-wide listener for events named `name`.
    ///
    /// Returns `false` if `listener` is not a function or a table.
    pub fn add_event_listener(&self, name: impl Into<String>, listener: ScriptValue) -> bool {
        if !listener.is_listener() {
            return false;
        }
        self.runtime_listeners()
            .entry(name.into())
            .or_default()
            .push(listener);
        true
    }

    /// Removes every runtime-wide listener for `name`, returning how many there were.
    pub fn remove_event_listeners(&self, name: &str) -> usize {
        self.runtime_listeners()
            .remove(name)
            .map_or(0, |listeners| listeners.len())
    }

    /// Delivers `event` to every runtime-wide listener for its name.
    ///
    /// ## Arguments
    /// * `event` - The event; its name selects the listeners.
    /// ## Returns
    /// * The number of listeners that handled it without error.
    pub fn dispatch_event(&self, event: &dyn VirtualEvent) -> usize {
        // Listeners may add or remove listeners, so call them on a snapshot.
        let listeners = match self.runtime_listeners().get(event.name()) {
            Some(listeners) => listeners.clone(),
            None => return 0,
        };
        listeners
            .iter()
            .filter(|listener| self.call(listener, event))
            .count()
    }

    /// The number of listener invocations so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }

    /// The number of listener invocations that failed.
    pub fn error_count(&self) -> usize {
        self.errors.load(Ordering::Relaxed)
    }

    fn report(&self, event_name: &str, err: &ScriptError) {
        self.errors.fetch_add(1, Ordering::Relaxed);
        log::error!("[{}] listener for '{}' failed: {}", err.as_label(), event_name, err);
    }
}
