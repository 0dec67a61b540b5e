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

//! Deferred, thread-safe delivery of events to a script listener.
//!
//! A [`Notifier`] pairs one listener slot with a handle to the [`ScriptState`]
//! and the producer side of the main-loop scheduler. Background threads call
//! [`Notifier::schedule_dispatch`]; the listener runs later, on the thread
//! that drains the scheduler, and only if the state is still alive then.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use beacon_core::{EventBox, Handle, Task, TaskContext, TaskId, TaskSender};

use crate::registry::ListenerRef;
use crate::state::ScriptState;
use crate::value::ScriptValue;

/// What happens to the listener after it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ListenerMode {
    /// The listener stays registered across dispatches.
    #[default]
    Subscription,
    /// The listener is cleared before its single invocation.
    FireAndForget,
}

/// A listener slot that can be fired from any thread.
pub struct Notifier {
    state: Handle<ScriptState>,
    sender: TaskSender,
    listener: AtomicU64,
    mode: ListenerMode,
}

impl Notifier {
    /// Creates a notifier with no listener.
    ///
    /// ## Arguments
    /// * `state` - The state listeners are registered in and called from.
    /// * `sender` - The producer side of the main-loop scheduler.
    /// * `mode` - Whether the listener survives its invocation.
    pub fn new(state: Handle<ScriptState>, sender: TaskSender, mode: ListenerMode) -> Arc<Self> {
        Arc::new(Self {
            state,
            sender,
            listener: AtomicU64::new(ListenerRef::NONE.to_raw()),
            mode,
        })
    }

    /// Registers `value` as the target of future dispatches.
    ///
    /// Any previous listener is released first. Values that are neither a
    /// function nor a table are not stored and `false` is returned.
    ///
    /// ## Arguments
    /// * `value` - A function or a table.
    /// ## Returns
    /// * `true` if the listener was stored.
    pub fn set_listener(&self, value: ScriptValue) -> bool {
        let Some(state) = self.state.get() else {
            return false;
        };
        state.release(self.take_listener());

        if !value.is_listener() {
            log::debug!("Ignoring {} listener.", value.type_name());
            return false;
        }
        let reference = state.register(value);
        self.listener.store(reference.to_raw(), Ordering::Release);
        true
    }

    /// Releases the registered listener, if any.
    pub fn clear_listener(&self) {
        if let Some(state) = self.state.get() {
            state.release(self.take_listener());
        }
    }

    /// Returns `true` if a listener is registered.
    pub fn has_listener(&self) -> bool {
        self.listener_ref().is_some()
    }

    /// The registry reference of the current listener.
    pub fn listener_ref(&self) -> ListenerRef {
        ListenerRef::from_raw(self.listener.load(Ordering::Acquire))
    }

    /// The listener mode chosen at construction.
    pub fn mode(&self) -> ListenerMode {
        self.mode
    }

    /// The handle to the state this notifier delivers into.
    pub fn state(&self) -> &Handle<ScriptState> {
        &self.state
    }

    /// Schedules delivery of `event` to the registered listener.
    ///
    /// Takes ownership of `event`. Without a registered listener the event is
    /// dropped immediately and nothing is scheduled.
    ///
    /// ## Arguments
    /// * `event` - The payload handed to the listener.
    /// ## Returns
    /// * The scheduled task, or `None` if the event was dropped.
    pub fn schedule_dispatch(self: &Arc<Self>, event: EventBox) -> Option<TaskId> {
        if !self.has_listener() {
            log::trace!("No listener for '{}'; dropping it.", event.name());
            return None;
        }
        Some(self.sender.append(Box::new(DispatchTask {
            notifier: Arc::clone(self),
            event: Some(event),
            explicit: ListenerRef::NONE,
        })))
    }

    /// Schedules delivery of `event` to `listener` instead of the current one.
    ///
    /// `listener` is a reference taken with [`ScriptState::register`] when the
    /// work started; the dispatch consumes it. During the call it stands in
    /// for the notifier's listener, which is restored afterwards.
    ///
    /// ## Arguments
    /// * `event` - The payload handed to the listener.
    /// * `listener` - The reference to call; released after the dispatch.
    /// ## Returns
    /// * The scheduled task, or `None` if `listener` is [`ListenerRef::NONE`].
    pub fn schedule_dispatch_with(
        self: &Arc<Self>,
        event: EventBox,
        listener: ListenerRef,
    ) -> Option<TaskId> {
        if listener.is_none() {
            log::trace!("No listener for '{}'; dropping it.", event.name());
            return None;
        }
        Some(self.sender.append(Box::new(DispatchTask {
            notifier: Arc::clone(self),
            event: Some(event),
            explicit: listener,
        })))
    }

    fn take_listener(&self) -> ListenerRef {
        ListenerRef::from_raw(
            self.listener
                .swap(ListenerRef::NONE.to_raw(), Ordering::AcqRel),
        )
    }

    fn dispatch(&self, state: &ScriptState, event: &EventBox, explicit: ListenerRef) {
        if explicit.is_some() {
            let previous = self.listener.swap(explicit.to_raw(), Ordering::AcqRel);
            state.call_ref(explicit, event.as_ref());
            // A callback that installed its own listener wins over the restore.
            if self
                .listener
                .compare_exchange(
                    explicit.to_raw(),
                    previous,
                    Ordering::AcqRel,
                    Ordering::Acquire,
                )
                .is_err()
            {
                state.release(ListenerRef::from_raw(previous));
            }
            state.release(explicit);
            return;
        }

        match self.mode {
            ListenerMode::Subscription => {
                state.call_ref(self.listener_ref(), event.as_ref());
            }
            ListenerMode::FireAndForget => {
                let listener = self.take_listener();
                state.call_ref(listener, event.as_ref());
                state.release(listener);
            }
        }
    }
}

impl Drop for Notifier {
    fn drop(&mut self) {
        // The state may already be gone; then there is nothing to release.
        if let Some(state) = self.state.get() {
            state.release(self.take_listener());
        }
    }
}

impl fmt::Debug for Notifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Notifier")
            .field("mode", &self.mode)
            .field("listener", &self.listener_ref())
            .field("state_valid", &self.state.is_valid())
            .finish()
    }
}

struct DispatchTask {
    notifier: Arc<Notifier>,
    event: Option<EventBox>,
    explicit: ListenerRef,
}

impl Task for DispatchTask {
    fn execute(&mut self, ctx: &mut TaskContext<'_>) {
        let Some(event) = self.event.take() else {
            return;
        };
        match self.notifier.state.get() {
            Some(state) => self.notifier.dispatch(state, &event, self.explicit),
            None => log::debug!(
                "{}: state is gone; dropping '{}'.",
                ctx.id(),
                event.name()
            ),
        }
    }
}

impl Drop for DispatchTask {
    fn drop(&mut self) {
        // Cancelled or discarded before running: the explicit reference is still ours.
        if self.event.is_some() && self.explicit.is_some() {
            if let Some(state) = self.notifier.state.get() {
                state.release(self.explicit);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use beacon_core::event::CustomEvent;
    use beacon_core::{HandleAllocator, Scheduler};
    use std::sync::atomic::AtomicUsize;

    fn counting() -> (Arc<AtomicUsize>, ScriptValue) {
        let hits = Arc::new(AtomicUsize::new(0));
        let h = hits.clone();
        let listener = ScriptValue::function(move |_| {
            h.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        (hits, listener)
    }

    fn event() -> EventBox {
        Box::new(CustomEvent::new("done"))
    }

    #[test]
    fn test_subscription_fires_on_every_dispatch() {
        let owner = HandleAllocator::unbounded()
            .create_owned(ScriptState::new())
            .unwrap();
        let mut scheduler = Scheduler::new();
        let notifier = Notifier::new(owner.observe(), scheduler.sender(), ListenerMode::Subscription);
        let (hits, listener) = counting();
        assert!(notifier.set_listener(listener));

        notifier.schedule_dispatch(event());
        notifier.schedule_dispatch(event());
        scheduler.run();

        assert_eq!(hits.load(Ordering::SeqCst), 2);
        assert!(notifier.has_listener());
    }

    #[test]
    fn test_set_listener_replaces_and_releases() {
        let owner = HandleAllocator::unbounded()
            .create_owned(ScriptState::new())
            .unwrap();
        let scheduler = Scheduler::new();
        let notifier = Notifier::new(owner.observe(), scheduler.sender(), ListenerMode::Subscription);

        notifier.set_listener(ScriptValue::function(|_| Ok(())));
        let first = notifier.listener_ref();
        notifier.set_listener(ScriptValue::function(|_| Ok(())));

        assert_ne!(first, notifier.listener_ref());
        assert!(owner.get().value(first).is_none());
        assert_eq!(owner.get().listener_count(), 1);
    }

    #[test]
    fn test_non_callable_values_are_not_stored() {
        let owner = HandleAllocator::unbounded()
            .create_owned(ScriptState::new())
            .unwrap();
        let scheduler = Scheduler::new();
        let notifier = Notifier::new(owner.observe(), scheduler.sender(), ListenerMode::Subscription);

        notifier.set_listener(ScriptValue::function(|_| Ok(())));
        assert!(!notifier.set_listener(ScriptValue::from(42.0)));
        assert!(!notifier.has_listener());
        assert_eq!(owner.get().listener_count(), 0);
    }

    #[test]
    fn test_dropping_the_notifier_releases_its_listener() {
        let owner = HandleAllocator::unbounded()
            .create_owned(ScriptState::new())
            .unwrap();
        let scheduler = Scheduler::new();
        let notifier = Notifier::new(owner.observe(), scheduler.sender(), ListenerMode::Subscription);
        notifier.set_listener(ScriptValue::function(|_| Ok(())));
        assert_eq!(owner.get().listener_count(), 1);

        drop(notifier);
        assert_eq!(owner.get().listener_count(), 0);
    }
}
