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

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::thread;

use beacon_core::event::{CompletionEvent, CustomEvent};
use beacon_core::{HandleAllocator, OwnerHandle, Scheduler, VirtualEvent};
use beacon_script::{
    ChannelCallbacks, ListenerMode, Notifier, ScriptError, ScriptState, ScriptTable, ScriptValue,
};

fn new_state() -> OwnerHandle<ScriptState> {
    HandleAllocator::unbounded()
        .create_owned(ScriptState::new())
        .unwrap()
}

fn counting() -> (Arc<AtomicUsize>, ScriptValue) {
    let hits = Arc::new(AtomicUsize::new(0));
    let h = hits.clone();
    let listener = ScriptValue::function(move |_| {
        h.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });
    (hits, listener)
}

struct TrackedEvent {
    dropped: Arc<AtomicBool>,
}

impl VirtualEvent for TrackedEvent {
    fn name(&self) -> &str {
        "tracked"
    }
}

impl Drop for TrackedEvent {
    fn drop(&mut self) {
        self.dropped.store(true, Ordering::SeqCst);
    }
}

#[test]
fn test_dispatch_after_death_is_a_noop() {
    let owner = new_state();
    let mut scheduler = Scheduler::new();
    let notifier = Notifier::new(owner.observe(), scheduler.sender(), ListenerMode::Subscription);
    let (hits, listener) = counting();
    notifier.set_listener(listener);

    let dropped = Arc::new(AtomicBool::new(false));
    let id = notifier.schedule_dispatch(Box::new(TrackedEvent {
        dropped: dropped.clone(),
    }));
    assert!(id.is_some());

    drop(owner);
    assert!(!notifier.state().is_valid());
    scheduler.run();

    assert_eq!(hits.load(Ordering::SeqCst), 0);
    assert!(dropped.load(Ordering::SeqCst), "event must be destroyed");
    // Teardown with an invalid state skips the release.
    drop(notifier);
}

#[test]
fn test_scheduling_without_a_listener_drops_the_event() {
    let owner = new_state();
    let scheduler = Scheduler::new();
    let notifier = Notifier::new(owner.observe(), scheduler.sender(), ListenerMode::Subscription);

    let dropped = Arc::new(AtomicBool::new(false));
    let id = notifier.schedule_dispatch(Box::new(TrackedEvent {
        dropped: dropped.clone(),
    }));

    assert!(id.is_none());
    assert!(dropped.load(Ordering::SeqCst));
    assert!(!scheduler.sender().has_pending());
}

#[test]
fn test_fire_and_forget_clears_before_invoking() {
    let owner = new_state();
    let mut scheduler = Scheduler::new();
    let notifier = Notifier::new(owner.observe(), scheduler.sender(), ListenerMode::FireAndForget);

    let (second_hits, second) = counting();
    let weak: Weak<Notifier> = Arc::downgrade(&notifier);
    let saw_empty_slot = Arc::new(AtomicBool::new(false));
    let saw = saw_empty_slot.clone();
    notifier.set_listener(ScriptValue::function(move |_| {
        if let Some(notifier) = weak.upgrade() {
            saw.store(!notifier.has_listener(), Ordering::SeqCst);
            notifier.set_listener(second.clone());
        }
        Ok(())
    }));

    notifier.schedule_dispatch(Box::new(CustomEvent::new("loaded")));
    scheduler.run();

    assert!(saw_empty_slot.load(Ordering::SeqCst));
    assert!(notifier.has_listener(), "re-registered listener must survive");
    assert_eq!(owner.get().listener_count(), 1);

    notifier.schedule_dispatch(Box::new(CustomEvent::new("loaded")));
    scheduler.run();
    assert_eq!(second_hits.load(Ordering::SeqCst), 1);
    assert!(!notifier.has_listener());
}

#[test]
fn test_explicit_listener_stands_in_then_restores() {
    let owner = new_state();
    let mut scheduler = Scheduler::new();
    let notifier = Notifier::new(owner.observe(), scheduler.sender(), ListenerMode::Subscription);
    let (current_hits, current) = counting();
    let (captured_hits, captured) = counting();

    notifier.set_listener(current);
    let before = notifier.listener_ref();

    let weak = Arc::downgrade(&notifier);
    let seen_during_call = Arc::new(Mutex::new(None));
    let seen = seen_during_call.clone();
    let recording = ScriptValue::function(move |table| {
        if let Some(notifier) = weak.upgrade() {
            *seen.lock().unwrap() = Some(notifier.listener_ref());
        }
        if let ScriptValue::Function(f) = &captured {
            f.call(table)?;
        }
        Ok(())
    });
    let explicit = owner.get().register(recording);

    notifier.schedule_dispatch_with(Box::new(CompletionEvent::new(1, 9, true)), explicit);
    scheduler.run();

    assert_eq!(captured_hits.load(Ordering::SeqCst), 1);
    assert_eq!(current_hits.load(Ordering::SeqCst), 0);
    assert_eq!(*seen_during_call.lock().unwrap(), Some(explicit));
    assert_eq!(notifier.listener_ref(), before);
    assert!(owner.get().value(explicit).is_none(), "explicit ref is consumed");
    assert_eq!(owner.get().listener_count(), 1);
}

#[test]
fn test_overlapping_explicit_dispatches_each_reach_their_listener() {
    let owner = new_state();
    let mut scheduler = Scheduler::new();
    let notifier = Notifier::new(owner.observe(), scheduler.sender(), ListenerMode::Subscription);
    let callbacks = ChannelCallbacks::new(2);

    let order = Arc::new(Mutex::new(Vec::new()));
    for channel in 0..2u32 {
        let o = order.clone();
        let listener = ScriptValue::function(move |table| {
            let reported = table
                .get("channel")
                .and_then(|v| v.as_u64())
                .ok_or_else(|| ScriptError::bad_field("channel", "expected a number"))?;
            o.lock().unwrap().push((channel, reported));
            Ok(())
        });
        callbacks.swap(channel as usize, owner.get().register(listener));
    }

    for channel in [1usize, 0] {
        let listener = callbacks.take(channel);
        notifier.schedule_dispatch_with(
            Box::new(CompletionEvent::new(channel as u32, 0, true)),
            listener,
        );
    }
    scheduler.run();

    assert_eq!(*order.lock().unwrap(), vec![(1, 1), (0, 0)]);
    assert!(!notifier.has_listener());
    assert_eq!(owner.get().listener_count(), 0);
}

#[test]
fn test_table_listeners_receive_events_by_name() {
    let owner = new_state();
    let mut scheduler = Scheduler::new();
    let notifier = Notifier::new(owner.observe(), scheduler.sender(), ListenerMode::Subscription);

    let hits = Arc::new(AtomicUsize::new(0));
    let h = hits.clone();
    let table = ScriptTable::new().with_handler(CompletionEvent::NAME, move |table| {
        assert_eq!(table["completed"], true);
        h.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });
    notifier.set_listener(ScriptValue::from(table));

    notifier.schedule_dispatch(Box::new(CompletionEvent::new(0, 0, true)));
    notifier.schedule_dispatch(Box::new(CustomEvent::new("unhandled")));
    scheduler.run();

    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[test]
fn test_background_threads_dispatch_into_the_main_thread() {
    let owner = new_state();
    let mut scheduler = Scheduler::new();
    let notifier = Notifier::new(owner.observe(), scheduler.sender(), ListenerMode::Subscription);
    let (hits, listener) = counting();
    notifier.set_listener(listener);

    let workers: Vec<_> = (0..4)
        .map(|worker| {
            let notifier = notifier.clone();
            thread::spawn(move || {
                for i in 0..50 {
                    notifier.schedule_dispatch(Box::new(
                        CustomEvent::new("progress").with("worker", worker).with("step", i),
                    ));
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    scheduler.run();
    assert_eq!(hits.load(Ordering::SeqCst), 200);
}

#[test]
fn test_discarded_explicit_dispatches_release_their_reference() {
    let owner = new_state();
    let mut scheduler = Scheduler::new();
    let notifier = Notifier::new(owner.observe(), scheduler.sender(), ListenerMode::Subscription);
    let (hits, listener) = counting();
    let explicit = owner.get().register(listener);

    let id = notifier
        .schedule_dispatch_with(Box::new(CustomEvent::new("stopped")), explicit)
        .unwrap();
    scheduler.sender().cancel(id);
    scheduler.run();

    assert_eq!(hits.load(Ordering::SeqCst), 0);
    assert_eq!(owner.get().listener_count(), 0);
}
