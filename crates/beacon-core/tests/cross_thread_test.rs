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
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;

use beacon_core::task;
use beacon_core::{HandleAllocator, Scheduler};

const PRODUCERS: usize = 4;
const TASKS_PER_PRODUCER: usize = 250;

#[test]
fn test_each_producer_keeps_its_own_order() {
    // --- 1. ARRANGE ---
    let mut scheduler = Scheduler::new();
    let executed = Arc::new(Mutex::new(Vec::new()));

    // --- 2. ACT ---
    let producers: Vec<_> = (0..PRODUCERS)
        .map(|producer| {
            let sender = scheduler.sender();
            let executed = executed.clone();
            thread::spawn(move || {
                for seq in 0..TASKS_PER_PRODUCER {
                    let executed = executed.clone();
                    sender.append(task::once(move |_| {
                        executed.lock().unwrap().push((producer, seq));
                    }));
                }
            })
        })
        .collect();
    for producer in producers {
        producer.join().expect("producer panicked");
    }
    let stats = scheduler.run();

    // --- 3. ASSERT ---
    assert_eq!(stats.executed, PRODUCERS * TASKS_PER_PRODUCER);
    let executed = executed.lock().unwrap();
    for producer in 0..PRODUCERS {
        let sequence: Vec<usize> = executed
            .iter()
            .filter(|(p, _)| *p == producer)
            .map(|(_, seq)| *seq)
            .collect();
        assert_eq!(sequence, (0..TASKS_PER_PRODUCER).collect::<Vec<_>>());
    }
    // No assertion is made on how different producers interleave.
}

#[test]
fn test_appends_race_with_runs_without_losing_work() {
    let mut scheduler = Scheduler::new();
    let executed = Arc::new(AtomicUsize::new(0));
    let done = Arc::new(AtomicBool::new(false));

    let producers: Vec<_> = (0..PRODUCERS)
        .map(|_| {
            let sender = scheduler.sender();
            let executed = executed.clone();
            thread::spawn(move || {
                for _ in 0..TASKS_PER_PRODUCER {
                    let executed = executed.clone();
                    sender.append(task::once(move |_| {
                        executed.fetch_add(1, Ordering::SeqCst);
                    }));
                    thread::yield_now();
                }
            })
        })
        .collect();

    let watcher = {
        let done = done.clone();
        thread::spawn(move || {
            for producer in producers {
                producer.join().expect("producer panicked");
            }
            done.store(true, Ordering::SeqCst);
        })
    };

    while !done.load(Ordering::SeqCst) {
        scheduler.run();
    }
    watcher.join().expect("watcher panicked");
    scheduler.run();

    assert_eq!(
        executed.load(Ordering::SeqCst),
        PRODUCERS * TASKS_PER_PRODUCER
    );
    assert!(scheduler.is_empty());
}

#[test]
fn test_cancels_from_another_thread_remove_every_task() {
    // --- 1. ARRANGE ---
    let mut scheduler = Scheduler::new();
    let executions = Arc::new(AtomicUsize::new(0));
    let done = Arc::new(AtomicBool::new(false));
    let (ids_tx, ids_rx) = mpsc::channel();

    // --- 2. ACT ---
    let producer = {
        let sender = scheduler.sender();
        let executions = executions.clone();
        thread::spawn(move || {
            for _ in 0..TASKS_PER_PRODUCER {
                let executions = executions.clone();
                let id = sender.append(task::repeating(move |_| {
                    executions.fetch_add(1, Ordering::SeqCst);
                }));
                ids_tx.send(id).expect("canceller hung up");
                thread::yield_now();
            }
        })
    };
    let canceller = {
        let sender = scheduler.sender();
        let done = done.clone();
        thread::spawn(move || {
            for id in ids_rx {
                sender.cancel(id);
            }
            done.store(true, Ordering::SeqCst);
        })
    };

    while !done.load(Ordering::SeqCst) {
        scheduler.run();
    }
    producer.join().expect("producer panicked");
    canceller.join().expect("canceller panicked");

    // Every cancel now precedes this drain, and so does every append.
    scheduler.run();

    // --- 3. ASSERT ---
    assert!(scheduler.is_empty());
    let settled = executions.load(Ordering::SeqCst);
    assert_eq!(scheduler.run().executed, 0);
    assert_eq!(executions.load(Ordering::SeqCst), settled);
}

#[test]
fn test_invalidation_crosses_threads() {
    let allocator = HandleAllocator::unbounded();
    let owner = allocator.create_owned(String::from("runtime")).unwrap();
    let mut scheduler = Scheduler::new();
    let hits = Arc::new(AtomicUsize::new(0));

    let observer = owner.observe();
    let sender = scheduler.sender();
    let counter = hits.clone();
    thread::spawn(move || {
        sender.append(task::once(move |_| {
            if observer.get().is_some() {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        }));
    })
    .join()
    .expect("producer panicked");

    drop(owner);
    scheduler.run();

    assert_eq!(hits.load(Ordering::SeqCst), 0);
    assert_eq!(allocator.live_cells(), 0);
}
