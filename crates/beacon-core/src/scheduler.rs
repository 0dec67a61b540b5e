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

//! A lock-free, single-consumer task scheduler.
//!
//! Producers on any thread push tasks through a [`TaskSender`]; the owner of
//! the [`Scheduler`] drains them with [`Scheduler::run`] once per main-loop
//! tick. The only shared state is the head pointer of two push-only stacks
//! (pending tasks and cancellation tombstones), both updated by CAS. The
//! ordered task list belongs to the consumer alone.
//!
//! Tasks appended by one producer between two drains execute in append order.
//! Tasks appended concurrently by different producers have no relative order.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use crate::stack::AtomicStack;
use crate::task::{Task, TaskContext, TaskId};

struct ScheduledTask {
    id: TaskId,
    task: Box<dyn Task>,
}

struct Shared {
    pending: AtomicStack<ScheduledTask>,
    cancelled: AtomicStack<TaskId>,
    next_id: AtomicU64,
    closed: AtomicBool,
}

/// The producer side of a [`Scheduler`]. Cheap to clone, usable from any thread.
#[derive(Clone)]
pub struct TaskSender {
    shared: Arc<Shared>,
}

impl TaskSender {
    /// Hands `task` over to the scheduler.
    ///
    /// Never blocks. The task runs during the next [`Scheduler::run`]; if the
    /// scheduler is already gone the task is dropped on the spot.
    ///
    /// ## Arguments
    /// * `task` - The work to run on the consumer thread.
    /// ## Returns
    /// * The identity to pass to [`cancel`](Self::cancel).
    pub fn append(&self, task: Box<dyn Task>) -> TaskId {
        let id = TaskId(self.shared.next_id.fetch_add(1, Ordering::Relaxed));

        if self.shared.closed.load(Ordering::Acquire) {
            log::warn!("{id} appended after its scheduler shut down; dropping it.");
            return id;
        }

        log::trace!("Appending {id}.");
        self.shared.pending.push(ScheduledTask { id, task });
        id
    }

    /// Requests removal of a task by identity.
    ///
    /// The request is reconciled at the start of the next drain. A task that
    /// is executing while it gets cancelled finishes that execution.
    pub fn cancel(&self, id: TaskId) {
        log::trace!("Cancelling {id}.");
        self.shared.cancelled.push(id);
    }

    /// Returns `true` if tasks were appended since the last drain.
    pub fn has_pending(&self) -> bool {
        !self.shared.pending.is_empty()
    }

    /// Returns `true` once the consumer has shut down.
    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::Acquire)
    }
}

impl fmt::Debug for TaskSender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskSender")
            .field("has_pending", &self.has_pending())
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Counters describing one drain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    /// Tasks moved from the pending stack into the schedule.
    pub moved: usize,
    /// Task executions performed.
    pub executed: usize,
    /// Tasks removed from the schedule after executing.
    pub retired: usize,
    /// Tasks removed by cancellation before executing.
    pub cancelled: usize,
}

/// The consumer side: owns the ordered schedule and drains it.
pub struct Scheduler {
    sender: TaskSender,
    tasks: Vec<ScheduledTask>,
    tick: u64,
}

impl Scheduler {
    /// Creates an empty scheduler.
    pub fn new() -> Self {
        Self {
            sender: TaskSender {
                shared: Arc::new(Shared {
                    pending: AtomicStack::new(),
                    cancelled: AtomicStack::new(),
                    next_id: AtomicU64::new(0),
                    closed: AtomicBool::new(false),
                }),
            },
            tasks: Vec::new(),
            tick: 0,
        }
    }

    /// Returns a producer handle for this scheduler.
    pub fn sender(&self) -> TaskSender {
        self.sender.clone()
    }

    /// Drains the schedule once. Must only be called from the consumer thread.
    ///
    /// Pending tasks are claimed with one atomic swap and appended in arrival
    /// order. Keep-alive tasks execute in place; one-shot tasks are removed
    /// before they execute. Work appended during this pass waits for the next.
    ///
    /// ## Returns
    /// * How many tasks were moved in, cancelled and executed.
    pub fn run(&mut self) -> RunStats {
        self.tick += 1;
        // Tombstones are taken before the pending stack. A cancel is pushed
        // after its append, so every tombstone taken here finds its task.
        let tombstones = self.take_cancellations();
        let mut stats = RunStats {
            moved: self.claim_pending(),
            cancelled: self.apply_cancellations(&tombstones),
            ..RunStats::default()
        };

        // Tasks can only reach the schedule through the pending stack, so the
        // list is stable for the whole pass.
        let scheduled = std::mem::take(&mut self.tasks);
        let mut kept = Vec::with_capacity(scheduled.len());
        for mut entry in scheduled {
            let keep_alive = entry.task.keep_alive();
            let mut ctx = TaskContext::new(entry.id, self.tick, &self.sender);
            entry.task.execute(&mut ctx);
            stats.executed += 1;

            if keep_alive && !ctx.is_retired() {
                kept.push(entry);
            } else {
                stats.retired += 1;
            }
        }
        self.tasks = kept;

        if stats.executed > 0 || stats.cancelled > 0 {
            log::trace!("Scheduler tick {}: {stats:?}", self.tick);
        }
        stats
    }

    /// Removes a scheduled task by identity. Returns whether it was found.
    ///
    /// Only sees tasks already moved into the schedule; use
    /// [`TaskSender::cancel`] for tasks that may still be pending.
    pub fn delete(&mut self, id: TaskId) -> bool {
        match self.tasks.iter().position(|entry| entry.id == id) {
            Some(index) => {
                self.tasks.remove(index);
                true
            }
            None => false,
        }
    }

    /// Drops every scheduled and pending task without executing it.
    pub fn clear(&mut self) -> usize {
        // Tombstones for tasks that are about to disappear anyway.
        drop(self.take_cancellations());
        self.claim_pending();
        let cleared = self.tasks.len();
        self.tasks.clear();
        cleared
    }

    /// Returns `true` if the task is in the schedule.
    pub fn contains(&self, id: TaskId) -> bool {
        self.tasks.iter().any(|entry| entry.id == id)
    }

    /// The number of scheduled tasks (pending ones excluded).
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Returns `true` if nothing is scheduled.
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// The number of drains performed so far.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    fn claim_pending(&mut self) -> usize {
        let start = self.tasks.len();
        self.tasks.extend(self.sender.shared.pending.take_all());
        self.tasks[start..].reverse();
        self.tasks.len() - start
    }

    fn take_cancellations(&self) -> Vec<TaskId> {
        self.sender.shared.cancelled.take_all().collect()
    }

    fn apply_cancellations(&mut self, cancelled: &[TaskId]) -> usize {
        if cancelled.is_empty() {
            return 0;
        }
        let before = self.tasks.len();
        self.tasks.retain(|entry| !cancelled.contains(&entry.id));
        before - self.tasks.len()
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        // Producers are expected to be stopped by now.
        self.sender.shared.closed.store(true, Ordering::Release);
        let claimed = self.claim_pending();
        if !self.tasks.is_empty() {
            log::debug!(
                "Scheduler dropped with {} task(s) unexecuted ({claimed} claimed at teardown).",
                self.tasks.len()
            );
        }
        self.tasks.clear();
    }
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("scheduled", &self.tasks.len())
            .field("tick", &self.tick)
            .finish()
    }
}
