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

//! Units of work executed by the [`Scheduler`](crate::scheduler::Scheduler).
//!
//! A task is either one-shot (removed before it executes) or keep-alive
//! (executed again on every drain until it retires or is deleted).

use std::fmt;

use crate::scheduler::TaskSender;

/// Identifies a task appended to a scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(pub(crate) u64);

impl TaskId {
    /// The raw numeric value, unique within one scheduler.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task#{}", self.0)
    }
}

/// An abstract unit of work.
///
/// Tasks are appended from any thread and executed on the consumer thread,
/// so they must be `Send`. A task must not assume that the world it was
/// scheduled in still exists when it runs: re-validate every handle it
/// captured.
pub trait Task: Send {
    /// Performs the work.
    fn execute(&mut self, ctx: &mut TaskContext<'_>);

    /// Keep-alive tasks stay scheduled and execute on every drain.
    fn keep_alive(&self) -> bool {
        false
    }
}

/// What a task sees of the scheduler while it executes.
pub struct TaskContext<'a> {
    id: TaskId,
    tick: u64,
    sender: &'a TaskSender,
    retire: bool,
}

impl<'a> TaskContext<'a> {
    pub(crate) fn new(id: TaskId, tick: u64, sender: &'a TaskSender) -> Self {
        Self {
            id,
            tick,
            sender,
            retire: false,
        }
    }

    /// The id of the executing task.
    pub fn id(&self) -> TaskId {
        self.id
    }

    /// The drain number this execution belongs to, starting at 1.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// The producer side of the scheduler.
    ///
    /// Tasks appended through it land on the pending stack and are not
    /// visited before the next drain.
    pub fn sender(&self) -> &TaskSender {
        self.sender
    }

    /// Removes a keep-alive task from the schedule once this execution ends.
    ///
    /// Has no effect on one-shot tasks, which are already gone.
    pub fn retire(&mut self) {
        self.retire = true;
    }

    pub(crate) fn is_retired(&self) -> bool {
        self.retire
    }
}

struct OnceTask<F> {
    work: Option<F>,
}

impl<F> Task for OnceTask<F>
where
    F: FnOnce(&mut TaskContext<'_>) + Send,
{
    fn execute(&mut self, ctx: &mut TaskContext<'_>) {
        if let Some(work) = self.work.take() {
            work(ctx);
        }
    }
}

struct RepeatingTask<F> {
    work: F,
}

impl<F> Task for RepeatingTask<F>
where
    F: FnMut(&mut TaskContext<'_>) + Send,
{
    fn execute(&mut self, ctx: &mut TaskContext<'_>) {
        (self.work)(ctx);
    }

    fn keep_alive(&self) -> bool {
        true
    }
}

/// Wraps a closure into a one-shot task.
pub fn once<F>(work: F) -> Box<dyn Task>
where
    F: FnOnce(&mut TaskContext<'_>) + Send + 'static,
{
    Box::new(OnceTask { work: Some(work) })
}

/// Wraps a closure into a keep-alive task that fires on every drain.
pub fn repeating<F>(work: F) -> Box<dyn Task>
where
    F: FnMut(&mut TaskContext<'_>) + Send + 'static,
{
    Box::new(RepeatingTask { work })
}
