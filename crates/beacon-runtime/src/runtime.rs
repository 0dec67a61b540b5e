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

use std::sync::Arc;

use anyhow::{Context, Result};
use beacon_core::{
    EventBox, Handle, HandleAllocator, HandleStats, OwnerHandle, RunStats, Scheduler, TaskId,
    TaskSender,
};
use beacon_script::{ChannelCallbacks, ListenerMode, Notifier, ScriptState};

use crate::config::RuntimeConfig;
use crate::tasks::{BroadcastTask, FrameTask};

/// The main-loop side of the notification core.
///
/// Owns the script state (through its owner handle), the scheduler and the
/// per-channel callback slots. Call [`tick`](Self::tick) once per frame from
/// the thread that created the runtime.
pub struct Runtime {
    config: RuntimeConfig,
    allocator: Arc<HandleAllocator>,
    state: Option<OwnerHandle<ScriptState>>,
    scheduler: Scheduler,
    channels: Arc<ChannelCallbacks>,
}

impl Runtime {
    /// Creates a runtime and its script state.
    ///
    /// ## Arguments
    /// * `config` - Capacity and channel settings.
    /// ## Returns
    /// * The runtime, or an error if the script state cannot be allocated.
    pub fn new(config: RuntimeConfig) -> Result<Self> {
        let allocator = HandleAllocator::with_capacity(config.handle_capacity);
        let state = allocator
            .create_owned(ScriptState::new())
            .context("allocating the script state")?;
        let scheduler = Scheduler::new();

        if config.enter_frame {
            scheduler
                .sender()
                .append(Box::new(FrameTask::new(state.observe())));
        }

        log::info!(
            "Runtime started ({} channel(s), handle capacity {}).",
            config.channel_count,
            config.handle_capacity
        );

        Ok(Self {
            channels: Arc::new(ChannelCallbacks::new(config.channel_count)),
            config,
            allocator,
            state: Some(state),
            scheduler,
        })
    }

    /// The configuration the runtime was created with.
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// The script state, until shutdown.
    pub fn state(&self) -> Option<&ScriptState> {
        self.state.as_ref().map(OwnerHandle::get)
    }

    /// A handle to the script state. Empty after shutdown.
    pub fn state_handle(&self) -> Handle<ScriptState> {
        self.state
            .as_ref()
            .map_or_else(Handle::empty, OwnerHandle::observe)
    }

    /// The producer side of the main-loop scheduler.
    pub fn sender(&self) -> TaskSender {
        self.scheduler.sender()
    }

    /// The allocator for resources that background work must outlive-check.
    pub fn allocator(&self) -> &Arc<HandleAllocator> {
        &self.allocator
    }

    /// Per-channel listener slots, shareable with mixer threads.
    pub fn channels(&self) -> &Arc<ChannelCallbacks> {
        &self.channels
    }

    /// Creates a notifier delivering into this runtime's script state.
    pub fn create_notifier(&self, mode: ListenerMode) -> Arc<Notifier> {
        Notifier::new(self.state_handle(), self.sender(), mode)
    }

    /// Schedules `event` for every runtime-wide listener of its name.
    ///
    /// ## Arguments
    /// * `event` - The event to broadcast on the next tick.
    /// ## Returns
    /// * The scheduled task, or `None` once the runtime has shut down; the
    ///   event is dropped in that case.
    pub fn schedule_broadcast(&self, event: EventBox) -> Option<TaskId> {
        let state = self.state.as_ref()?;
        Some(
            self.scheduler
                .sender()
                .append(Box::new(BroadcastTask::new(state.observe(), event))),
        )
    }

    /// Drains the scheduler once.
    pub fn tick(&mut self) -> RunStats {
        self.scheduler.run()
    }

    /// The number of ticks so far.
    pub fn frame(&self) -> u64 {
        self.scheduler.tick()
    }

    /// Returns `true` until [`shutdown`](Self::shutdown).
    pub fn is_running(&self) -> bool {
        self.state.is_some()
    }

    /// Allocator counters.
    pub fn handle_stats(&self) -> HandleStats {
        self.allocator.stats()
    }

    /// Invalidates the script state and retires all queued work.
    ///
    /// Work still in flight on other threads turns into no-ops. Calling this
    /// twice does nothing.
    pub fn shutdown(&mut self) {
        let Some(state) = self.state.take() else {
            return;
        };
        self.channels.release_all(state.get());
        drop(state);

        let last = self.scheduler.run();
        let dropped = self.scheduler.clear();
        log::info!(
            "Runtime shut down after {} frame(s); final pass ran {} task(s), {} dropped.",
            self.scheduler.tick(),
            last.executed,
            dropped
        );
    }
}

impl Drop for Runtime {
    fn drop(&mut self) {
        self.shutdown();
    }
}
