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

//! Per-channel listener references.
//!
//! A mixer thread finishing a channel needs the callback that was active when
//! the channel *started*, not whatever is registered on the shared notifier
//! by then. Each channel keeps that reference in its own atomic slot.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::registry::ListenerRef;
use crate::state::ScriptState;

/// One listener slot per channel, readable and writable from any thread.
#[derive(Debug)]
pub struct ChannelCallbacks {
    slots: Vec<AtomicU64>,
}

impl ChannelCallbacks {
    /// Creates `count` empty slots.
    pub fn new(count: usize) -> Self {
        Self {
            slots: (0..count)
                .map(|_| AtomicU64::new(ListenerRef::NONE.to_raw()))
                .collect(),
        }
    }

    /// Stores `listener` for `channel`, returning the reference it replaced.
    ///
    /// The caller owns the returned reference. Out-of-range channels store
    /// nothing and hand `listener` straight back.
    ///
    /// ## Arguments
    /// * `channel` - The slot index.
    /// * `listener` - The reference to store; the slot takes ownership.
    /// ## Returns
    /// * The reference previously stored, owned by the caller.
    pub fn swap(&self, channel: usize, listener: ListenerRef) -> ListenerRef {
        match self.slots.get(channel) {
            Some(slot) => ListenerRef::from_raw(slot.swap(listener.to_raw(), Ordering::AcqRel)),
            None => listener,
        }
    }

    /// Empties the slot for `channel`, handing its reference to the caller.
    pub fn take(&self, channel: usize) -> ListenerRef {
        self.swap(channel, ListenerRef::NONE)
    }

    /// The number of channels.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns `true` if there are no channels.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Releases every stored reference.
    pub fn release_all(&self, state: &ScriptState) {
        for channel in 0..self.slots.len() {
            state.release(self.take(channel));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::ScriptValue;

    #[test]
    fn test_swap_hands_back_the_previous_reference() {
        let state = ScriptState::new();
        let callbacks = ChannelCallbacks::new(4);
        let a = state.register(ScriptValue::function(|_| Ok(())));
        let b = state.register(ScriptValue::function(|_| Ok(())));

        assert!(callbacks.swap(2, a).is_none());
        assert_eq!(callbacks.swap(2, b), a);
        assert_eq!(callbacks.take(2), b);
        assert!(callbacks.take(2).is_none());
    }

    #[test]
    fn test_out_of_range_channels_store_nothing() {
        let callbacks = ChannelCallbacks::new(1);
        let state = ScriptState::new();
        let r = state.register(ScriptValue::from("x"));
        assert_eq!(callbacks.swap(5, r), r);
        assert!(callbacks.take(5).is_none());
    }

    #[test]
    fn test_release_all_empties_the_registry() {
        let state = ScriptState::new();
        let callbacks = ChannelCallbacks::new(3);
        for channel in 0..3 {
            callbacks.swap(channel, state.register(ScriptValue::function(|_| Ok(()))));
        }
        assert_eq!(state.listener_count(), 3);

        callbacks.release_all(&state);
        assert_eq!(state.listener_count(), 0);
        assert_eq!(callbacks.len(), 3);
    }
}
