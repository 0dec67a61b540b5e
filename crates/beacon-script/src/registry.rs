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

//! Registry references that keep script values reachable from native code.

use crate::value::ScriptValue;

/// A reference to a value stored in a [`ListenerRegistry`].
///
/// It combines a slot index with a generation count. When a reference is
/// released its slot can be recycled, but the generation is incremented, so a
/// stale reference never resolves to the new occupant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerRef {
    index: u32,
    generation: u32,
}

impl ListenerRef {
    /// The reference that points to nothing.
    pub const NONE: ListenerRef = ListenerRef {
        index: u32::MAX,
        generation: u32::MAX,
    };

    /// Returns `true` for [`ListenerRef::NONE`].
    pub fn is_none(self) -> bool {
        self == Self::NONE
    }

    /// Returns `true` unless this is [`ListenerRef::NONE`].
    pub fn is_some(self) -> bool {
        !self.is_none()
    }

    /// Packs the reference into one word, for atomic slots.
    pub fn to_raw(self) -> u64 {
        (u64::from(self.generation) << 32) | u64::from(self.index)
    }

    /// Unpacks a word produced by [`to_raw`](Self::to_raw).
    pub fn from_raw(raw: u64) -> Self {
        Self {
            index: raw as u32,
            generation: (raw >> 32) as u32,
        }
    }
}

impl Default for ListenerRef {
    fn default() -> Self {
        Self::NONE
    }
}

/// A generational slab of script values referenced from native code.
#[derive(Debug, Default)]
pub struct ListenerRegistry {
    /// Every slot ever created: its current generation and its value, `Some`
    /// only while referenced.
    slots: Vec<(u32, Option<ScriptValue>)>,
    /// Slot indices available for reuse.
    freed: Vec<u32>,
    live: usize,
}

impl ListenerRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `value` and returns a reference to it.
    ///
    /// Storing `Nil` stores nothing and returns [`ListenerRef::NONE`].
    pub fn insert(&mut self, value: ScriptValue) -> ListenerRef {
        if matches!(value, ScriptValue::Nil) {
            return ListenerRef::NONE;
        }
        self.live += 1;

        if let Some(index) = self.freed.pop() {
            let (generation, slot) = &mut self.slots[index as usize];
            *generation = generation.wrapping_add(1);
            *slot = Some(value);
            ListenerRef {
                index,
                generation: *generation,
            }
        } else {
            let index = self.slots.len() as u32;
            debug_assert!(index != u32::MAX, "listener registry is full");
            self.slots.push((0, Some(value)));
            ListenerRef {
                index,
                generation: 0,
            }
        }
    }

    /// Returns the value behind `reference`, if it is still registered.
    pub fn get(&self, reference: ListenerRef) -> Option<&ScriptValue> {
        self.slots
            .get(reference.index as usize)
            .and_then(|(generation, value)| {
                if *generation == reference.generation {
                    value.as_ref()
                } else {
                    None
                }
            })
    }

    /// Releases `reference`, returning the value it kept alive.
    pub fn release(&mut self, reference: ListenerRef) -> Option<ScriptValue> {
        let (generation, slot) = self.slots.get_mut(reference.index as usize)?;
        if *generation != reference.generation {
            return None;
        }
        let value = slot.take()?;
        self.freed.push(reference.index);
        self.live -= 1;
        Some(value)
    }

    /// The number of values currently registered.
    pub fn len(&self) -> usize {
        self.live
    }

    /// Returns `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_get_release() {
        let mut registry = ListenerRegistry::new();
        let r = registry.insert(ScriptValue::from("listener"));

        assert!(r.is_some());
        assert!(matches!(registry.get(r), Some(ScriptValue::String(s)) if s == "listener"));
        assert_eq!(registry.len(), 1);

        assert!(registry.release(r).is_some());
        assert!(registry.get(r).is_none());
        assert!(registry.release(r).is_none(), "double release is a no-op");
        assert!(registry.is_empty());
    }

    #[test]
    fn test_stale_references_do_not_see_recycled_slots() {
        let mut registry = ListenerRegistry::new();
        let old = registry.insert(ScriptValue::from(1.0));
        registry.release(old);
        let new = registry.insert(ScriptValue::from(2.0));

        assert_ne!(old, new);
        assert!(registry.get(old).is_none());
        assert!(registry.release(old).is_none());
        assert!(matches!(registry.get(new), Some(ScriptValue::Number(v)) if *v == 2.0));
    }

    #[test]
    fn test_nil_is_never_stored() {
        let mut registry = ListenerRegistry::new();
        assert!(registry.insert(ScriptValue::Nil).is_none());
        assert!(registry.get(ListenerRef::NONE).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_raw_round_trip_preserves_none() {
        assert!(ListenerRef::from_raw(ListenerRef::NONE.to_raw()).is_none());
        assert_eq!(ListenerRef::default(), ListenerRef::NONE);
    }
}
