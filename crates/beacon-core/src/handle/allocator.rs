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

//! Budgeted allocation of shared handle cells.
//!
//! Every owned resource needs one shared cell. The [`HandleAllocator`] hands
//! those cells out against an optional capacity and keeps atomic counters so
//! that any thread can observe how many cells are alive, in the same spirit
//! as the engine-wide memory counters.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use thiserror::Error;

use super::OwnerHandle;

/// Errors produced while creating an owned resource.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HandleError {
    /// Every cell permitted by the allocator's capacity is currently alive.
    #[error("handle allocator exhausted: {capacity} live cells")]
    Exhausted {
        /// The capacity of the allocator that refused the request.
        capacity: usize,
    },
}

/// A snapshot of the allocator's counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HandleStats {
    /// The maximum number of simultaneously live cells, if bounded.
    pub capacity: Option<usize>,
    /// Cells currently allocated (owner or observers still holding them).
    pub live_cells: usize,
    /// The highest number of cells that were ever alive at the same time.
    pub peak_cells: usize,
    /// Total number of cells ever handed out.
    pub cells_created: u64,
    /// Total number of cells freed after their last handle was dropped.
    pub cells_freed: u64,
}

/// Hands out shared cells for [`OwnerHandle`]s.
///
/// Cells are returned to the allocator by whichever handle drops the last
/// reference, which may be the owner or any observer, on any thread.
#[derive(Debug)]
pub struct HandleAllocator {
    capacity: Option<usize>,
    live: AtomicUsize,
    peak: AtomicUsize,
    created: AtomicU64,
    freed: AtomicU64,
}

impl HandleAllocator {
    /// Creates an allocator that refuses to keep more than `capacity` cells alive.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Arc<Self> {
        Arc::new(Self::new(Some(capacity)))
    }

    /// Creates an allocator without a capacity limit.
    #[must_use]
    pub fn unbounded() -> Arc<Self> {
        Arc::new(Self::new(None))
    }

    fn new(capacity: Option<usize>) -> Self {
        Self {
            capacity,
            live: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            created: AtomicU64::new(0),
            freed: AtomicU64::new(0),
        }
    }

    /// Binds `resource` to a freshly allocated cell and returns its owner handle.
    ///
    /// ## Arguments
    /// * `resource` - The value the new cell keeps alive.
    /// ## Returns
    /// * The owner handle; observers are taken from it with `observe`.
    ///
    /// ## Errors
    /// Returns [`HandleError::Exhausted`] when the capacity is reached. The
    /// resource is dropped in that case.
    pub fn create_owned<T>(self: &Arc<Self>, resource: T) -> Result<OwnerHandle<T>, HandleError> {
        self.reserve_cell()?;
        Ok(OwnerHandle::new(resource, Arc::clone(self)))
    }

    /// Returns the configured capacity, or `None` when unbounded.
    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    /// Returns the number of cells currently alive.
    pub fn live_cells(&self) -> usize {
        self.live.load(Ordering::Acquire)
    }

    /// Takes a snapshot of all counters.
    pub fn stats(&self) -> HandleStats {
        HandleStats {
            capacity: self.capacity,
            live_cells: self.live.load(Ordering::Acquire),
            peak_cells: self.peak.load(Ordering::Relaxed),
            cells_created: self.created.load(Ordering::Relaxed),
            cells_freed: self.freed.load(Ordering::Relaxed),
        }
    }

    fn reserve_cell(&self) -> Result<(), HandleError> {
        let reserved = self
            .live
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |live| {
                match self.capacity {
                    Some(capacity) if live >= capacity => None,
                    _ => Some(live + 1),
                }
            });

        match reserved {
            Ok(previous) => {
                self.peak.fetch_max(previous + 1, Ordering::Relaxed);
                self.created.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            Err(live) => {
                let capacity = self.capacity.unwrap_or(live);
                log::warn!("Handle allocator exhausted ({capacity} live cells).");
                Err(HandleError::Exhausted { capacity })
            }
        }
    }

    pub(super) fn release_cell(&self) {
        let previous = self.live.fetch_sub(1, Ordering::AcqRel);
        debug_assert!(previous > 0, "handle cell released more often than allocated");
        self.freed.fetch_add(1, Ordering::Relaxed);
    }
}

/// Binds `resource` to a new shared cell taken from `allocator`.
///
/// This is the one call made per resource lifetime. The returned owner
/// handle invalidates every observer when dropped.
///
/// ## Arguments
/// * `allocator` - The allocator the cell is taken from.
/// * `resource` - The value the cell keeps alive.
/// ## Returns
/// * The owner handle, or [`HandleError::Exhausted`] at capacity.
pub fn create_owned_resource<T>(
    allocator: &Arc<HandleAllocator>,
    resource: T,
) -> Result<OwnerHandle<T>, HandleError> {
    allocator.create_owned(resource)
}
