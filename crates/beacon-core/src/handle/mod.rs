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

//! Invalidation-based handles to resources with a single owner.
//!
//! An owner and any number of observers share one cell holding a packed word:
//! the low bit is an "invalid" flag and the remaining bits are a reference
//! count. Dropping the [`OwnerHandle`] sets the flag; every observer
//! [`Handle`] sees it on its next [`Handle::is_valid`] call without the owner
//! ever visiting them.
//!
//! Invalidation and deallocation are independent. The cell (and the resource
//! stored in it) is freed only once the last handle, owner or observer, lets
//! go. An invalidated resource is therefore never reachable through
//! [`Handle::get`], yet its memory is never freed under a live handle.

use std::fmt;
use std::marker::PhantomData;
use std::ptr::NonNull;
use std::sync::atomic::{self, AtomicUsize, Ordering};
use std::sync::Arc;

mod allocator;

pub use self::allocator::{create_owned_resource, HandleAllocator, HandleError, HandleStats};

const FLAG_BITS: u32 = 1;
const FLAG_MASK: usize = (1 << FLAG_BITS) - 1;
const INVALID: usize = 0b1;
const REF_ONE: usize = 1 << FLAG_BITS;
const MAX_REFCOUNT: usize = (isize::MAX as usize) >> FLAG_BITS;

struct SharedCell<T> {
    word: AtomicUsize,
    resource: T,
    allocator: Arc<HandleAllocator>,
}

impl<T> SharedCell<T> {
    fn is_valid(&self) -> bool {
        self.word.load(Ordering::Acquire) & FLAG_MASK == 0
    }

    fn ref_count(&self) -> usize {
        self.word.load(Ordering::Acquire) >> FLAG_BITS
    }

    fn retain(&self) {
        let previous = self.word.fetch_add(REF_ONE, Ordering::Relaxed);
        if previous >> FLAG_BITS > MAX_REFCOUNT {
            std::process::abort();
        }
    }
}

/// Drops one reference and frees the cell if it was the last one.
///
/// # Safety
/// `ptr` must come from a live handle that owns one reference and will not
/// touch the cell again.
unsafe fn release<T>(ptr: NonNull<SharedCell<T>>) {
    let previous = ptr.as_ref().word.fetch_sub(REF_ONE, Ordering::Release);
    if previous >> FLAG_BITS != 1 {
        return;
    }
    atomic::fence(Ordering::Acquire);

    let cell = Box::from_raw(ptr.as_ptr());
    let SharedCell {
        resource,
        allocator,
        ..
    } = *cell;
    drop(resource);
    allocator.release_cell();
}

/// An observer-side reference to a resource owned elsewhere.
///
/// Cloning increments the shared reference count and dropping decrements it.
/// A default-constructed handle points to nothing and is always invalid.
pub struct Handle<T> {
    cell: Option<NonNull<SharedCell<T>>>,
    _owns: PhantomData<SharedCell<T>>,
}

// SAFETY: the shared word is atomic, and the resource is only ever exposed
// through `&T`, so sharing requires `T: Sync` and freeing on another thread
// requires `T: Send`.
unsafe impl<T: Send + Sync> Send for Handle<T> {}
unsafe impl<T: Send + Sync> Sync for Handle<T> {}

impl<T> Handle<T> {
    /// Creates a handle bound to nothing.
    pub const fn empty() -> Self {
        Self {
            cell: None,
            _owns: PhantomData,
        }
    }

    fn cell(&self) -> Option<&SharedCell<T>> {
        // SAFETY: this handle holds one reference, so the cell is allocated.
        self.cell.map(|ptr| unsafe { &*ptr.as_ptr() })
    }

    /// Returns `true` iff the owner has not invalidated the resource.
    ///
    /// Validity can flip between two calls; check it at every use site.
    pub fn is_valid(&self) -> bool {
        self.cell().is_some_and(SharedCell::is_valid)
    }

    /// Returns the resource if it is still valid.
    pub fn get(&self) -> Option<&T> {
        self.cell()
            .filter(|cell| cell.is_valid())
            .map(|cell| &cell.resource)
    }

    /// Returns `true` if this handle was never bound to a resource.
    pub fn is_empty(&self) -> bool {
        self.cell.is_none()
    }

    /// The number of handles (owner included) sharing this handle's cell.
    pub fn ref_count(&self) -> usize {
        self.cell().map_or(0, SharedCell::ref_count)
    }

    /// Returns `true` if both handles share the same cell.
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        matches!((a.cell, b.cell), (Some(x), Some(y)) if x == y)
    }
}

impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        if let Some(cell) = self.cell() {
            cell.retain();
        }
        Self {
            cell: self.cell,
            _owns: PhantomData,
        }
    }
}

impl<T> Drop for Handle<T> {
    fn drop(&mut self) {
        if let Some(ptr) = self.cell.take() {
            // SAFETY: the reference owned by this handle is given up here.
            unsafe { release(ptr) };
        }
    }
}

impl<T> Default for Handle<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle")
            .field("valid", &self.is_valid())
            .field("ref_count", &self.ref_count())
            .finish()
    }
}

/// The single handle that owns the act of invalidation.
///
/// Created once per resource by [`HandleAllocator::create_owned`]. It cannot
/// be cloned; observers receive [`Handle`]s through [`OwnerHandle::observe`].
pub struct OwnerHandle<T> {
    cell: NonNull<SharedCell<T>>,
    _owns: PhantomData<SharedCell<T>>,
}

// SAFETY: same reasoning as for `Handle`.
unsafe impl<T: Send + Sync> Send for OwnerHandle<T> {}
unsafe impl<T: Send + Sync> Sync for OwnerHandle<T> {}

impl<T> OwnerHandle<T> {
    pub(crate) fn new(resource: T, allocator: Arc<HandleAllocator>) -> Self {
        let cell = Box::new(SharedCell {
            word: AtomicUsize::new(REF_ONE),
            resource,
            allocator,
        });
        Self {
            cell: NonNull::from(Box::leak(cell)),
            _owns: PhantomData,
        }
    }

    fn cell(&self) -> &SharedCell<T> {
        // SAFETY: the owner holds one reference until it is dropped.
        unsafe { self.cell.as_ref() }
    }

    /// Hands out an observer handle sharing this resource's cell.
    pub fn observe(&self) -> Handle<T> {
        self.cell().retain();
        Handle {
            cell: Some(self.cell),
            _owns: PhantomData,
        }
    }

    /// The owned resource. The owner is valid for as long as it exists.
    pub fn get(&self) -> &T {
        &self.cell().resource
    }

    /// The number of handles (owner included) sharing this cell.
    pub fn ref_count(&self) -> usize {
        self.cell().ref_count()
    }

    /// The allocator the cell was taken from.
    pub fn allocator(&self) -> &Arc<HandleAllocator> {
        &self.cell().allocator
    }
}

impl<T> Drop for OwnerHandle<T> {
    fn drop(&mut self) {
        let previous = self.cell().word.fetch_or(INVALID, Ordering::Release);
        debug_assert_eq!(previous & FLAG_MASK, 0, "resource invalidated twice");
        log::trace!(
            "Owner handle dropped; {} observer(s) now see an invalid resource.",
            (previous >> FLAG_BITS).saturating_sub(1)
        );
        // SAFETY: the owner's reference is given up here and never used again.
        unsafe { release(self.cell) };
    }
}

impl<T> From<&OwnerHandle<T>> for Handle<T> {
    fn from(owner: &OwnerHandle<T>) -> Self {
        owner.observe()
    }
}

impl<T> fmt::Debug for OwnerHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OwnerHandle")
            .field("ref_count", &self.ref_count())
            .finish()
    }
}
