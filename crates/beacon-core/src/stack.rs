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

//! A push-only lock-free stack whose consumer claims the whole chain at once.
//!
//! Nodes are never popped individually, only detached wholesale by swapping
//! the head with null, so the usual ABA hazard of Treiber stacks cannot occur.

use std::ptr;
use std::sync::atomic::{AtomicPtr, Ordering};

struct Node<T> {
    value: T,
    next: *mut Node<T>,
}

pub(crate) struct AtomicStack<T> {
    head: AtomicPtr<Node<T>>,
}

// SAFETY: values move between threads through the stack but are never shared.
unsafe impl<T: Send> Send for AtomicStack<T> {}
unsafe impl<T: Send> Sync for AtomicStack<T> {}

impl<T> AtomicStack<T> {
    pub(crate) const fn new() -> Self {
        Self {
            head: AtomicPtr::new(ptr::null_mut()),
        }
    }

    /// Pushes `value` on top of the stack. Never blocks.
    pub(crate) fn push(&self, value: T) {
        let node = Box::into_raw(Box::new(Node {
            value,
            next: ptr::null_mut(),
        }));

        let mut head = self.head.load(Ordering::Relaxed);
        loop {
            // SAFETY: `node` is not yet published, this thread owns it.
            unsafe { (*node).next = head };
            match self
                .head
                .compare_exchange_weak(head, node, Ordering::Release, Ordering::Relaxed)
            {
                Ok(_) => return,
                Err(current) => head = current,
            }
        }
    }

    /// Detaches every node pushed so far with a single swap.
    ///
    /// The returned iterator yields values newest first.
    pub(crate) fn take_all(&self) -> Chain<T> {
        Chain {
            node: self.head.swap(ptr::null_mut(), Ordering::Acquire),
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.head.load(Ordering::Acquire).is_null()
    }
}

impl<T> Drop for AtomicStack<T> {
    fn drop(&mut self) {
        drop(self.take_all());
    }
}

/// A detached chain of nodes, owned by the consumer.
pub(crate) struct Chain<T> {
    node: *mut Node<T>,
}

impl<T> Iterator for Chain<T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        if self.node.is_null() {
            return None;
        }
        // SAFETY: the chain was detached from the stack, so every node in it
        // is owned exclusively by this iterator.
        let node = unsafe { Box::from_raw(self.node) };
        self.node = node.next;
        Some(node.value)
    }
}

impl<T> Drop for Chain<T> {
    fn drop(&mut self) {
        for _ in self.by_ref() {}
    }
}
