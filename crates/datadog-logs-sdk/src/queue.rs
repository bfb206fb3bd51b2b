// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Bounded ring queue with drop-oldest overflow.
//!
//! The queue sits between the producers calling
//! [`BatchProcessor::on_emit`](crate::processor::BatchProcessor) and the
//! background poll loop. Producers never block and never fail: once the queue
//! is full, each new item evicts the oldest one and bumps a dropped counter.
//!
//! # Layout
//!
//! ```text
//!   slots: [ _ | a | b | c | _ ]      capacity = 4, slots = capacity + 1
//!                ^           ^
//!               head        tail
//! ```
//!
//! One slot is always left unused so that `head == tail` means empty and
//! `head == next(tail)` means full, without a separate length field.
//!
//! # Consumers
//!
//! [`RingQueue::try_dequeue`] runs its commit callback while holding the queue
//! lock. The batch processor commits staged batches to its dispatch channel
//! from inside that callback, so staging and hand-off happen atomically and
//! concurrent consumers cannot interleave batches.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Fixed-capacity FIFO queue that drops the oldest item on overflow.
#[derive(Debug)]
pub struct RingQueue<T> {
    state: Mutex<RingState<T>>,
    dropped: AtomicU64,
    capacity: usize,
}

#[derive(Debug)]
struct RingState<T> {
    slots: Box<[Option<T>]>,
    /// Index of the oldest item.
    head: usize,
    /// Index of the next free slot.
    tail: usize,
}

impl<T> RingState<T> {
    fn next(&self, index: usize) -> usize {
        (index + 1) % self.slots.len()
    }

    fn len(&self) -> usize {
        (self.tail + self.slots.len() - self.head) % self.slots.len()
    }

    fn is_full(&self) -> bool {
        self.head == self.next(self.tail)
    }

    /// Removes the oldest item. The caller checks the queue is not empty.
    fn pop_front(&mut self) -> Option<T> {
        let item = self.slots[self.head].take();
        self.head = self.next(self.head);
        item
    }
}

impl<T> RingQueue<T> {
    /// Creates a queue holding at most `capacity` items. A capacity of zero is
    /// raised to one.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let slots = (0..=capacity).map(|_| None).collect::<Vec<_>>();

        Self {
            state: Mutex::new(RingState {
                slots: slots.into_boxed_slice(),
                head: 0,
                tail: 0,
            }),
            dropped: AtomicU64::new(0),
            capacity,
        }
    }

    // Poisoning is ignored, indices are only ever assigned whole
    fn lock(&self) -> MutexGuard<'_, RingState<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Appends `item`, evicting the oldest item if the queue is full.
    ///
    /// Returns the queue length after the insert.
    pub fn enqueue(&self, item: T) -> usize {
        let mut state = self.lock();

        if state.is_full() {
            drop(state.pop_front());
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }

        let tail = state.tail;
        state.slots[tail] = Some(item);
        state.tail = state.next(tail);

        state.len()
    }

    /// Moves up to `limit` of the oldest items into `buf`, in FIFO order.
    ///
    /// Returns `(remaining, written)`: how many items are still queued and how
    /// many were appended to `buf`.
    pub fn dequeue(&self, buf: &mut Vec<T>, limit: usize) -> (usize, usize) {
        let mut state = self.lock();

        let written = state.len().min(limit);
        buf.reserve(written);
        for _ in 0..written {
            if let Some(item) = state.pop_front() {
                buf.push(item);
            }
        }

        (state.len(), written)
    }

    /// Drains every queued item, oldest first.
    pub fn flush(&self) -> Vec<T> {
        let mut state = self.lock();

        let mut items = Vec::with_capacity(state.len());
        while state.len() > 0 {
            if let Some(item) = state.pop_front() {
                items.push(item);
            }
        }

        items
    }

    /// Returns the number of items dropped since the previous call and resets
    /// the counter.
    pub fn dropped(&self) -> u64 {
        self.dropped.swap(0, Ordering::Relaxed)
    }
}

impl<T: Clone> RingQueue<T> {
    /// Copies up to `limit` of the oldest items into `buf` and offers them to
    /// `commit`, without removing them yet.
    ///
    /// The items are removed only if `commit` returns `true`; otherwise the
    /// queue is left exactly as it was. `commit` runs while the queue lock is
    /// held and is not called at all when the queue is empty. `commit` may take
    /// the contents of `buf`.
    ///
    /// Returns the number of items still queued.
    pub fn try_dequeue<F>(&self, buf: &mut Vec<T>, limit: usize, commit: F) -> usize
    where
        F: FnOnce(&mut Vec<T>) -> bool,
    {
        let mut state = self.lock();

        let count = state.len().min(limit);
        if count == 0 {
            return state.len();
        }

        buf.reserve(count);
        let mut index = state.head;
        for _ in 0..count {
            if let Some(item) = &state.slots[index] {
                buf.push(item.clone());
            }
            index = state.next(index);
        }

        if commit(buf) {
            for _ in 0..count {
                drop(state.pop_front());
            }
        }

        state.len()
    }
}
