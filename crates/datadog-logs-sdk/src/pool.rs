// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Reusable staging buffers for dequeued batches.
//!
//! The poll loop stages every batch into a buffer taken from this pool and the
//! dispatch loop returns it after the export call, so steady-state polling
//! does not allocate.

use std::sync::{Mutex, PoisonError};

/// Upper bound on idle buffers kept for reuse.
const MAX_IDLE_BUFFERS: usize = 16;

/// Free list of batch-sized `Vec`s.
///
/// There is no ordering guarantee: a buffer given back with [`put`] may or may
/// not be the next one handed out by [`get`].
///
/// [`get`]: BufferPool::get
/// [`put`]: BufferPool::put
#[derive(Debug)]
pub struct BufferPool<T> {
    free: Mutex<Vec<Vec<T>>>,
    batch_size: usize,
}

impl<T> BufferPool<T> {
    #[must_use]
    pub fn new(batch_size: usize) -> Self {
        Self {
            free: Mutex::new(Vec::new()),
            batch_size,
        }
    }

    #[must_use]
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Returns an empty buffer with room for at least one batch.
    pub fn get(&self) -> Vec<T> {
        self.free
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop()
            .unwrap_or_else(|| Vec::with_capacity(self.batch_size))
    }

    /// Clears `buf` and keeps it for reuse. Buffers smaller than a batch, or
    /// beyond the idle limit, are dropped.
    pub fn put(&self, mut buf: Vec<T>) {
        if buf.capacity() < self.batch_size {
            return;
        }
        buf.clear();

        let mut free = self.free.lock().unwrap_or_else(PoisonError::into_inner);
        if free.len() < MAX_IDLE_BUFFERS {
            free.push(buf);
        }
    }

    #[cfg(test)]
    fn idle(&self) -> usize {
        self.free.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}
