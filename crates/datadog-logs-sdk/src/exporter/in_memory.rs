// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio_util::sync::CancellationToken;

use crate::error::ExportError;
use crate::exporter::Exporter;
use crate::record::LogRecord;

/// Exporter keeping every exported batch in memory.
///
/// Clones share the same storage, so a test can hand one clone to a processor
/// and inspect another.
#[derive(Debug, Clone, Default)]
pub struct InMemoryExporter {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    batches: Mutex<Vec<Vec<LogRecord>>>,
    failure: Mutex<Option<Failure>>,
    export_calls: AtomicUsize,
    shutdown_calls: AtomicUsize,
    force_flush_calls: AtomicUsize,
    is_shutdown: AtomicBool,
}

#[derive(Debug)]
struct Failure {
    successes_left: usize,
    error: ExportError,
}

impl InMemoryExporter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Lets the next `successes` exports through, then fails every later one
    /// with `error`.
    pub fn fail_after(&self, successes: usize, error: ExportError) {
        *lock(&self.inner.failure) = Some(Failure {
            successes_left: successes,
            error,
        });
    }

    /// Stops injecting failures.
    pub fn clear_failure(&self) {
        *lock(&self.inner.failure) = None;
    }

    /// Successfully exported batches, in export order.
    #[must_use]
    pub fn batches(&self) -> Vec<Vec<LogRecord>> {
        lock(&self.inner.batches).clone()
    }

    /// Successfully exported records, flattened in export order.
    #[must_use]
    pub fn records(&self) -> Vec<LogRecord> {
        lock(&self.inner.batches).iter().flatten().cloned().collect()
    }

    /// Forgets every exported batch.
    pub fn reset(&self) {
        lock(&self.inner.batches).clear();
    }

    /// Number of `export` calls, failed ones included.
    #[must_use]
    pub fn export_calls(&self) -> usize {
        self.inner.export_calls.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn shutdown_calls(&self) -> usize {
        self.inner.shutdown_calls.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn force_flush_calls(&self) -> usize {
        self.inner.force_flush_calls.load(Ordering::SeqCst)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[async_trait]
impl Exporter for InMemoryExporter {
    async fn export(
        &self,
        batch: &[LogRecord],
        cancel: &CancellationToken,
    ) -> Result<(), ExportError> {
        self.inner.export_calls.fetch_add(1, Ordering::SeqCst);

        if self.inner.is_shutdown.load(Ordering::SeqCst) {
            return Err(ExportError::AlreadyShutdown);
        }
        if cancel.is_cancelled() {
            return Err(ExportError::Cancelled);
        }

        if let Some(failure) = lock(&self.inner.failure).as_mut() {
            if failure.successes_left == 0 {
                return Err(failure.error.clone());
            }
            failure.successes_left -= 1;
        }

        lock(&self.inner.batches).push(batch.to_vec());
        Ok(())
    }

    async fn shutdown(&self) -> Result<(), ExportError> {
        self.inner.shutdown_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.is_shutdown.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn force_flush(&self) -> Result<(), ExportError> {
        self.inner.force_flush_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
