// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Mock exporters for testing

#![allow(dead_code)]

use async_trait::async_trait;
use datadog_logs_sdk::error::ExportError;
use datadog_logs_sdk::exporter::Exporter;
use datadog_logs_sdk::record::LogRecord;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

/// Exporter whose `export` calls wait for [`GatedExporter::release`].
///
/// Batches are recorded when the call starts. A gate that is never released
/// behaves like an exporter blocking forever; the call still ends when its
/// cancellation token fires.
#[derive(Debug, Clone)]
pub struct GatedExporter {
    inner: Arc<GatedInner>,
}

#[derive(Debug)]
struct GatedInner {
    gate: Semaphore,
    started: Mutex<Vec<Vec<LogRecord>>>,
    failure: Mutex<Option<ExportError>>,
    shutdown_calls: AtomicUsize,
}

impl GatedExporter {
    pub fn new() -> Self {
        Self::with_failure(None)
    }

    /// Released calls return `error` instead of succeeding.
    pub fn failing_with(error: ExportError) -> Self {
        Self::with_failure(Some(error))
    }

    fn with_failure(failure: Option<ExportError>) -> Self {
        Self {
            inner: Arc::new(GatedInner {
                gate: Semaphore::new(0),
                started: Mutex::new(Vec::new()),
                failure: Mutex::new(failure),
                shutdown_calls: AtomicUsize::new(0),
            }),
        }
    }

    /// Lets `calls` pending or future export calls finish.
    pub fn release(&self, calls: usize) {
        self.inner.gate.add_permits(calls);
    }

    /// Batches passed to `export`, including calls still waiting.
    pub fn started(&self) -> Vec<Vec<LogRecord>> {
        self.inner.started.lock().unwrap().clone()
    }

    pub fn export_calls(&self) -> usize {
        self.inner.started.lock().unwrap().len()
    }

    pub fn shutdown_calls(&self) -> usize {
        self.inner.shutdown_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Exporter for GatedExporter {
    async fn export(
        &self,
        batch: &[LogRecord],
        cancel: &CancellationToken,
    ) -> Result<(), ExportError> {
        self.inner.started.lock().unwrap().push(batch.to_vec());

        tokio::select! {
            permit = self.inner.gate.acquire() => {
                permit.map_err(|_| ExportError::Cancelled)?.forget();
            }
            () = cancel.cancelled() => return Err(ExportError::Cancelled),
        }

        match self.inner.failure.lock().unwrap().clone() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    async fn shutdown(&self) -> Result<(), ExportError> {
        self.inner.shutdown_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Exporter whose exports succeed at once but whose `force_flush` and
/// `shutdown` never complete, like a client waiting on a request that never
/// returns.
#[derive(Debug, Clone, Default)]
pub struct StuckExporter {
    exported: Arc<AtomicUsize>,
    force_flush_calls: Arc<AtomicUsize>,
    shutdown_calls: Arc<AtomicUsize>,
}

impl StuckExporter {
    pub fn exported(&self) -> usize {
        self.exported.load(Ordering::SeqCst)
    }

    pub fn force_flush_calls(&self) -> usize {
        self.force_flush_calls.load(Ordering::SeqCst)
    }

    pub fn shutdown_calls(&self) -> usize {
        self.shutdown_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Exporter for StuckExporter {
    async fn export(
        &self,
        batch: &[LogRecord],
        _cancel: &CancellationToken,
    ) -> Result<(), ExportError> {
        self.exported.fetch_add(batch.len(), Ordering::SeqCst);
        Ok(())
    }

    async fn shutdown(&self) -> Result<(), ExportError> {
        self.shutdown_calls.fetch_add(1, Ordering::SeqCst);
        std::future::pending().await
    }

    async fn force_flush(&self) -> Result<(), ExportError> {
        self.force_flush_calls.fetch_add(1, Ordering::SeqCst);
        std::future::pending().await
    }
}
