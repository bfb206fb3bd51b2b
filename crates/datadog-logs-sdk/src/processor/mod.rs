// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Log processors.
//!
//! A [`Processor`] receives every record a [`Logger`](crate::logger::Logger)
//! emits. The [`BatchProcessor`] is the production implementation: it queues
//! records and exports them in batches from two background tasks.
//!
//! # Batch Processor Architecture
//!
//! ```text
//!    on_emit (any thread)
//!           │ clone + enqueue
//!           v
//!    ┌──────────────┐   trigger (len >= batch size)
//!    │  Ring Queue  │ ─────────────────────────┐
//!    └──────┬───────┘                          │
//!           │ try_dequeue (one batch)          v
//!           │                           ┌──────────────┐
//!           └────────────────────────── │  Poll Loop   │ (ticker / trigger / stop)
//!                                       └──────┬───────┘
//!                                              │ chunk job (bounded channel)
//!                                              v
//!                                       ┌──────────────┐
//!                                       │Dispatch Loop │ ──> TimeoutExporter<ChunkExporter<E>>
//!                                       └──────┬───────┘
//!                                              │ result
//!                                              v
//!                         waiting force_flush/shutdown caller, or ErrorHandler
//! ```
//!
//! # Components
//!
//! - **[`batch`]**: the [`BatchProcessor`] façade and its builder
//! - **[`poll`]**: background task forming batches from the queue
//! - **[`dispatch`]**: background task calling the exporter

pub mod batch;
pub(crate) mod dispatch;
pub(crate) mod poll;

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::error;

pub use batch::{BatchProcessor, BatchProcessorBuilder};

use crate::error::ProcessorError;
use crate::record::LogRecord;

/// Receives records from loggers.
#[async_trait]
pub trait Processor: Send + Sync + fmt::Debug {
    /// Called for every emitted record. Must not block.
    fn on_emit(&self, record: &LogRecord);

    /// Reports whether `record` would be processed. Loggers skip
    /// [`on_emit`](Processor::on_emit) when this returns `false`.
    fn enabled(&self, _record: &LogRecord) -> bool {
        true
    }

    /// Exports everything received so far, waiting at most `timeout`.
    async fn force_flush(&self, timeout: Duration) -> Result<(), ProcessorError>;

    /// Flushes and releases resources, waiting at most `timeout`. After this
    /// returns every call is a no-op.
    async fn shutdown(&self, timeout: Duration) -> Result<(), ProcessorError>;
}

#[async_trait]
impl<P: Processor + ?Sized> Processor for Arc<P> {
    fn on_emit(&self, record: &LogRecord) {
        (**self).on_emit(record);
    }

    fn enabled(&self, record: &LogRecord) -> bool {
        (**self).enabled(record)
    }

    async fn force_flush(&self, timeout: Duration) -> Result<(), ProcessorError> {
        (**self).force_flush(timeout).await
    }

    async fn shutdown(&self, timeout: Duration) -> Result<(), ProcessorError> {
        (**self).shutdown(timeout).await
    }
}

/// Sink for errors raised by background work that has no caller to report to.
pub trait ErrorHandler: Send + Sync {
    fn handle(&self, error: ProcessorError);
}

impl<F> ErrorHandler for F
where
    F: Fn(ProcessorError) + Send + Sync,
{
    fn handle(&self, error: ProcessorError) {
        self(error);
    }
}

/// Default [`ErrorHandler`]: logs the error with `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingErrorHandler;

impl ErrorHandler for TracingErrorHandler {
    fn handle(&self, error: ProcessorError) {
        error!("LOGS | Background export failed: {}", error);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExportError;
    use std::sync::Mutex;
    use tracing_test::traced_test;

    #[test]
    fn test_closure_error_handler() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let handler = move |error: ProcessorError| sink.lock().unwrap().push(error.to_string());

        handler.handle(ProcessorError::Stopped);

        assert_eq!(*seen.lock().unwrap(), vec!["processor is shut down".to_string()]);
    }

    #[test]
    #[traced_test]
    fn test_tracing_error_handler_logs() {
        TracingErrorHandler.handle(ExportError::Failed("connection reset".to_string()).into());

        assert!(logs_contain("Background export failed: export failed: connection reset"));
    }
}
