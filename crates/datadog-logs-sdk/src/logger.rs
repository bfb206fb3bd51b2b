// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Logger API surface.
//!
//! A [`LoggerProvider`] owns the processors; every [`Logger`] it hands out
//! stamps records with its scope and fans them out to those processors.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::time::Instant;
use tracing::debug;

use crate::config::deadline_after;
use crate::error::{self, ProcessorError};
use crate::processor::Processor;
use crate::record::LogRecord;

#[derive(Debug, Default)]
pub struct LoggerProviderBuilder {
    processors: Vec<Arc<dyn Processor>>,
}

impl LoggerProviderBuilder {
    /// Adds a processor. Processors see records in registration order.
    #[must_use]
    pub fn with_processor<P>(mut self, processor: P) -> Self
    where
        P: Processor + 'static,
    {
        self.processors.push(Arc::new(processor));
        self
    }

    #[must_use]
    pub fn build(self) -> LoggerProvider {
        LoggerProvider {
            inner: Arc::new(ProviderInner {
                processors: self.processors,
                is_shutdown: AtomicBool::new(false),
            }),
        }
    }
}

#[derive(Debug)]
struct ProviderInner {
    processors: Vec<Arc<dyn Processor>>,
    is_shutdown: AtomicBool,
}

/// Entry point for emitting records. Cheap to clone.
#[derive(Debug, Clone)]
pub struct LoggerProvider {
    inner: Arc<ProviderInner>,
}

impl LoggerProvider {
    #[must_use]
    pub fn builder() -> LoggerProviderBuilder {
        LoggerProviderBuilder::default()
    }

    /// Returns a logger whose records carry `scope` (usually the name of the
    /// emitting library or module).
    #[must_use]
    pub fn logger(&self, scope: impl Into<Arc<str>>) -> Logger {
        Logger {
            scope: scope.into(),
            provider: self.clone(),
        }
    }

    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        self.inner.is_shutdown.load(Ordering::Acquire)
    }

    /// Flushes every processor; errors are joined. `timeout` bounds the whole
    /// call, each processor gets what is left of it.
    pub async fn force_flush(&self, timeout: Duration) -> Result<(), ProcessorError> {
        if self.is_shutdown() {
            return Ok(());
        }

        let deadline = deadline_after(timeout);
        let mut errors = Vec::new();
        for processor in &self.inner.processors {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if let Err(e) = processor.force_flush(remaining).await {
                errors.push(e);
            }
        }
        error::join(errors)
    }

    /// Shuts down every processor; errors are joined. Only the first call
    /// does any work. As with [`force_flush`](Self::force_flush), processors
    /// share one deadline.
    pub async fn shutdown(&self, timeout: Duration) -> Result<(), ProcessorError> {
        if self.inner.is_shutdown.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        debug!(
            "LOGS | Shutting down logger provider with {} processors",
            self.inner.processors.len()
        );

        let deadline = deadline_after(timeout);
        let mut errors = Vec::new();
        for processor in &self.inner.processors {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if let Err(e) = processor.shutdown(remaining).await {
                errors.push(e);
            }
        }
        error::join(errors)
    }
}

/// Emits records into the processors of its provider.
#[derive(Debug, Clone)]
pub struct Logger {
    scope: Arc<str>,
    provider: LoggerProvider,
}

impl Logger {
    #[must_use]
    pub fn scope(&self) -> &str {
        &self.scope
    }

    /// Reports whether any processor would accept `record`.
    #[must_use]
    pub fn enabled(&self, record: &LogRecord) -> bool {
        !self.provider.is_shutdown()
            && self
                .provider
                .inner
                .processors
                .iter()
                .any(|p| p.enabled(record))
    }

    /// Hands `record` to every processor that accepts it. The observed
    /// timestamp and scope are filled in when missing. Does nothing once the
    /// provider is shut down.
    pub fn emit(&self, mut record: LogRecord) {
        if self.provider.is_shutdown() {
            return;
        }

        if record.observed_timestamp.is_none() {
            record.observed_timestamp = Some(SystemTime::now());
        }
        if record.scope.is_none() {
            record.scope = Some(Arc::clone(&self.scope));
        }

        for processor in &self.provider.inner.processors {
            if processor.enabled(&record) {
                processor.on_emit(&record);
            }
        }
    }
}
