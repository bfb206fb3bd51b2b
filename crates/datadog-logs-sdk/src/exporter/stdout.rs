// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio_util::sync::CancellationToken;

use crate::error::ExportError;
use crate::exporter::Exporter;
use crate::record::LogRecord;

/// Writes every record as one JSON object per line.
///
/// Defaults to stdout; any [`Write`] implementation can be used instead.
/// Writes and flushes run on the blocking thread pool, so a slow pipe holds
/// up the dispatch loop but not the runtime workers.
///
/// # Example Output
///
/// ```text
/// {"timestamp":null,"observed_timestamp":1700000000000000000,"severity":9,"severity_text":null,"body":"started","attributes":[],"trace_context":null,"scope":"app"}
/// ```
#[derive(Debug)]
pub struct StdoutExporter<W: Write + Send + 'static = io::Stdout> {
    writer: Arc<Mutex<W>>,
    is_shutdown: AtomicBool,
}

impl StdoutExporter<io::Stdout> {
    #[must_use]
    pub fn new() -> Self {
        Self::with_writer(io::stdout())
    }
}

impl Default for StdoutExporter<io::Stdout> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: Write + Send + 'static> StdoutExporter<W> {
    #[must_use]
    pub fn with_writer(writer: W) -> Self {
        Self {
            writer: Arc::new(Mutex::new(writer)),
            is_shutdown: AtomicBool::new(false),
        }
    }

    /// Returns the writer, consuming the exporter. `None` while a write
    /// abandoned by a timed out export is still running.
    pub fn into_writer(self) -> Option<W> {
        Arc::try_unwrap(self.writer)
            .ok()
            .map(|writer| writer.into_inner().unwrap_or_else(PoisonError::into_inner))
    }

    async fn with_locked_writer<F>(&self, op: F) -> Result<(), ExportError>
    where
        F: FnOnce(&mut W) -> io::Result<()> + Send + 'static,
    {
        let writer = Arc::clone(&self.writer);
        tokio::task::spawn_blocking(move || {
            let mut writer = writer.lock().unwrap_or_else(PoisonError::into_inner);
            op(&mut *writer)
        })
        .await
        .map_err(|e| ExportError::Failed(format!("stdout writer task failed: {e}")))??;
        Ok(())
    }
}

#[async_trait]
impl<W: Write + Send + std::fmt::Debug + 'static> Exporter for StdoutExporter<W> {
    async fn export(
        &self,
        batch: &[LogRecord],
        cancel: &CancellationToken,
    ) -> Result<(), ExportError> {
        if self.is_shutdown.load(Ordering::Acquire) {
            return Err(ExportError::AlreadyShutdown);
        }

        let mut lines = Vec::new();
        for record in batch {
            if cancel.is_cancelled() {
                return Err(ExportError::Cancelled);
            }
            serde_json::to_writer(&mut lines, record)?;
            lines.push(b'\n');
        }
        if lines.is_empty() {
            return Ok(());
        }

        self.with_locked_writer(move |writer| writer.write_all(&lines))
            .await
    }

    async fn shutdown(&self) -> Result<(), ExportError> {
        if self.is_shutdown.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        self.with_locked_writer(|writer| writer.flush()).await
    }

    async fn force_flush(&self) -> Result<(), ExportError> {
        self.with_locked_writer(|writer| writer.flush()).await
    }
}
