// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Exporter wrappers enforcing a per-call deadline and a maximum batch size.
//!
//! The two wrappers are independent and compose as
//! `TimeoutExporter<ChunkExporter<E>>`: the deadline covers the whole call,
//! including every chunk the inner wrapper produces.

use async_trait::async_trait;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::ExportError;
use crate::exporter::Exporter;
use crate::record::LogRecord;

/// Bounds every [`Exporter::export`] call by a fixed timeout.
///
/// The inner exporter receives a child of the caller's cancellation token.
/// When the timeout expires the child token is cancelled, the pending call is
/// dropped, and [`ExportError::Timeout`] is returned.
#[derive(Debug)]
pub struct TimeoutExporter<E> {
    inner: E,
    timeout: Duration,
}

impl<E> TimeoutExporter<E> {
    #[must_use]
    pub fn new(inner: E, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    #[must_use]
    pub fn inner(&self) -> &E {
        &self.inner
    }
}

#[async_trait]
impl<E: Exporter> Exporter for TimeoutExporter<E> {
    async fn export(
        &self,
        batch: &[LogRecord],
        cancel: &CancellationToken,
    ) -> Result<(), ExportError> {
        let child = cancel.child_token();

        tokio::select! {
            result = tokio::time::timeout(self.timeout, self.inner.export(batch, &child)) => {
                match result {
                    Ok(result) => result,
                    Err(_elapsed) => {
                        child.cancel();
                        debug!("Export of {} records timed out after {:?}", batch.len(), self.timeout);
                        Err(ExportError::Timeout(self.timeout))
                    }
                }
            }
            () = cancel.cancelled() => Err(ExportError::Cancelled),
        }
    }

    async fn shutdown(&self) -> Result<(), ExportError> {
        self.inner.shutdown().await
    }

    async fn force_flush(&self) -> Result<(), ExportError> {
        self.inner.force_flush().await
    }
}

/// Splits oversized batches into consecutive chunks of at most `max_size`
/// records and exports them in order.
///
/// The first failing chunk ends the call with its error; chunks exported
/// before it are not rolled back and later chunks are not attempted.
#[derive(Debug)]
pub struct ChunkExporter<E> {
    inner: E,
    max_size: usize,
}

impl<E> ChunkExporter<E> {
    /// A `max_size` of zero is raised to one.
    #[must_use]
    pub fn new(inner: E, max_size: usize) -> Self {
        Self {
            inner,
            max_size: max_size.max(1),
        }
    }

    #[must_use]
    pub fn inner(&self) -> &E {
        &self.inner
    }
}

#[async_trait]
impl<E: Exporter> Exporter for ChunkExporter<E> {
    async fn export(
        &self,
        batch: &[LogRecord],
        cancel: &CancellationToken,
    ) -> Result<(), ExportError> {
        for chunk in batch.chunks(self.max_size) {
            if cancel.is_cancelled() {
                return Err(ExportError::Cancelled);
            }
            self.inner.export(chunk, cancel).await?;
        }
        Ok(())
    }

    async fn shutdown(&self) -> Result<(), ExportError> {
        self.inner.shutdown().await
    }

    async fn force_flush(&self) -> Result<(), ExportError> {
        self.inner.force_flush().await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::exporter::InMemoryExporter;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    fn records(count: usize) -> Vec<LogRecord> {
        (0..count)
            .map(|i| LogRecord::new().with_body(format!("record {i}")))
            .collect()
    }

    /// Exporter that never finishes unless cancelled.
    #[derive(Debug, Default)]
    struct HangingExporter {
        saw_cancel: Arc<AtomicBool>,
    }

    #[async_trait]
    impl Exporter for HangingExporter {
        async fn export(
            &self,
            _batch: &[LogRecord],
            cancel: &CancellationToken,
        ) -> Result<(), ExportError> {
            let saw_cancel = Arc::clone(&self.saw_cancel);
            let cancel = cancel.clone();
            // Observe the cancellation even after this future is dropped
            tokio::spawn(async move {
                cancel.cancelled().await;
                saw_cancel.store(true, Ordering::SeqCst);
            });
            std::future::pending::<()>().await;
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_chunk_exporter_splits_in_order() {
        let sink = InMemoryExporter::new();
        let exporter = ChunkExporter::new(sink.clone(), 4);

        exporter
            .export(&records(10), &CancellationToken::new())
            .await
            .unwrap();

        let batches = sink.batches();
        let sizes: Vec<_> = batches.iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![4, 4, 2]);

        let bodies: Vec<_> = sink.records().into_iter().map(|r| r.body).collect();
        let expected: Vec<_> = records(10).into_iter().map(|r| r.body).collect();
        assert_eq!(bodies, expected);
    }

    #[tokio::test]
    async fn test_chunk_exporter_small_batch_single_call() {
        let sink = InMemoryExporter::new();
        let exporter = ChunkExporter::new(sink.clone(), 100);

        exporter
            .export(&records(3), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(sink.export_calls(), 1);
    }

    #[tokio::test]
    async fn test_chunk_exporter_empty_batch_skips_export() {
        let sink = InMemoryExporter::new();
        let exporter = ChunkExporter::new(sink.clone(), 2);

        exporter
            .export(&[], &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(sink.export_calls(), 0);
    }

    #[tokio::test]
    async fn test_chunk_exporter_fails_fast() {
        let sink = InMemoryExporter::new();
        sink.fail_after(1, ExportError::Failed("collector unavailable".to_string()));
        let exporter = ChunkExporter::new(sink.clone(), 2);

        let result = exporter
            .export(&records(6), &CancellationToken::new())
            .await;

        assert!(matches!(result, Err(ExportError::Failed(_))));
        // First chunk stays exported, the failing one is counted, the third is never tried
        assert_eq!(sink.export_calls(), 2);
        assert_eq!(sink.records().len(), 2);
    }

    #[tokio::test]
    async fn test_timeout_exporter_passes_through_results() {
        let sink = InMemoryExporter::new();
        let exporter = TimeoutExporter::new(sink.clone(), Duration::from_secs(5));

        exporter
            .export(&records(2), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(sink.records().len(), 2);
    }

    #[tokio::test]
    async fn test_timeout_exporter_expires_and_cancels() {
        let inner = HangingExporter::default();
        let saw_cancel = Arc::clone(&inner.saw_cancel);
        let exporter = TimeoutExporter::new(inner, Duration::from_millis(20));

        let started = std::time::Instant::now();
        let result = exporter.export(&records(1), &CancellationToken::new()).await;

        assert!(matches!(result, Err(ExportError::Timeout(_))));
        assert!(started.elapsed() < Duration::from_secs(2));

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(saw_cancel.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_timeout_exporter_honors_parent_cancel() {
        let exporter = TimeoutExporter::new(HangingExporter::default(), Duration::from_secs(60));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = exporter.export(&records(1), &cancel).await;

        assert!(matches!(result, Err(ExportError::Cancelled)));
    }

    #[tokio::test]
    async fn test_composed_wrappers_share_one_deadline() {
        let sink = InMemoryExporter::new();
        let exporter = TimeoutExporter::new(ChunkExporter::new(sink.clone(), 3), Duration::from_secs(5));

        exporter
            .export(&records(7), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(sink.export_calls(), 3);
        assert_eq!(exporter.inner().inner().records().len(), 7);
    }

    #[tokio::test]
    async fn test_shutdown_and_flush_pass_through() {
        let sink = InMemoryExporter::new();
        let exporter = TimeoutExporter::new(ChunkExporter::new(sink.clone(), 3), Duration::from_secs(5));

        exporter.force_flush().await.unwrap();
        exporter.shutdown().await.unwrap();

        assert_eq!(sink.force_flush_calls(), 1);
        assert_eq!(sink.shutdown_calls(), 1);
    }
}
