// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Exporter capability and bundled exporters.
//!
//! An [`Exporter`] is the sink at the end of the pipeline. The batch processor
//! never calls a user exporter directly: it wraps it as
//! `TimeoutExporter<ChunkExporter<E>>` so that every call is bounded by the
//! export timeout and never carries more than one batch worth of records.
//!
//! ```text
//!   dispatch loop
//!        │  export(&[LogRecord])
//!        v
//!   ┌──────────────────┐
//!   │ TimeoutExporter  │  one deadline per call, cancels on expiry
//!   └────────┬─────────┘
//!            v
//!   ┌──────────────────┐
//!   │  ChunkExporter   │  splits into <= max batch size, fail-fast
//!   └────────┬─────────┘
//!            v
//!   ┌──────────────────┐
//!   │  user Exporter   │  stdout, in-memory, network client, ...
//!   └──────────────────┘
//! ```
//!
//! # Built-in Exporters
//!
//! - [`StdoutExporter`] - writes records as JSON lines
//! - [`InMemoryExporter`] - keeps exported batches in memory

pub mod chunk;
mod in_memory;
mod stdout;

use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub use chunk::{ChunkExporter, TimeoutExporter};
pub use in_memory::InMemoryExporter;
pub use stdout::StdoutExporter;

use crate::error::ExportError;
use crate::record::LogRecord;

/// Sink for batches of log records.
///
/// Implementations must:
/// - stop working on a call once `cancel` is cancelled (the caller has given
///   up on it and will report a timeout),
/// - not keep a reference to `batch` past the call,
/// - make `shutdown` idempotent.
///
/// # Example
///
/// ```rust
/// use async_trait::async_trait;
/// use datadog_logs_sdk::error::ExportError;
/// use datadog_logs_sdk::exporter::Exporter;
/// use datadog_logs_sdk::record::LogRecord;
/// use tokio_util::sync::CancellationToken;
///
/// #[derive(Debug)]
/// struct CountingExporter;
///
/// #[async_trait]
/// impl Exporter for CountingExporter {
///     async fn export(
///         &self,
///         batch: &[LogRecord],
///         _cancel: &CancellationToken,
///     ) -> Result<(), ExportError> {
///         println!("exporting {} records", batch.len());
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Exporter: Send + Sync + std::fmt::Debug {
    /// Exports one batch. The slice must be treated as read-only.
    async fn export(
        &self,
        batch: &[LogRecord],
        cancel: &CancellationToken,
    ) -> Result<(), ExportError>;

    /// Releases resources. Further exports should fail with
    /// [`ExportError::AlreadyShutdown`].
    async fn shutdown(&self) -> Result<(), ExportError> {
        Ok(())
    }

    /// Pushes out anything the exporter buffers internally.
    async fn force_flush(&self) -> Result<(), ExportError> {
        Ok(())
    }
}

#[async_trait]
impl<E: Exporter + ?Sized> Exporter for Arc<E> {
    async fn export(
        &self,
        batch: &[LogRecord],
        cancel: &CancellationToken,
    ) -> Result<(), ExportError> {
        (**self).export(batch, cancel).await
    }

    async fn shutdown(&self) -> Result<(), ExportError> {
        (**self).shutdown().await
    }

    async fn force_flush(&self) -> Result<(), ExportError> {
        (**self).force_flush().await
    }
}

#[async_trait]
impl<E: Exporter + ?Sized> Exporter for Box<E> {
    async fn export(
        &self,
        batch: &[LogRecord],
        cancel: &CancellationToken,
    ) -> Result<(), ExportError> {
        (**self).export(batch, cancel).await
    }

    async fn shutdown(&self) -> Result<(), ExportError> {
        (**self).shutdown().await
    }

    async fn force_flush(&self) -> Result<(), ExportError> {
        (**self).force_flush().await
    }
}
