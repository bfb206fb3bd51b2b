// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Error types for exporters and processors.
//!
//! Every error here is `Clone`: the result of a processor shutdown is computed
//! once and handed to every caller that was waiting on it.

use std::sync::Arc;
use std::time::Duration;

/// Errors returned by an [`Exporter`](crate::exporter::Exporter).
#[derive(Debug, Clone, thiserror::Error)]
pub enum ExportError {
    #[error("export timed out after {0:?}")]
    Timeout(Duration),

    #[error("export was cancelled")]
    Cancelled,

    #[error("exporter is already shut down")]
    AlreadyShutdown,

    #[error("I/O error: {0}")]
    Io(Arc<std::io::Error>),

    #[error("failed to serialize log record: {0}")]
    Serialize(Arc<serde_json::Error>),

    #[error("export failed: {0}")]
    Failed(String),
}

impl From<std::io::Error> for ExportError {
    fn from(err: std::io::Error) -> Self {
        ExportError::Io(Arc::new(err))
    }
}

impl From<serde_json::Error> for ExportError {
    fn from(err: serde_json::Error) -> Self {
        ExportError::Serialize(Arc::new(err))
    }
}

/// Errors returned by processors and the logger provider.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ProcessorError {
    #[error(transparent)]
    Export(#[from] ExportError),

    #[error("deadline exceeded")]
    DeadlineExceeded,

    /// Draining the queue stopped early; some records may still be queued.
    #[error("partial flush: {0}")]
    PartialFlush(Box<ProcessorError>),

    #[error("processor is shut down")]
    Stopped,

    #[error("background task failed: {0}")]
    Task(String),

    #[error("no tokio runtime available: {0}")]
    NoRuntime(String),

    #[error("{}", display_joined(.0))]
    Multiple(Vec<ProcessorError>),
}

impl ProcessorError {
    /// Wraps `self` as a partial flush, unless it already is one.
    #[must_use]
    pub fn into_partial_flush(self) -> Self {
        match self {
            ProcessorError::PartialFlush(_) => self,
            other => ProcessorError::PartialFlush(Box::new(other)),
        }
    }

    /// Returns true if this error, or any error joined into it, is a deadline
    /// expiry.
    #[must_use]
    pub fn is_deadline_exceeded(&self) -> bool {
        match self {
            ProcessorError::DeadlineExceeded => true,
            ProcessorError::PartialFlush(inner) => inner.is_deadline_exceeded(),
            ProcessorError::Multiple(errors) => errors.iter().any(Self::is_deadline_exceeded),
            _ => false,
        }
    }

    /// Returns true if this error, or any error joined into it, reports that
    /// records may remain queued.
    #[must_use]
    pub fn is_partial_flush(&self) -> bool {
        match self {
            ProcessorError::PartialFlush(_) => true,
            ProcessorError::Multiple(errors) => errors.iter().any(Self::is_partial_flush),
            _ => false,
        }
    }

    /// Flattened view of the individual errors.
    #[must_use]
    pub fn errors(&self) -> Vec<&ProcessorError> {
        match self {
            ProcessorError::Multiple(errors) => errors.iter().flat_map(Self::errors).collect(),
            other => vec![other],
        }
    }
}

/// Combines errors the way a caller expects from one operation: no errors is
/// success, one error is returned as is, more are wrapped in
/// [`ProcessorError::Multiple`]. Nested `Multiple` values are flattened.
pub fn join(errors: Vec<ProcessorError>) -> Result<(), ProcessorError> {
    let mut flat = Vec::with_capacity(errors.len());
    for error in errors {
        match error {
            ProcessorError::Multiple(inner) => flat.extend(inner),
            other => flat.push(other),
        }
    }

    match flat.len() {
        0 => Ok(()),
        1 => Err(flat.remove(0)),
        _ => Err(ProcessorError::Multiple(flat)),
    }
}

fn display_joined(errors: &[ProcessorError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
