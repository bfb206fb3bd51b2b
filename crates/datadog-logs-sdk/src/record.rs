// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Log record data model.
//!
//! A [`LogRecord`] is the unit flowing through the pipeline: it is emitted by a
//! [`Logger`](crate::logger::Logger), cloned into the batch processor's queue,
//! and finally handed to an [`Exporter`](crate::exporter::Exporter) as part of
//! a batch.
//!
//! # Ownership
//!
//! Cloning a record copies every mutable part of it (body, attributes, trace
//! context). The only data shared between a record and its clone is the
//! instrumentation scope name, which is an immutable `Arc<str>`. This lets the
//! processor keep its own copy while the caller is free to mutate or reuse the
//! original.
//!
//! # Serialization
//!
//! Records serialize with `serde`:
//! - timestamps as unix nanoseconds
//! - trace and span ids as lowercase hex strings
//! - bodies and attribute values as plain JSON values

use serde::{Serialize, Serializer};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Severity of a log record.
///
/// The numeric values follow the severity number ranges used by common log
/// data models, taking the first value of each range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Severity {
    #[default]
    Unspecified = 0,
    Trace = 1,
    Debug = 5,
    Info = 9,
    Warn = 13,
    Error = 17,
    Fatal = 21,
}

impl Severity {
    /// Short upper-case name, used as the default severity text.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Severity::Unspecified => "UNSPECIFIED",
            Severity::Trace => "TRACE",
            Severity::Debug => "DEBUG",
            Severity::Info => "INFO",
            Severity::Warn => "WARN",
            Severity::Error => "ERROR",
            Severity::Fatal => "FATAL",
        }
    }

    #[must_use]
    pub fn number(self) -> u8 {
        self as u8
    }
}

impl From<tracing::Level> for Severity {
    fn from(level: tracing::Level) -> Self {
        match level {
            tracing::Level::TRACE => Severity::Trace,
            tracing::Level::DEBUG => Severity::Debug,
            tracing::Level::INFO => Severity::Info,
            tracing::Level::WARN => Severity::Warn,
            // ERROR is the only level left
            _ => Severity::Error,
        }
    }
}

impl Serialize for Severity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.number())
    }
}

/// Value of a log body or attribute.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AnyValue {
    Bool(bool),
    Int(i64),
    Double(f64),
    String(String),
    Bytes(Vec<u8>),
    Array(Vec<AnyValue>),
    Map(Vec<(String, AnyValue)>),
}

impl From<&str> for AnyValue {
    fn from(value: &str) -> Self {
        AnyValue::String(value.to_string())
    }
}

impl From<String> for AnyValue {
    fn from(value: String) -> Self {
        AnyValue::String(value)
    }
}

impl From<bool> for AnyValue {
    fn from(value: bool) -> Self {
        AnyValue::Bool(value)
    }
}

impl From<i64> for AnyValue {
    fn from(value: i64) -> Self {
        AnyValue::Int(value)
    }
}

impl From<f64> for AnyValue {
    fn from(value: f64) -> Self {
        AnyValue::Double(value)
    }
}

/// Trace correlation attached to a log record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TraceContext {
    #[serde(serialize_with = "serialize_hex_id")]
    pub trace_id: [u8; 16],
    #[serde(serialize_with = "serialize_hex_id")]
    pub span_id: [u8; 8],
    pub trace_flags: u8,
}

/// One structured log entry.
///
/// # Example
///
/// ```rust
/// use datadog_logs_sdk::record::{LogRecord, Severity};
///
/// let record = LogRecord::new()
///     .with_severity(Severity::Warn)
///     .with_body("disk almost full")
///     .with_attribute("disk.free_bytes", 1024_i64);
///
/// assert_eq!(record.severity, Severity::Warn);
/// assert_eq!(record.attributes.len(), 1);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LogRecord {
    /// Time the event occurred, as reported by the caller.
    #[serde(serialize_with = "serialize_unix_nanos")]
    pub timestamp: Option<SystemTime>,
    /// Time the SDK observed the event. Filled in by the logger when absent.
    #[serde(serialize_with = "serialize_unix_nanos")]
    pub observed_timestamp: Option<SystemTime>,
    pub severity: Severity,
    pub severity_text: Option<String>,
    pub body: Option<AnyValue>,
    /// Attributes in insertion order. Duplicate keys are kept as given.
    pub attributes: Vec<(String, AnyValue)>,
    pub trace_context: Option<TraceContext>,
    /// Instrumentation scope that emitted the record.
    pub scope: Option<Arc<str>>,
}

impl LogRecord {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_timestamp(mut self, timestamp: SystemTime) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    #[must_use]
    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    #[must_use]
    pub fn with_severity_text(mut self, text: impl Into<String>) -> Self {
        self.severity_text = Some(text.into());
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: impl Into<AnyValue>) -> Self {
        self.body = Some(body.into());
        self
    }

    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<AnyValue>) -> Self {
        self.attributes.push((key.into(), value.into()));
        self
    }

    #[must_use]
    pub fn with_trace_context(mut self, trace_context: TraceContext) -> Self {
        self.trace_context = Some(trace_context);
        self
    }

    /// Returns the first attribute value stored under `key`.
    #[must_use]
    pub fn attribute(&self, key: &str) -> Option<&AnyValue> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }
}

fn serialize_unix_nanos<S: Serializer>(
    time: &Option<SystemTime>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match time {
        // Times before the epoch are clamped to zero
        Some(time) => {
            let nanos = time
                .duration_since(UNIX_EPOCH)
                .map(|d| u64::try_from(d.as_nanos()).unwrap_or(u64::MAX))
                .unwrap_or(0);
            serializer.serialize_u64(nanos)
        }
        None => serializer.serialize_none(),
    }
}

fn serialize_hex_id<S: Serializer, const N: usize>(
    id: &[u8; N],
    serializer: S,
) -> Result<S::Ok, S::Error> {
    use std::fmt::Write;

    let mut hex = String::with_capacity(N * 2);
    for byte in id {
        let _ = write!(hex, "{byte:02x}");
    }
    serializer.serialize_str(&hex)
}
