// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Bridge from `tracing` events to log records.
//!
//! [`LogBridgeLayer`] is a `tracing_subscriber` layer emitting every event it
//! sees through a [`Logger`]:
//!
//! - the event level becomes the severity
//! - the `message` field becomes the body
//! - every other field becomes an attribute, plus `target`
//!
//! Events emitted by this crate are skipped, otherwise the batch processor's
//! own diagnostics would loop back into its queue.

use std::fmt;
use std::time::SystemTime;
use tracing_core::field::{Field, Visit};
use tracing_core::{Event, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::Layer;

use crate::logger::{Logger, LoggerProvider};
use crate::record::{AnyValue, LogRecord, Severity};

const MESSAGE_FIELD: &str = "message";
const TARGET_ATTRIBUTE: &str = "target";
const SELF_TARGET: &str = "datadog_logs_sdk";

#[derive(Debug, Clone)]
pub struct LogBridgeLayer {
    logger: Logger,
}

impl LogBridgeLayer {
    /// Emits through a logger named `scope` taken from `provider`.
    #[must_use]
    pub fn new(provider: &LoggerProvider, scope: &str) -> Self {
        Self {
            logger: provider.logger(scope),
        }
    }
}

impl<S> Layer<S> for LogBridgeLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        if metadata.target().starts_with(SELF_TARGET) {
            return;
        }

        let severity = Severity::from(*metadata.level());
        let mut record = LogRecord::new()
            .with_timestamp(SystemTime::now())
            .with_severity(severity)
            .with_severity_text(severity.name());

        let mut visitor = RecordVisitor {
            record: &mut record,
        };
        event.record(&mut visitor);

        record
            .attributes
            .push((TARGET_ATTRIBUTE.to_string(), metadata.target().into()));

        if self.logger.enabled(&record) {
            self.logger.emit(record);
        }
    }
}

struct RecordVisitor<'r> {
    record: &'r mut LogRecord,
}

impl RecordVisitor<'_> {
    fn push(&mut self, field: &Field, value: AnyValue) {
        if field.name() == MESSAGE_FIELD {
            self.record.body = Some(value);
        } else {
            self.record.attributes.push((field.name().to_string(), value));
        }
    }
}

impl Visit for RecordVisitor<'_> {
    fn record_f64(&mut self, field: &Field, value: f64) {
        self.push(field, AnyValue::Double(value));
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.push(field, AnyValue::Int(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        match i64::try_from(value) {
            Ok(value) => self.push(field, AnyValue::Int(value)),
            Err(_) => self.push(field, AnyValue::String(value.to_string())),
        }
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.push(field, AnyValue::Bool(value));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.push(field, AnyValue::String(value.to_string()));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.push(field, AnyValue::String(format!("{value:?}")));
    }
}
