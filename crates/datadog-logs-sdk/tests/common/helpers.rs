// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Helper functions for integration tests

#![allow(dead_code)]

use datadog_logs_sdk::exporter::Exporter;
use datadog_logs_sdk::processor::{BatchProcessor, BatchProcessorBuilder};
use datadog_logs_sdk::record::{AnyValue, LogRecord};
use std::time::Duration;
use tokio::time::{sleep, Instant};

/// Interval long enough that only triggers and explicit flushes export.
pub const NEVER: Duration = Duration::from_secs(3600);

/// Builder with every tunable set, so tests never depend on `OTEL_BLRP_*`.
pub fn builder<E: Exporter + 'static>(
    exporter: E,
    queue_size: usize,
    batch_size: usize,
) -> BatchProcessorBuilder {
    BatchProcessor::builder(exporter)
        .with_max_queue_size(queue_size)
        .with_max_export_batch_size(batch_size)
        .with_export_interval(NEVER)
        .with_export_timeout(Duration::from_secs(30))
        .with_export_buffer_size(1)
}

/// Records with bodies `record 0`, `record 1`, ...
pub fn numbered_records(range: std::ops::Range<usize>) -> Vec<LogRecord> {
    range
        .map(|i| LogRecord::new().with_body(format!("record {i}")))
        .collect()
}

pub fn bodies(records: &[LogRecord]) -> Vec<String> {
    records
        .iter()
        .map(|record| match &record.body {
            Some(AnyValue::String(body)) => body.clone(),
            other => panic!("unexpected body: {other:?}"),
        })
        .collect()
}

pub fn expected_bodies(range: std::ops::Range<usize>) -> Vec<String> {
    range.map(|i| format!("record {i}")).collect()
}

/// Polls `condition` until it holds, failing the test after `limit`.
pub async fn wait_until<F: Fn() -> bool>(condition: F, limit: Duration) {
    let deadline = Instant::now() + limit;
    while !condition() {
        assert!(
            Instant::now() < deadline,
            "condition not met within {limit:?}"
        );
        sleep(Duration::from_millis(5)).await;
    }
}
