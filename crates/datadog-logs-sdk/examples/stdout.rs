// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Emits a few records through a batch processor writing JSON lines to stdout.
//!
//! SDK diagnostics go to stderr; set `DD_LOG_LEVEL=debug` to see them.
//!
//! ```text
//! cargo run -p datadog-logs-sdk --example stdout
//! ```

use std::env;
use std::time::Duration;
use tracing::{debug, info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use datadog_logs_sdk::appender::LogBridgeLayer;
use datadog_logs_sdk::exporter::StdoutExporter;
use datadog_logs_sdk::logger::LoggerProvider;
use datadog_logs_sdk::processor::BatchProcessor;
use datadog_logs_sdk::record::{LogRecord, Severity};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let log_level = env::var("DD_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

    let processor = BatchProcessor::builder(StdoutExporter::new())
        .with_max_export_batch_size(4)
        .with_export_interval(Duration::from_millis(200))
        .build()?;
    let provider = LoggerProvider::builder().with_processor(processor).build();

    tracing_subscriber::registry()
        .with(EnvFilter::try_new(log_level)?)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .without_time(),
        )
        .with(LogBridgeLayer::new(&provider, "stdout-demo"))
        .try_init()?;

    debug!("Logging subsystem enabled");

    let logger = provider.logger("stdout-demo");
    for i in 0..6 {
        logger.emit(
            LogRecord::new()
                .with_severity(Severity::Info)
                .with_body(format!("direct record {i}"))
                .with_attribute("iteration", i64::from(i)),
        );
    }

    info!(user = "demo", "bridged from tracing");
    warn!(retries = 3_i64, "upstream slow");

    provider.shutdown(Duration::from_secs(5)).await?;
    Ok(())
}
