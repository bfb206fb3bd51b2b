// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! # Datadog Logs SDK
//!
//! In-process pipeline batching structured log records and handing them to
//! pluggable exporters, with bounded memory and graceful flush and shutdown.
//!
//! ## Overview
//!
//! ```text
//! Logger::emit ──> BatchProcessor ──> ring queue ──> poll task ──> dispatch task ──> Exporter
//! ```
//!
//! - [`logger`]: `LoggerProvider` and `Logger`, the emitting surface
//! - [`appender`]: `tracing` layer forwarding events to a logger
//! - [`processor`]: the `Processor` trait and the `BatchProcessor`
//! - [`queue`]: bounded drop-oldest ring queue
//! - [`pool`]: reusable batch buffers
//! - [`exporter`]: the `Exporter` trait, timeout and chunking wrappers, stdout
//!   and in-memory exporters
//! - [`config`]: batch tunables resolved from options, `OTEL_BLRP_*`
//!   environment variables and defaults
//! - [`record`]: the log record data model
//! - [`error`]: export and processor errors

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

pub mod appender;
pub mod config;
pub mod error;
pub mod exporter;
pub mod logger;
pub mod pool;
pub mod processor;
pub mod queue;
pub mod record;
