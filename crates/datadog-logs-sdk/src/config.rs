// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Batch processor configuration.
//!
//! Every tunable resolves from three sources, in order:
//! 1. **Explicit option** set on the builder
//! 2. **Environment variable**
//! 3. **Compiled default**
//!
//! Zero and unparsable values are treated as unset and fall through to the
//! next source. Intervals and timeouts are capped at [`MAX_WAIT`], so
//! `Duration::MAX` can be used to mean "wait indefinitely".
//!
//! # Environment Variables
//!
//! | Variable | Meaning | Unit |
//! |----------|---------|------|
//! | `OTEL_BLRP_MAX_QUEUE_SIZE` | Records buffered before drop-oldest kicks in | records |
//! | `OTEL_BLRP_SCHEDULE_DELAY` | Poll loop interval | milliseconds |
//! | `OTEL_BLRP_EXPORT_TIMEOUT` | Deadline of a single export call | milliseconds |
//! | `OTEL_BLRP_MAX_EXPORT_BATCH_SIZE` | Records per export call | records |

use std::env;
use std::time::Duration;
use tokio::time::Instant;

pub const ENV_MAX_QUEUE_SIZE: &str = "OTEL_BLRP_MAX_QUEUE_SIZE";
pub const ENV_SCHEDULE_DELAY: &str = "OTEL_BLRP_SCHEDULE_DELAY";
pub const ENV_EXPORT_TIMEOUT: &str = "OTEL_BLRP_EXPORT_TIMEOUT";
pub const ENV_MAX_EXPORT_BATCH_SIZE: &str = "OTEL_BLRP_MAX_EXPORT_BATCH_SIZE";

pub const DEFAULT_MAX_QUEUE_SIZE: usize = 2048;
pub const DEFAULT_EXPORT_INTERVAL: Duration = Duration::from_secs(1);
pub const DEFAULT_EXPORT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_MAX_EXPORT_BATCH_SIZE: usize = 512;
/// Number of staged batches that may wait for the dispatch loop.
pub const DEFAULT_EXPORT_BUFFER_SIZE: usize = 1;

/// Longest interval or timeout honoured, about 30 years.
pub const MAX_WAIT: Duration = Duration::from_secs(86_400 * 365 * 30);

/// Instant `timeout` from now, with `timeout` capped at [`MAX_WAIT`].
pub(crate) fn deadline_after(timeout: Duration) -> Instant {
    Instant::now() + timeout.min(MAX_WAIT)
}

/// Resolved configuration of a [`BatchProcessor`](crate::processor::BatchProcessor).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchConfig {
    /// Maximum number of records held in the ring queue.
    pub max_queue_size: usize,
    /// Period of the poll loop ticker.
    pub export_interval: Duration,
    /// Deadline applied to every export call.
    pub export_timeout: Duration,
    /// Maximum records handed to the exporter in one call. Never larger than
    /// `max_queue_size`.
    pub max_export_batch_size: usize,
    /// Depth of the dispatch channel between the poll and dispatch loops.
    pub export_buffer_size: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_queue_size: DEFAULT_MAX_QUEUE_SIZE,
            export_interval: DEFAULT_EXPORT_INTERVAL,
            export_timeout: DEFAULT_EXPORT_TIMEOUT,
            max_export_batch_size: DEFAULT_MAX_EXPORT_BATCH_SIZE,
            export_buffer_size: DEFAULT_EXPORT_BUFFER_SIZE,
        }
    }
}

/// Explicit overrides collected by the processor builder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchOptions {
    pub max_queue_size: Option<usize>,
    pub export_interval: Option<Duration>,
    pub export_timeout: Option<Duration>,
    pub max_export_batch_size: Option<usize>,
    pub export_buffer_size: Option<usize>,
}

impl BatchConfig {
    /// Resolves configuration from environment variables and defaults only.
    #[must_use]
    pub fn from_env() -> Self {
        Self::resolve(&BatchOptions::default())
    }

    /// Resolves `options` against the process environment and defaults.
    #[must_use]
    pub fn resolve(options: &BatchOptions) -> Self {
        Self::resolve_with(options, |key| env::var(key).ok())
    }

    /// Resolves `options` using `lookup` in place of the process environment.
    pub fn resolve_with<F>(options: &BatchOptions, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let max_queue_size = options
            .max_queue_size
            .filter(|size| *size > 0)
            .or_else(|| env_usize(&lookup, ENV_MAX_QUEUE_SIZE))
            .unwrap_or(DEFAULT_MAX_QUEUE_SIZE);

        let export_interval = options
            .export_interval
            .filter(|interval| !interval.is_zero())
            .or_else(|| env_millis(&lookup, ENV_SCHEDULE_DELAY))
            .unwrap_or(DEFAULT_EXPORT_INTERVAL)
            .min(MAX_WAIT);

        let export_timeout = options
            .export_timeout
            .filter(|timeout| !timeout.is_zero())
            .or_else(|| env_millis(&lookup, ENV_EXPORT_TIMEOUT))
            .unwrap_or(DEFAULT_EXPORT_TIMEOUT)
            .min(MAX_WAIT);

        let max_export_batch_size = options
            .max_export_batch_size
            .filter(|size| *size > 0)
            .or_else(|| env_usize(&lookup, ENV_MAX_EXPORT_BATCH_SIZE))
            .unwrap_or(DEFAULT_MAX_EXPORT_BATCH_SIZE)
            // A batch can never hold more than the queue
            .min(max_queue_size);

        let export_buffer_size = options
            .export_buffer_size
            .filter(|size| *size > 0)
            .unwrap_or(DEFAULT_EXPORT_BUFFER_SIZE);

        Self {
            max_queue_size,
            export_interval,
            export_timeout,
            max_export_batch_size,
            export_buffer_size,
        }
    }
}

fn env_usize<F>(lookup: &F, key: &str) -> Option<usize>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .and_then(|value| value.trim().parse::<usize>().ok())
        .filter(|value| *value > 0)
}

fn env_millis<F>(lookup: &F, key: &str) -> Option<Duration>
where
    F: Fn(&str) -> Option<String>,
{
    env_usize(lookup, key).map(|millis| Duration::from_millis(millis as u64))
}
