// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Export dispatch loop.
//!
//! Receives staged batches from the bounded dispatch channel, one at a time
//! and in arrival order, and performs the actual export call. The loop ends
//! once every sender is gone and the channel is drained.

use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::ExportError;
use crate::exporter::Exporter;
use crate::pool::BufferPool;
use crate::processor::ErrorHandler;
use crate::record::LogRecord;

/// One staged batch on its way to the exporter.
#[derive(Debug)]
pub(crate) struct ChunkJob {
    /// Pooled buffer, returned to the pool after the export call.
    pub(crate) records: Vec<LogRecord>,
    /// Present when a caller waits for the outcome.
    pub(crate) respond_to: Option<oneshot::Sender<Result<(), ExportError>>>,
}

impl ChunkJob {
    pub(crate) fn background(records: Vec<LogRecord>) -> Self {
        Self {
            records,
            respond_to: None,
        }
    }

    pub(crate) fn with_response(
        records: Vec<LogRecord>,
        respond_to: oneshot::Sender<Result<(), ExportError>>,
    ) -> Self {
        Self {
            records,
            respond_to: Some(respond_to),
        }
    }
}

pub(crate) struct DispatchLoop {
    pub(crate) rx: mpsc::Receiver<ChunkJob>,
    pub(crate) exporter: Arc<dyn Exporter>,
    pub(crate) pool: Arc<BufferPool<LogRecord>>,
    pub(crate) error_handler: Arc<dyn ErrorHandler>,
}

impl DispatchLoop {
    pub(crate) async fn run(mut self) {
        debug!("LOGS | Dispatch loop started");

        while let Some(job) = self.rx.recv().await {
            let ChunkJob {
                records,
                respond_to,
            } = job;

            let result = self
                .exporter
                .export(&records, &CancellationToken::new())
                .await;
            self.pool.put(records);

            match respond_to {
                // The waiter may have given up; the result is dropped then
                Some(respond_to) => {
                    let _ = respond_to.send(result);
                }
                None => {
                    if let Err(e) = result {
                        self.error_handler.handle(e.into());
                    }
                }
            }
        }

        debug!("LOGS | Dispatch loop stopped");
    }
}
