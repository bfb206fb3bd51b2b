// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Batching processor.
//!
//! Records handed to [`BatchProcessor::on_emit`] are cloned into a bounded
//! ring queue that drops the oldest entries on overflow. A poll task forms
//! batches whenever the queue holds a full batch or the export interval
//! elapses, and a dispatch task exports them one at a time through a
//! deadline-bounded, size-chunking wrapper around the configured exporter.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use datadog_logs_sdk::exporter::StdoutExporter;
//! use datadog_logs_sdk::processor::{BatchProcessor, Processor};
//! use datadog_logs_sdk::record::LogRecord;
//!
//! # async fn run() -> Result<(), datadog_logs_sdk::error::ProcessorError> {
//! let processor = BatchProcessor::builder(StdoutExporter::new())
//!     .with_max_export_batch_size(256)
//!     .with_export_interval(Duration::from_millis(500))
//!     .build()?;
//!
//! processor.on_emit(&LogRecord::new().with_body("hello"));
//! processor.shutdown(Duration::from_secs(5)).await?;
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot, OnceCell};
use tokio::task::JoinHandle;
use tokio::time::{timeout_at, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::{deadline_after, BatchConfig, BatchOptions};
use crate::error::{self, ProcessorError};
use crate::exporter::{ChunkExporter, Exporter, TimeoutExporter};
use crate::pool::BufferPool;
use crate::processor::dispatch::{ChunkJob, DispatchLoop};
use crate::processor::poll::PollLoop;
use crate::processor::{ErrorHandler, Processor, TracingErrorHandler};
use crate::queue::RingQueue;
use crate::record::LogRecord;

/// Builder for [`BatchProcessor`].
///
/// Every tunable left unset, or set to zero, is read from its `OTEL_BLRP_*`
/// environment variable and otherwise defaults (see [`crate::config`]).
pub struct BatchProcessorBuilder {
    exporter: Box<dyn Exporter>,
    options: BatchOptions,
    error_handler: Arc<dyn ErrorHandler>,
}

impl BatchProcessorBuilder {
    #[must_use]
    pub fn with_max_queue_size(mut self, size: usize) -> Self {
        self.options.max_queue_size = Some(size);
        self
    }

    #[must_use]
    pub fn with_export_interval(mut self, interval: Duration) -> Self {
        self.options.export_interval = Some(interval);
        self
    }

    #[must_use]
    pub fn with_export_timeout(mut self, timeout: Duration) -> Self {
        self.options.export_timeout = Some(timeout);
        self
    }

    /// Records per export call. Capped at the queue size.
    #[must_use]
    pub fn with_max_export_batch_size(mut self, size: usize) -> Self {
        self.options.max_export_batch_size = Some(size);
        self
    }

    /// Number of staged batches allowed to wait for the dispatch task.
    #[must_use]
    pub fn with_export_buffer_size(mut self, size: usize) -> Self {
        self.options.export_buffer_size = Some(size);
        self
    }

    /// Receives export errors from background batches. Defaults to
    /// [`TracingErrorHandler`].
    #[must_use]
    pub fn with_error_handler<H>(mut self, handler: H) -> Self
    where
        H: ErrorHandler + 'static,
    {
        self.error_handler = Arc::new(handler);
        self
    }

    /// Starts the background tasks on the current tokio runtime.
    pub fn build(self) -> Result<BatchProcessor, ProcessorError> {
        let handle =
            Handle::try_current().map_err(|e| ProcessorError::NoRuntime(e.to_string()))?;
        let config = BatchConfig::resolve(&self.options);
        Ok(BatchProcessor::start(
            &handle,
            config,
            self.exporter,
            self.error_handler,
        ))
    }
}

impl std::fmt::Debug for BatchProcessorBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchProcessorBuilder")
            .field("exporter", &self.exporter)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

/// [`Processor`] exporting records in batches from background tasks.
///
/// `on_emit` never blocks and never fails: when the queue is full the oldest
/// record is dropped and counted, and the poll task logs the count. Export
/// errors from background batches go to the configured [`ErrorHandler`];
/// errors from batches exported on behalf of
/// [`force_flush`](Processor::force_flush) or [`shutdown`](Processor::shutdown)
/// are returned to that caller.
///
/// Dropping the processor without calling `shutdown` stops the background
/// tasks and discards whatever is still queued.
#[derive(Debug)]
pub struct BatchProcessor {
    config: BatchConfig,
    queue: Arc<RingQueue<LogRecord>>,
    pool: Arc<BufferPool<LogRecord>>,
    exporter: Arc<dyn Exporter>,
    trigger: mpsc::Sender<()>,
    /// Taken during shutdown so the dispatch channel can close.
    dispatch: Mutex<Option<mpsc::Sender<ChunkJob>>>,
    poll_stop: CancellationToken,
    poll_task: Mutex<Option<JoinHandle<()>>>,
    dispatch_task: Mutex<Option<JoinHandle<()>>>,
    stopped: AtomicBool,
    shutdown_result: OnceCell<Result<(), ProcessorError>>,
}

impl BatchProcessor {
    #[must_use]
    pub fn builder<E>(exporter: E) -> BatchProcessorBuilder
    where
        E: Exporter + 'static,
    {
        BatchProcessorBuilder {
            exporter: Box::new(exporter),
            options: BatchOptions::default(),
            error_handler: Arc::new(TracingErrorHandler),
        }
    }

    fn start(
        handle: &Handle,
        config: BatchConfig,
        exporter: Box<dyn Exporter>,
        error_handler: Arc<dyn ErrorHandler>,
    ) -> Self {
        let queue = Arc::new(RingQueue::new(config.max_queue_size));
        let pool = Arc::new(BufferPool::new(config.max_export_batch_size));
        let exporter: Arc<dyn Exporter> = Arc::new(TimeoutExporter::new(
            ChunkExporter::new(exporter, config.max_export_batch_size),
            config.export_timeout,
        ));

        let (trigger_tx, trigger_rx) = mpsc::channel(1);
        let (dispatch_tx, dispatch_rx) = mpsc::channel(config.export_buffer_size.max(1));
        let poll_stop = CancellationToken::new();

        let dispatch_loop = DispatchLoop {
            rx: dispatch_rx,
            exporter: Arc::clone(&exporter),
            pool: Arc::clone(&pool),
            error_handler,
        };
        let poll_loop = PollLoop {
            queue: Arc::clone(&queue),
            pool: Arc::clone(&pool),
            dispatch: dispatch_tx.clone(),
            trigger_tx: trigger_tx.clone(),
            trigger_rx,
            interval: config.export_interval,
            batch_size: config.max_export_batch_size,
            stop: poll_stop.clone(),
        };

        let dispatch_task = handle.spawn(dispatch_loop.run());
        let poll_task = handle.spawn(poll_loop.run());

        debug!("LOGS | Batch processor started: {:?}", config);

        Self {
            config,
            queue,
            pool,
            exporter,
            trigger: trigger_tx,
            dispatch: Mutex::new(Some(dispatch_tx)),
            poll_stop,
            poll_task: Mutex::new(Some(poll_task)),
            dispatch_task: Mutex::new(Some(dispatch_task)),
            stopped: AtomicBool::new(false),
            shutdown_result: OnceCell::new(),
        }
    }

    /// Resolved configuration.
    #[must_use]
    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    /// Number of records currently queued.
    #[must_use]
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    fn dispatch_sender(&self) -> Option<mpsc::Sender<ChunkJob>> {
        lock(&self.dispatch).clone()
    }

    /// Exports queued batches until the queue is empty.
    async fn drain_queue(&self, deadline: Instant) -> Result<(), ProcessorError> {
        // Shutdown already owns the channel
        let Some(sender) = self.dispatch_sender() else {
            return Ok(());
        };

        loop {
            match timeout_at(deadline, self.export_next_batch(&sender)).await {
                Ok(Ok(0)) => return Ok(()),
                Ok(Ok(_remaining)) => {}
                Ok(Err(e)) => return Err(e),
                Err(_) => return Err(ProcessorError::DeadlineExceeded),
            }
        }
    }

    /// Stages one batch with a response channel and waits for its export.
    ///
    /// With nothing queued an empty job is sent instead, so the call still
    /// returns only after every batch staged before it was exported. Returns
    /// the number of records left in the queue.
    async fn export_next_batch(
        &self,
        sender: &mpsc::Sender<ChunkJob>,
    ) -> Result<usize, ProcessorError> {
        let mut permit = Some(sender.reserve().await.map_err(|_| ProcessorError::Stopped)?);
        let (tx, rx) = oneshot::channel();
        let mut tx = Some(tx);

        let mut buf = self.pool.get();
        let remaining = self
            .queue
            .try_dequeue(&mut buf, self.config.max_export_batch_size, |records| {
                match (permit.take(), tx.take()) {
                    (Some(permit), Some(tx)) => {
                        permit.send(ChunkJob::with_response(std::mem::take(records), tx));
                        true
                    }
                    _ => false,
                }
            });

        if let (Some(permit), Some(tx)) = (permit, tx) {
            permit.send(ChunkJob::with_response(buf, tx));
        }

        rx.await.map_err(|_| {
            ProcessorError::Task("dispatch task dropped a flush response".to_string())
        })??;
        Ok(remaining)
    }

    async fn stop_and_drain(&self, deadline: Instant) -> Result<(), ProcessorError> {
        self.stopped.store(true, Ordering::Release);
        self.poll_stop.cancel();
        debug!("LOGS | Batch processor shutting down");

        let mut errors = Vec::new();

        let poll_task = lock(&self.poll_task).take();
        if let Some(task) = poll_task {
            match timeout_at(deadline, task).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => errors.push(ProcessorError::Task(e.to_string())),
                Err(_) => {
                    warn!("LOGS | Poll task did not stop before the shutdown deadline");
                    lock(&self.dispatch).take();
                    errors.push(ProcessorError::DeadlineExceeded);
                    errors.extend(self.shutdown_exporter(deadline).await);
                    return error::join(errors);
                }
            }
        }

        // The poll task is gone, so this is the only sender left
        let sender = lock(&self.dispatch).take();
        let remaining = self.queue.flush();
        let mut timed_out = false;

        if let Some(sender) = sender {
            if !remaining.is_empty() {
                debug!("LOGS | Exporting {} queued records before shutdown", remaining.len());
                let (tx, rx) = oneshot::channel();
                let final_export = async {
                    sender
                        .send(ChunkJob::with_response(remaining, tx))
                        .await
                        .map_err(|_| ProcessorError::Stopped)?;
                    rx.await.map_err(|_| {
                        ProcessorError::Task("dispatch task dropped a flush response".to_string())
                    })??;
                    Ok::<(), ProcessorError>(())
                };

                match timeout_at(deadline, final_export).await {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => errors.push(e.into_partial_flush()),
                    Err(_) => {
                        timed_out = true;
                        errors.push(ProcessorError::DeadlineExceeded.into_partial_flush());
                    }
                }
            }
        }

        let dispatch_task = lock(&self.dispatch_task).take();
        if let Some(task) = dispatch_task {
            if !timed_out {
                match timeout_at(deadline, task).await {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => errors.push(ProcessorError::Task(e.to_string())),
                    Err(_) => errors.push(ProcessorError::DeadlineExceeded),
                }
            }
        }

        errors.extend(self.shutdown_exporter(deadline).await);
        debug!("LOGS | Batch processor shut down");
        error::join(errors)
    }

    /// The exporter is always asked to shut down, even past the deadline, but
    /// is only waited on until then.
    async fn shutdown_exporter(&self, deadline: Instant) -> Option<ProcessorError> {
        match timeout_at(deadline, self.exporter.shutdown()).await {
            Ok(result) => result.err().map(ProcessorError::from),
            Err(_) => {
                warn!("LOGS | Exporter did not shut down before the deadline");
                Some(ProcessorError::DeadlineExceeded)
            }
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[async_trait]
impl Processor for BatchProcessor {
    fn on_emit(&self, record: &LogRecord) {
        if self.stopped.load(Ordering::Acquire) {
            return;
        }

        let len = self.queue.enqueue(record.clone());
        if len >= self.config.max_export_batch_size {
            // A pending trigger is enough
            let _ = self.trigger.try_send(());
        }
    }

    async fn force_flush(&self, timeout: Duration) -> Result<(), ProcessorError> {
        if self.stopped.load(Ordering::Acquire) {
            return Ok(());
        }

        let deadline = deadline_after(timeout);
        let mut errors = Vec::new();

        if let Err(e) = self.drain_queue(deadline).await {
            errors.push(e.into_partial_flush());
        }
        match timeout_at(deadline, self.exporter.force_flush()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => errors.push(e.into()),
            Err(_) => errors.push(ProcessorError::DeadlineExceeded),
        }

        error::join(errors)
    }

    async fn shutdown(&self, timeout: Duration) -> Result<(), ProcessorError> {
        if self.shutdown_result.initialized() {
            return Ok(());
        }

        let deadline = deadline_after(timeout);
        self.shutdown_result
            .get_or_init(|| self.stop_and_drain(deadline))
            .await
            .clone()
    }
}

impl Drop for BatchProcessor {
    fn drop(&mut self) {
        self.poll_stop.cancel();
    }
}
