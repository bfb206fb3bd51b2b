// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Batch forming loop.
//!
//! Wakes on the export interval or on an explicit trigger, stages at most one
//! batch from the ring queue onto the dispatch channel and goes back to sleep.
//! It never waits on the dispatch channel: when the channel is full the queue
//! is left untouched and the next wake-up retries.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::deadline_after;
use crate::pool::BufferPool;
use crate::processor::dispatch::ChunkJob;
use crate::queue::RingQueue;
use crate::record::LogRecord;

/// Outcome of one staging attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Staged {
    /// A batch was handed to the dispatch loop, `remaining` records are still
    /// queued.
    Sent { remaining: usize },
    /// Nothing was queued.
    Empty,
    /// The dispatch channel is full; the queue is unchanged.
    Backlogged,
    /// The dispatch loop is gone; the queue is unchanged.
    Closed,
}

pub(crate) struct PollLoop {
    pub(crate) queue: Arc<RingQueue<LogRecord>>,
    pub(crate) pool: Arc<BufferPool<LogRecord>>,
    pub(crate) dispatch: mpsc::Sender<ChunkJob>,
    /// Kept to re-arm the loop while a backlog remains.
    pub(crate) trigger_tx: mpsc::Sender<()>,
    pub(crate) trigger_rx: mpsc::Receiver<()>,
    pub(crate) interval: Duration,
    pub(crate) batch_size: usize,
    pub(crate) stop: CancellationToken,
}

impl PollLoop {
    pub(crate) async fn run(mut self) {
        debug!("LOGS | Poll loop started, interval {:?}", self.interval);

        let mut ticker = tokio::time::interval_at(deadline_after(self.interval), self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                () = self.stop.cancelled() => break,
                _ = ticker.tick() => {}
                Some(()) = self.trigger_rx.recv() => {}
            }

            report_dropped(&self.queue);

            match self.stage_batch() {
                Staged::Sent { remaining } if remaining >= self.batch_size => {
                    // Full slot means a wake-up is already pending
                    let _ = self.trigger_tx.try_send(());
                }
                Staged::Backlogged => {
                    debug!("LOGS | Dispatch channel full, retrying on next tick");
                }
                Staged::Closed => {
                    debug!("LOGS | Dispatch channel closed");
                    break;
                }
                Staged::Sent { .. } | Staged::Empty => {}
            }
        }

        debug!("LOGS | Poll loop stopped");
    }

    /// Moves up to one batch from the queue to the dispatch channel.
    ///
    /// The send happens while the queue lock is held, so records only leave
    /// the queue once the dispatch loop is guaranteed to receive them, and
    /// batches reach the channel in queue order.
    pub(crate) fn stage_batch(&self) -> Staged {
        let mut buf = self.pool.get();
        let mut outcome = Staged::Empty;

        let remaining = self
            .queue
            .try_dequeue(&mut buf, self.batch_size, |records| {
                let job = ChunkJob::background(std::mem::take(records));
                match self.dispatch.try_send(job) {
                    Ok(()) => {
                        outcome = Staged::Sent { remaining: 0 };
                        true
                    }
                    Err(TrySendError::Full(job)) => {
                        *records = job.records;
                        outcome = Staged::Backlogged;
                        false
                    }
                    Err(TrySendError::Closed(job)) => {
                        *records = job.records;
                        outcome = Staged::Closed;
                        false
                    }
                }
            });

        match outcome {
            Staged::Sent { .. } => Staged::Sent { remaining },
            other => {
                self.pool.put(buf);
                other
            }
        }
    }
}

/// Logs a warning when records were dropped since the previous call.
pub(crate) fn report_dropped<T>(queue: &RingQueue<T>) {
    let dropped = queue.dropped();
    if dropped > 0 {
        warn!(
            "LOGS | Queue full, dropped {} log records (capacity {})",
            dropped,
            queue.capacity()
        );
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    struct Fixture {
        poll: PollLoop,
        dispatch_rx: mpsc::Receiver<ChunkJob>,
    }

    fn fixture(batch_size: usize, channel_depth: usize) -> Fixture {
        let (dispatch, dispatch_rx) = mpsc::channel(channel_depth);
        let (trigger_tx, trigger_rx) = mpsc::channel(1);
        let poll = PollLoop {
            queue: Arc::new(RingQueue::new(64)),
            pool: Arc::new(BufferPool::new(batch_size)),
            dispatch,
            trigger_tx,
            trigger_rx,
            interval: Duration::from_secs(3600),
            batch_size,
            stop: CancellationToken::new(),
        };
        Fixture { poll, dispatch_rx }
    }

    fn fill(queue: &RingQueue<LogRecord>, count: usize) {
        for i in 0..count {
            queue.enqueue(LogRecord::new().with_body(format!("record {i}")));
        }
    }

    fn bodies(records: &[LogRecord]) -> Vec<String> {
        records
            .iter()
            .map(|r| match &r.body {
                Some(crate::record::AnyValue::String(s)) => s.clone(),
                other => panic!("unexpected body {other:?}"),
            })
            .collect()
    }

    #[test]
    fn test_stage_batch_sends_one_batch() {
        let mut fx = fixture(2, 4);
        fill(&fx.poll.queue, 5);

        assert_eq!(fx.poll.stage_batch(), Staged::Sent { remaining: 3 });

        let job = fx.dispatch_rx.try_recv().unwrap();
        assert_eq!(bodies(&job.records), vec!["record 0", "record 1"]);
        assert!(job.respond_to.is_none());
        assert!(fx.dispatch_rx.try_recv().is_err());
    }

    #[test]
    fn test_stage_batch_empty_queue() {
        let mut fx = fixture(2, 4);

        assert_eq!(fx.poll.stage_batch(), Staged::Empty);
        assert!(fx.dispatch_rx.try_recv().is_err());
    }

    #[test]
    fn test_stage_batch_full_channel_keeps_queue() {
        let fx = fixture(2, 1);
        fill(&fx.poll.queue, 3);
        fx.poll
            .dispatch
            .try_send(ChunkJob::background(Vec::new()))
            .unwrap();

        assert_eq!(fx.poll.stage_batch(), Staged::Backlogged);

        assert_eq!(fx.poll.queue.len(), 3);
        assert_eq!(
            bodies(&fx.poll.queue.flush()),
            vec!["record 0", "record 1", "record 2"]
        );
    }

    #[test]
    fn test_stage_batch_closed_channel_keeps_queue() {
        let fx = fixture(2, 1);
        fill(&fx.poll.queue, 3);
        drop(fx.dispatch_rx);

        assert_eq!(fx.poll.stage_batch(), Staged::Closed);
        assert_eq!(fx.poll.queue.len(), 3);
    }

    #[tokio::test]
    async fn test_trigger_rearms_while_backlog_remains() {
        let fx = fixture(2, 8);
        let Fixture {
            poll,
            mut dispatch_rx,
        } = fx;
        fill(&poll.queue, 5);
        let trigger = poll.trigger_tx.clone();
        let stop = poll.stop.clone();
        let task = tokio::spawn(poll.run());

        trigger.try_send(()).unwrap();

        // 5 records, batch 2: the loop re-fires after the first two batches
        // and then waits for the next trigger or tick.
        let first = dispatch_rx.recv().await.unwrap();
        let second = dispatch_rx.recv().await.unwrap();
        assert_eq!(bodies(&first.records), vec!["record 0", "record 1"]);
        assert_eq!(bodies(&second.records), vec!["record 2", "record 3"]);

        let third = tokio::time::timeout(Duration::from_millis(100), dispatch_rx.recv()).await;
        assert!(third.is_err(), "a single leftover record waits for the tick");

        stop.cancel();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_stop_ends_loop_without_draining() {
        let Fixture {
            poll,
            mut dispatch_rx,
        } = fixture(2, 8);
        let queue = Arc::clone(&poll.queue);
        fill(&queue, 1);
        let stop = poll.stop.clone();
        let task = tokio::spawn(poll.run());

        stop.cancel();
        task.await.unwrap();

        assert_eq!(queue.len(), 1);
        // The loop's sender is gone with it
        assert!(dispatch_rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_interval_tick_exports_partial_batch() {
        let (dispatch, mut dispatch_rx) = mpsc::channel(4);
        let (trigger_tx, trigger_rx) = mpsc::channel(1);
        let poll = PollLoop {
            queue: Arc::new(RingQueue::new(16)),
            pool: Arc::new(BufferPool::new(10)),
            dispatch,
            trigger_tx,
            trigger_rx,
            interval: Duration::from_millis(20),
            batch_size: 10,
            stop: CancellationToken::new(),
        };
        fill(&poll.queue, 3);
        let stop = poll.stop.clone();
        let task = tokio::spawn(poll.run());

        let job = tokio::time::timeout(Duration::from_secs(5), dispatch_rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(job.records.len(), 3);

        stop.cancel();
        task.await.unwrap();
    }

    #[test]
    #[traced_test]
    fn test_report_dropped_warns_once_per_overflow() {
        let queue = RingQueue::new(1);
        for i in 0..3 {
            queue.enqueue(i);
        }

        report_dropped(&queue);
        assert!(logs_contain("dropped 2 log records"));

        // Counter was reset by the first report
        assert_eq!(queue.dropped(), 0);
    }
}
