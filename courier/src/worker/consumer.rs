//! The worker's receive/process/acknowledge loop.
//!
//! This module handles:
//! 1. Waiting on the delivery stream and the shutdown token at the same time
//! 2. Processing one delivery at a time and acknowledging it afterwards
//! 3. Stopping at the next loop boundary once shutdown is requested

use std::fmt;

use futures::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::delivery::InboundDelivery;
use super::processor::Process;
use super::WorkerState;
use crate::error::WorkerError;

/// Why the loop returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The shutdown token was cancelled.
    Shutdown,
    /// The broker closed the delivery stream.
    StreamClosed,
}

/// Summary handed back to the entry point through the task's join handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerReport {
    pub processed: u64,
    pub stop: StopReason,
}

/// Single-task consumer worker.
pub struct Worker<P> {
    processor: P,
    shutdown: CancellationToken,
}

impl<P: Process> Worker<P> {
    pub fn new(processor: P, shutdown: CancellationToken) -> Self {
        Self {
            processor,
            shutdown,
        }
    }

    /// Consume `deliveries` until shutdown is requested or the stream ends.
    ///
    /// A processing step that is already running always finishes and is
    /// acknowledged before shutdown is observed. An acknowledgment failure
    /// stops the loop with [`WorkerError::Ack`].
    pub async fn run<S, D, E>(self, mut deliveries: S) -> Result<WorkerReport, WorkerError>
    where
        S: Stream<Item = Result<D, E>> + Unpin + Send,
        D: InboundDelivery,
        E: fmt::Display + Send,
    {
        info!("worker_ready");

        let mut processed: u64 = 0;

        let stop = loop {
            debug!(state = %WorkerState::Waiting, "worker_state_changed");

            tokio::select! {
                // Shutdown wins when both sources are ready.
                biased;

                _ = self.shutdown.cancelled() => {
                    info!("worker_stopping");
                    break StopReason::Shutdown;
                }

                next = deliveries.next() => {
                    match next {
                        Some(Ok(delivery)) => {
                            self.handle(delivery).await?;
                            processed += 1;
                        }
                        Some(Err(e)) => {
                            error!(error = %e, "rabbitmq_delivery_error");
                        }
                        None => {
                            warn!("rabbitmq_consumer_closed");
                            break StopReason::StreamClosed;
                        }
                    }
                }
            }
        };

        info!(state = %WorkerState::Draining, processed = processed, "worker_state_changed");
        info!(state = %WorkerState::Stopped, stop = ?stop, "worker_state_changed");

        Ok(WorkerReport { processed, stop })
    }

    async fn handle<D: InboundDelivery>(&self, delivery: D) -> Result<(), WorkerError> {
        let delivery_tag = delivery.delivery_tag();

        info!(
            delivery_tag = delivery_tag,
            redelivered = delivery.redelivered(),
            body_length = delivery.payload().len(),
            state = %WorkerState::Processing,
            "rabbitmq_delivery_received"
        );

        self.processor.process(delivery_tag, delivery.payload()).await;

        delivery
            .ack()
            .await
            .map_err(|source| WorkerError::Ack {
                delivery_tag,
                source,
            })?;

        info!(delivery_tag = delivery_tag, "rabbitmq_delivery_acked");

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use async_trait::async_trait;
    use futures::stream;

    type AckLog = Arc<Mutex<Vec<u64>>>;

    struct FakeDelivery {
        tag: u64,
        payload: Vec<u8>,
        acks: AckLog,
        fail_ack: bool,
    }

    #[async_trait]
    impl InboundDelivery for FakeDelivery {
        fn delivery_tag(&self) -> u64 {
            self.tag
        }

        fn payload(&self) -> &[u8] {
            &self.payload
        }

        fn redelivered(&self) -> bool {
            false
        }

        async fn ack(self) -> lapin::Result<()> {
            if self.fail_ack {
                return Err(lapin::Error::ChannelsLimitReached);
            }
            self.acks.lock().unwrap().push(self.tag);
            Ok(())
        }
    }

    fn deliveries(count: u64, acks: &AckLog) -> Vec<Result<FakeDelivery, String>> {
        (1..=count)
            .map(|tag| {
                Ok(FakeDelivery {
                    tag,
                    payload: format!("{{\"x\":{}}}", tag).into_bytes(),
                    acks: Arc::clone(acks),
                    fail_ack: false,
                })
            })
            .collect()
    }

    /// Records what it sees and checks every earlier delivery was acked first.
    struct RecordingProcessor {
        acks: AckLog,
        seen: Mutex<Vec<(u64, Vec<u8>)>>,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        unacked_at_start: AtomicUsize,
        cancel_on_first: Option<CancellationToken>,
    }

    impl RecordingProcessor {
        fn new(acks: &AckLog) -> Self {
            Self {
                acks: Arc::clone(acks),
                seen: Mutex::new(Vec::new()),
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
                unacked_at_start: AtomicUsize::new(0),
                cancel_on_first: None,
            }
        }
    }

    #[async_trait]
    impl Process for Arc<RecordingProcessor> {
        async fn process(&self, delivery_tag: u64, payload: &[u8]) {
            let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(current, Ordering::SeqCst);

            let seen_before = self.seen.lock().unwrap().len();
            let acked_before = self.acks.lock().unwrap().len();
            if seen_before != acked_before {
                self.unacked_at_start.fetch_add(1, Ordering::SeqCst);
            }

            self.seen
                .lock()
                .unwrap()
                .push((delivery_tag, payload.to_vec()));

            if let Some(token) = &self.cancel_on_first {
                token.cancel();
            }

            tokio::time::sleep(Duration::from_millis(5)).await;

            self.in_flight.fetch_sub(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn test_processes_and_acks_each_delivery_once() {
        let acks: AckLog = Arc::default();
        let processor = Arc::new(RecordingProcessor::new(&acks));
        let worker = Worker::new(Arc::clone(&processor), CancellationToken::new());

        let report = worker
            .run(stream::iter(deliveries(4, &acks)))
            .await
            .unwrap();

        assert_eq!(
            report,
            WorkerReport {
                processed: 4,
                stop: StopReason::StreamClosed
            }
        );
        assert_eq!(*acks.lock().unwrap(), vec![1, 2, 3, 4]);

        let seen = processor.seen.lock().unwrap();
        assert_eq!(seen.len(), 4);
        assert_eq!(seen[0], (1, br#"{"x":1}"#.to_vec()));
    }

    #[tokio::test]
    async fn test_never_more_than_one_in_flight() {
        let acks: AckLog = Arc::default();
        let processor = Arc::new(RecordingProcessor::new(&acks));
        let worker = Worker::new(Arc::clone(&processor), CancellationToken::new());

        worker
            .run(stream::iter(deliveries(10, &acks)))
            .await
            .unwrap();

        assert_eq!(processor.max_in_flight.load(Ordering::SeqCst), 1);
        assert_eq!(processor.unacked_at_start.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_shutdown_during_processing_finishes_current_delivery() {
        let acks: AckLog = Arc::default();
        let token = CancellationToken::new();
        let mut recorder = RecordingProcessor::new(&acks);
        recorder.cancel_on_first = Some(token.clone());
        let processor = Arc::new(recorder);
        let worker = Worker::new(Arc::clone(&processor), token);

        let report = worker
            .run(stream::iter(deliveries(5, &acks)))
            .await
            .unwrap();

        assert_eq!(
            report,
            WorkerReport {
                processed: 1,
                stop: StopReason::Shutdown
            }
        );
        assert_eq!(*acks.lock().unwrap(), vec![1]);
        assert_eq!(processor.seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_cancelled_before_start_consumes_nothing() {
        let acks: AckLog = Arc::default();
        let token = CancellationToken::new();
        token.cancel();
        let processor = Arc::new(RecordingProcessor::new(&acks));
        let worker = Worker::new(Arc::clone(&processor), token);

        let report = worker
            .run(stream::iter(deliveries(3, &acks)))
            .await
            .unwrap();

        assert_eq!(report.stop, StopReason::Shutdown);
        assert_eq!(report.processed, 0);
        assert!(acks.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_shutdown_while_waiting_for_deliveries() {
        let acks: AckLog = Arc::default();
        let token = CancellationToken::new();
        let processor = Arc::new(RecordingProcessor::new(&acks));
        let worker = Worker::new(Arc::clone(&processor), token.clone());

        let handle = tokio::spawn(
            worker.run(stream::pending::<Result<FakeDelivery, String>>()),
        );

        tokio::time::sleep(Duration::from_millis(20)).await;
        token.cancel();

        let report = tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap()
            .unwrap();

        assert_eq!(
            report,
            WorkerReport {
                processed: 0,
                stop: StopReason::Shutdown
            }
        );
    }

    #[tokio::test]
    async fn test_stream_error_is_skipped() {
        let acks: AckLog = Arc::default();
        let processor = Arc::new(RecordingProcessor::new(&acks));
        let worker = Worker::new(Arc::clone(&processor), CancellationToken::new());

        let mut items = deliveries(2, &acks);
        items.insert(1, Err("connection reset".to_string()));

        let report = worker.run(stream::iter(items)).await.unwrap();

        assert_eq!(report.processed, 2);
        assert_eq!(*acks.lock().unwrap(), vec![1, 2]);
    }

    #[tokio::test]
    async fn test_ack_failure_stops_worker() {
        let acks: AckLog = Arc::default();
        let processor = Arc::new(RecordingProcessor::new(&acks));
        let worker = Worker::new(Arc::clone(&processor), CancellationToken::new());

        let mut items = deliveries(3, &acks);
        if let Some(Ok(second)) = items.get_mut(1) {
            second.fail_ack = true;
        }

        let result = worker.run(stream::iter(items)).await;

        match result {
            Err(WorkerError::Ack { delivery_tag, .. }) => assert_eq!(delivery_tag, 2),
            other => panic!("expected ack failure, got {:?}", other),
        }
        assert_eq!(*acks.lock().unwrap(), vec![1]);
        assert_eq!(processor.seen.lock().unwrap().len(), 2);
    }
}
