//! WorkerPool - bounded set of workers draining the inbound queue
//!
//! The transport subscriber feeds a bounded `async_channel`; `size` workers
//! share its receiver, so at most `size` messages are in flight and a full
//! queue pushes back on the subscriber. The worker loop is the single place
//! where per-message results are logged and counted.

use std::sync::Arc;
use std::time::Duration;

use async_channel::Receiver;
use chrono::Utc;
use contracts::{InboundMessage, SensorStore};
use observability::MessageOutcome;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, error, info, instrument, warn};

use crate::error::{DispatchError, Result};
use crate::metrics::DispatchMetrics;
use crate::processor::{MessageProcessor, Outcome, Processed};

/// How the pool ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShutdownReport {
    /// Every worker finished within the grace period
    pub drained: bool,
    /// Workers aborted at the deadline
    pub abandoned: usize,
    /// Messages still queued at the deadline
    pub left_in_queue: usize,
}

/// Handle to the running workers
pub struct WorkerPool {
    queue: Receiver<InboundMessage>,
    workers: JoinSet<()>,
    metrics: Arc<DispatchMetrics>,
    size: usize,
}

impl WorkerPool {
    /// Spawn `size` workers consuming `queue`
    pub fn spawn<S>(
        processor: Arc<MessageProcessor<S>>,
        queue: Receiver<InboundMessage>,
        size: usize,
    ) -> Self
    where
        S: SensorStore + Send + Sync + 'static,
    {
        let size = size.max(1);
        let metrics = Arc::new(DispatchMetrics::new());
        let mut workers = JoinSet::new();

        for worker in 0..size {
            let processor = Arc::clone(&processor);
            let queue = queue.clone();
            let metrics = Arc::clone(&metrics);
            workers.spawn(async move {
                worker_loop(worker, processor, queue, metrics).await;
            });
        }
        info!(workers = size, "Worker pool started");

        Self {
            queue,
            workers,
            metrics,
            size,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Get current metrics
    pub fn metrics(&self) -> &Arc<DispatchMetrics> {
        &self.metrics
    }

    /// Stop accepting messages, drain what is queued and wait for the workers.
    ///
    /// Workers still busy after `grace` are aborted; their in-flight
    /// messages may or may not have reached the store.
    #[instrument(name = "worker_pool_shutdown", skip(self), fields(workers = self.size))]
    pub async fn shutdown(mut self, grace: Duration) -> ShutdownReport {
        self.queue.close();
        let deadline = Instant::now() + grace;

        loop {
            match tokio::time::timeout_at(deadline, self.workers.join_next()).await {
                Ok(Some(Ok(()))) => {}
                Ok(Some(Err(e))) => {
                    error!(error = %e, "Worker task failed");
                }
                Ok(None) => {
                    debug!("Worker pool drained");
                    return ShutdownReport {
                        drained: true,
                        abandoned: 0,
                        left_in_queue: 0,
                    };
                }
                Err(_) => {
                    let abandoned = self.workers.len();
                    let left_in_queue = self.queue.len();
                    self.workers.abort_all();
                    warn!(
                        abandoned,
                        left_in_queue,
                        grace_ms = grace.as_millis() as u64,
                        "Grace period elapsed, abandoning in-flight messages"
                    );
                    return ShutdownReport {
                        drained: false,
                        abandoned,
                        left_in_queue,
                    };
                }
            }
        }
    }
}

#[instrument(name = "worker_loop", skip(processor, queue, metrics))]
async fn worker_loop<S: SensorStore>(
    worker: usize,
    processor: Arc<MessageProcessor<S>>,
    queue: Receiver<InboundMessage>,
    metrics: Arc<DispatchMetrics>,
) {
    debug!("Worker started");

    while let Ok(message) = queue.recv().await {
        metrics.set_queue_len(queue.len());
        observability::record_queue_depth(queue.len());

        let result = processor.process(&message).await;
        let latency_ms = Utc::now()
            .signed_duration_since(message.received_at)
            .num_microseconds()
            .map_or(0.0, |us| us.max(0) as f64 / 1000.0);
        report(&message, &result, latency_ms, &metrics);
    }

    debug!("Worker stopped");
}

/// Log and count one result; never fails
fn report(
    message: &InboundMessage,
    result: &Result<Processed>,
    latency_ms: f64,
    metrics: &DispatchMetrics,
) -> MessageOutcome {
    let topic = message.topic.as_str();
    let (protocol, outcome) = match result {
        Ok(processed) => {
            let protocol = processed.protocol;
            match processed.outcome {
                Outcome::Stored { sensor_id } => {
                    debug!(topic, %protocol, sensor_id, "Measurement stored");
                }
                Outcome::Discarded { sensor_id } => {
                    debug!(
                        topic,
                        %protocol,
                        sensor_id = ?sensor_id,
                        "No persistable field, message discarded"
                    );
                }
                Outcome::Skipped(reason) => {
                    debug!(topic, %protocol, reason = reason.as_str(), "Message skipped");
                }
            }
            (protocol, processed.outcome.label())
        }
        Err(e @ DispatchError::Ingestion(_)) => {
            warn!(topic, protocol = %e.protocol(), error = %e, "Dropping malformed message");
            (e.protocol(), e.outcome())
        }
        Err(e @ DispatchError::Persistence { .. }) => {
            error!(
                topic,
                protocol = %e.protocol(),
                error = %e,
                "Dropping message after store failure"
            );
            (e.protocol(), e.outcome())
        }
    };

    observability::record_message_received(protocol);
    observability::record_outcome(protocol, outcome);
    observability::record_processing_latency_ms(latency_ms);
    metrics.record(outcome, latency_ms);
    outcome
}
