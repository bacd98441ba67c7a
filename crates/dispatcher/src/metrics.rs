//! Worker pool counters

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use observability::{MessageOutcome, RunningStats, StatsSummary};

/// Metrics shared by every worker
#[derive(Debug, Default)]
pub struct DispatchMetrics {
    /// Messages waiting in the queue (last observed)
    queue_len: AtomicUsize,
    /// Messages taken off the queue
    processed: AtomicU64,
    stored: AtomicU64,
    discarded: AtomicU64,
    skipped: AtomicU64,
    /// Decode, parse and shape failures
    ingestion_errors: AtomicU64,
    persistence_errors: AtomicU64,
    /// Receipt-to-outcome latency
    latency_ms: Mutex<RunningStats>,
}

impl DispatchMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue_len(&self) -> usize {
        self.queue_len.load(Ordering::Relaxed)
    }

    pub fn set_queue_len(&self, len: usize) {
        self.queue_len.store(len, Ordering::Relaxed);
    }

    /// Count one finished message
    pub fn record(&self, outcome: MessageOutcome, latency_ms: f64) {
        self.processed.fetch_add(1, Ordering::Relaxed);
        let counter = match outcome {
            MessageOutcome::Stored => &self.stored,
            MessageOutcome::Discarded => &self.discarded,
            MessageOutcome::Skipped => &self.skipped,
            MessageOutcome::PersistenceError => &self.persistence_errors,
            MessageOutcome::DecodeError
            | MessageOutcome::ParseError
            | MessageOutcome::ShapeError => &self.ingestion_errors,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        self.latency_ms
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(latency_ms);
    }

    pub fn processed(&self) -> u64 {
        self.processed.load(Ordering::Relaxed)
    }

    pub fn stored(&self) -> u64 {
        self.stored.load(Ordering::Relaxed)
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        let latency = self.latency_ms.lock().unwrap_or_else(PoisonError::into_inner);
        MetricsSnapshot {
            queue_len: self.queue_len(),
            processed: self.processed(),
            stored: self.stored(),
            discarded: self.discarded.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            ingestion_errors: self.ingestion_errors.load(Ordering::Relaxed),
            persistence_errors: self.persistence_errors.load(Ordering::Relaxed),
            latency_ms: StatsSummary::from(&*latency),
        }
    }
}

/// Snapshot of worker pool metrics (for reporting)
#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    pub queue_len: usize,
    pub processed: u64,
    pub stored: u64,
    pub discarded: u64,
    pub skipped: u64,
    pub ingestion_errors: u64,
    pub persistence_errors: u64,
    pub latency_ms: StatsSummary,
}

impl MetricsSnapshot {
    pub fn errors(&self) -> u64 {
        self.ingestion_errors + self.persistence_errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_outcomes() {
        let metrics = DispatchMetrics::new();
        metrics.record(MessageOutcome::Stored, 1.0);
        metrics.record(MessageOutcome::Stored, 3.0);
        metrics.record(MessageOutcome::ShapeError, 2.0);
        metrics.record(MessageOutcome::PersistenceError, 2.0);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.processed, 4);
        assert_eq!(snapshot.stored, 2);
        assert_eq!(snapshot.errors(), 2);
        assert_eq!(snapshot.latency_ms.count, 4);
        assert!((snapshot.latency_ms.mean - 2.0).abs() < 1e-10);
    }
}
