//! Ingestion counters

use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::{IngestionError, Result};
use crate::reading::Normalized;

/// Ingestion metrics
#[derive(Debug, Default)]
pub struct IngestionMetrics {
    /// Messages handed to the normalizer
    pub messages_received: AtomicU64,

    /// Messages normalized into a reading
    pub readings: AtomicU64,

    /// Recognised no-op messages
    pub skipped: AtomicU64,

    /// Payloads that were not valid text
    pub decode_errors: AtomicU64,

    /// Payloads that could not be parsed
    pub parse_errors: AtomicU64,

    /// Payloads with no recognised field set
    pub shape_errors: AtomicU64,
}

impl IngestionMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one normalization result
    pub fn record(&self, result: &Result<Normalized>) {
        self.messages_received.fetch_add(1, Ordering::Relaxed);
        let counter = match result {
            Ok(Normalized::Reading(_)) => &self.readings,
            Ok(Normalized::Skipped { .. }) => &self.skipped,
            Err(IngestionError::Decode { .. }) => &self.decode_errors,
            Err(IngestionError::Parse { .. }) => &self.parse_errors,
            Err(IngestionError::Shape { .. }) => &self.shape_errors,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            messages_received: self.messages_received.load(Ordering::Relaxed),
            readings: self.readings.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            decode_errors: self.decode_errors.load(Ordering::Relaxed),
            parse_errors: self.parse_errors.load(Ordering::Relaxed),
            shape_errors: self.shape_errors.load(Ordering::Relaxed),
        }
    }
}

/// Metrics snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub messages_received: u64,
    pub readings: u64,
    pub skipped: u64,
    pub decode_errors: u64,
    pub parse_errors: u64,
    pub shape_errors: u64,
}

impl MetricsSnapshot {
    /// All normalization failures
    pub fn errors(&self) -> u64 {
        self.decode_errors + self.parse_errors + self.shape_errors
    }
}
