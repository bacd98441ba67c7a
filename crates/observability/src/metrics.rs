//! Router metrics
//!
//! Thin wrappers over the `metrics` facade so every crate records the same
//! names and labels. All names carry the `telemetry_router_` prefix.

use contracts::ProtocolKind;
use metrics::{counter, gauge, histogram};

/// Final outcome of one inbound message, used as the `outcome` label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageOutcome {
    /// Measurement persisted
    Stored,
    /// No persistable field present
    Discarded,
    /// Recognised no-op (unknown/reserved topic, empty payload, diagnostic packet)
    Skipped,
    /// Payload was not valid text
    DecodeError,
    /// Payload was not parseable
    ParseError,
    /// Parsed but no recognised field set
    ShapeError,
    /// Store rejected the write
    PersistenceError,
}

impl MessageOutcome {
    /// Label value
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Stored => "stored",
            Self::Discarded => "discarded",
            Self::Skipped => "skipped",
            Self::DecodeError => "decode_error",
            Self::ParseError => "parse_error",
            Self::ShapeError => "shape_error",
            Self::PersistenceError => "persistence_error",
        }
    }

    /// Whether the outcome is a failure
    pub fn is_error(self) -> bool {
        matches!(
            self,
            Self::DecodeError | Self::ParseError | Self::ShapeError | Self::PersistenceError
        )
    }
}

/// Record a message taken off the transport
pub fn record_message_received(protocol: ProtocolKind) {
    counter!(
        "telemetry_router_messages_received_total",
        "protocol" => protocol.as_str()
    )
    .increment(1);
}

/// Record the final outcome of a message
pub fn record_outcome(protocol: ProtocolKind, outcome: MessageOutcome) {
    counter!(
        "telemetry_router_messages_total",
        "protocol" => protocol.as_str(),
        "outcome" => outcome.as_str()
    )
    .increment(1);
}

/// Record a newly created sensor identity
pub fn record_sensor_created() {
    counter!("telemetry_router_sensors_created_total").increment(1);
}

/// Record the worker queue depth
pub fn record_queue_depth(depth: usize) {
    gauge!("telemetry_router_queue_depth").set(depth as f64);
}

/// Record the transport connection state (numeric code)
pub fn record_connection_state(code: u8) {
    gauge!("telemetry_router_connection_state").set(f64::from(code));
}

/// Record a successful reconnect
pub fn record_reconnect() {
    counter!("telemetry_router_reconnects_total").increment(1);
}

/// Record time from receipt to outcome
pub fn record_processing_latency_ms(latency_ms: f64) {
    histogram!("telemetry_router_processing_latency_ms").record(latency_ms);
}

/// Summary of a [`RunningStats`]
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// Online statistics (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    /// Add a sample
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// Sample variance
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}
