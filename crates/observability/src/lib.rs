//! # Observability
//!
//! Prometheus metrics for the router. Logging is set up by the binary;
//! every crate emits `tracing` events and this crate owns the metric names.
//!
//! ## Example
//!
//! ```ignore
//! use observability::metrics;
//!
//! observability::init_metrics_only(9000)?;
//!
//! metrics::record_message_received(ProtocolKind::MeshGateway);
//! metrics::record_outcome(ProtocolKind::MeshGateway, MessageOutcome::Stored);
//! ```

pub mod metrics;

use anyhow::{Context, Result};
use metrics_exporter_prometheus::PrometheusBuilder;

pub use crate::metrics::{
    record_connection_state, record_message_received, record_outcome, record_processing_latency_ms,
    record_queue_depth, record_reconnect, record_sensor_created, MessageOutcome, RunningStats,
    StatsSummary,
};

/// Install the Prometheus recorder with an HTTP listener on `port`
///
/// For callers that already own the tracing subscriber.
pub fn init_metrics_only(port: u16) -> Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(([0, 0, 0, 0], port))
        .install()
        .context("Failed to install Prometheus recorder")?;

    tracing::info!(port = port, "Prometheus metrics endpoint initialized");
    Ok(())
}
