//! # Ingestion
//!
//! Topic routing and payload normalization.
//!
//! Responsibilities:
//! - Classify a topic into a protocol family and extract its routing keys
//! - Normalize the four gateway payload layouts into `MeasurementFields`
//! - Recover key:value payloads that are not valid JSON
//! - Report every failure as a typed, non-fatal error
//!
//! ## Usage Example
//!
//! ```
//! use contracts::InboundMessage;
//! use ingestion::{normalize_message, Normalized};
//!
//! let message = InboundMessage::now("pws-packet/1000/5/42", r#"{"temperature": 21.5}"#);
//! match normalize_message(&message).unwrap() {
//!     Normalized::Reading(reading) => assert_eq!(reading.address, "pws_42"),
//!     Normalized::Skipped { .. } => unreachable!(),
//! }
//! ```

mod adapters;
mod error;
mod metrics;
mod pipeline;
mod reading;
mod router;

// Re-exports
pub use adapters::fallback::parse_key_values;
pub use adapters::{detect_shape, PacketShape};
pub use error::{IngestionError, Result};
pub use metrics::{IngestionMetrics, MetricsSnapshot};
pub use pipeline::{normalize_message, Normalizer};
pub use reading::{Normalized, Reading, SkipReason};
pub use router::{classify, DirectMetric, Route};
