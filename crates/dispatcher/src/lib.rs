//! # Dispatcher
//!
//! Persistence side of the router.
//!
//! Responsibilities:
//! - Resolve a canonical address to a sensor identity, creating it once
//! - Append measurements that carry an environmental field
//! - Run a bounded worker pool over the inbound queue
//! - Log and count every per-message failure at one boundary, never stop

pub mod error;
pub mod identity;
pub mod metrics;
pub mod pool;
pub mod processor;
pub mod stores;
pub mod writer;

pub use contracts::SensorStore;
pub use error::{DispatchError, Result};
pub use identity::IdentityResolver;
pub use metrics::{DispatchMetrics, MetricsSnapshot};
pub use pool::{ShutdownReport, WorkerPool};
pub use processor::{MessageProcessor, Outcome, Processed};
pub use stores::MemoryStore;
#[cfg(feature = "postgres")]
pub use stores::PgStore;
pub use writer::{MeasurementWriter, WriteOutcome};
