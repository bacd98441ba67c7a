//! # Contracts
//!
//! Frozen interface contracts shared by every stage of the telemetry router.
//! All business crates depend on this crate, reverse dependencies are prohibited.
//!
//! ## Time Model
//! - `observed_at` is the wall-clock time at which the router received the
//!   message (UTC). Gateway-supplied timestamps are carried as hints only.
//!
//! ## Identity Model
//! - A physical sensor is identified by its protocol-prefixed [`SourceAddress`]
//!   (`pws_42`, `wirepas_AA:BB`, `hetic_7`, or a raw address for direct sensors).

mod config;
mod error;
mod message;
mod protocol;
mod sensor;
mod source_address;
mod store;

pub use config::*;
pub use error::*;
pub use message::InboundMessage;
pub use protocol::ProtocolKind;
pub use sensor::*;
pub use source_address::{AddressFamily, SourceAddress};
pub use store::{LocalSensorStore, SensorStore};
