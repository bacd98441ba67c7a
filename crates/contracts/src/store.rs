//! SensorStore trait - persistence collaborator
//!
//! The router only needs upsert-by-address, a last-seen touch and an
//! append-only measurement insert.

use chrono::{DateTime, Utc};

use crate::{ContractError, MeasurementRecord, SensorKey, SourceAddress, UpsertedSensor};

/// Persistence interface used by the identity resolver and measurement writer.
///
/// Implementations are shared by every worker, so all methods take `&self`.
#[trait_variant::make(SensorStore: Send)]
pub trait LocalSensorStore {
    /// Store name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Return the sensor with `address`, creating it when absent.
    ///
    /// Must never create a second row for an existing address and must not
    /// overwrite `display_name` / `is_active` of an existing row.
    async fn upsert_sensor(
        &self,
        address: &SourceAddress,
        display_name: &str,
    ) -> Result<UpsertedSensor, ContractError>;

    /// Record that a message for the sensor was just ingested
    async fn touch_sensor(
        &self,
        sensor_id: SensorKey,
        seen_at: DateTime<Utc>,
    ) -> Result<(), ContractError>;

    /// Append one measurement row
    async fn append_measurement(&self, record: &MeasurementRecord) -> Result<(), ContractError>;
}
