//! Measurement writer

use std::sync::Arc;

use chrono::{DateTime, Utc};
use contracts::{ContractError, MeasurementFields, MeasurementRecord, SensorKey, SensorStore};
use tracing::debug;

/// What the writer did with a reading
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// Row appended
    Stored,
    /// No temperature, humidity or pressure: nothing written
    Discarded,
}

/// Appends measurement rows
pub struct MeasurementWriter<S> {
    store: Arc<S>,
}

impl<S: SensorStore> MeasurementWriter<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Append one measurement for `sensor_id`.
    ///
    /// Readings without an environmental field are discarded, not failed.
    /// A store failure is returned once and never retried.
    pub async fn append(
        &self,
        sensor_id: SensorKey,
        fields: &MeasurementFields,
        observed_at: DateTime<Utc>,
    ) -> Result<WriteOutcome, ContractError> {
        if !fields.has_environmental() {
            debug!(sensor_id, "No environmental field, measurement discarded");
            return Ok(WriteOutcome::Discarded);
        }

        let record = MeasurementRecord {
            sensor_id,
            observed_at,
            fields: *fields,
        };
        self.store.append_measurement(&record).await?;
        Ok(WriteOutcome::Stored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stores::MemoryStore;
    use contracts::SourceAddress;

    async fn setup() -> (Arc<MemoryStore>, MeasurementWriter<MemoryStore>, SensorKey) {
        let store = Arc::new(MemoryStore::new());
        let id = store
            .upsert_sensor(&SourceAddress::packet_gateway("42"), "PWS Sensor 42")
            .await
            .unwrap()
            .identity
            .id;
        let writer = MeasurementWriter::new(Arc::clone(&store));
        (store, writer, id)
    }

    #[tokio::test]
    async fn test_zero_temperature_is_stored() {
        let (store, writer, id) = setup().await;
        let fields = MeasurementFields {
            temperature: Some(0.0),
            ..Default::default()
        };

        let outcome = writer.append(id, &fields, Utc::now()).await.unwrap();
        assert_eq!(outcome, WriteOutcome::Stored);
        assert_eq!(store.measurements()[0].fields, fields);
    }

    #[tokio::test]
    async fn test_no_environmental_field_is_discarded() {
        let (store, writer, id) = setup().await;
        let fields = MeasurementFields {
            rssi: Some(-70),
            battery_voltage: Some(2.9),
            ..Default::default()
        };

        let outcome = writer.append(id, &fields, Utc::now()).await.unwrap();
        assert_eq!(outcome, WriteOutcome::Discarded);
        assert_eq!(store.measurement_count(), 0);
    }

    #[tokio::test]
    async fn test_store_failure_is_returned() {
        let (store, writer, id) = setup().await;
        store.fail_next_appends(1);
        let fields = MeasurementFields {
            humidity: Some(40.0),
            ..Default::default()
        };

        assert!(writer.append(id, &fields, Utc::now()).await.is_err());
        // next message is unaffected
        assert_eq!(
            writer.append(id, &fields, Utc::now()).await.unwrap(),
            WriteOutcome::Stored
        );
    }
}
