//! Sensor identity and measurement records
//!
//! `SensorIdentity` is created once per address by the identity resolver.
//! `MeasurementRecord` is appended once per valid inbound message.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::SourceAddress;

/// Database identifier of a sensor
pub type SensorKey = i64;

/// A physical sensor known to the router
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorIdentity {
    /// Store-assigned identifier
    pub id: SensorKey,

    /// Canonical, globally unique address
    pub source_address: SourceAddress,

    /// Name shown to users; owned by the CRUD API after creation
    pub display_name: String,

    /// Active flag; owned by the CRUD API after creation
    pub is_active: bool,

    /// Last time a message for this sensor was ingested
    pub last_seen_at: Option<DateTime<Utc>>,
}

/// Result of [`SensorStore::upsert_sensor`](crate::SensorStore::upsert_sensor)
#[derive(Debug, Clone, PartialEq)]
pub struct UpsertedSensor {
    pub identity: SensorIdentity,
    /// True when this call inserted the row
    pub created: bool,
}

/// Normalized measurement values, all optional
///
/// Units follow what the gateways publish; the router does not convert.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MeasurementFields {
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub pressure: Option<f64>,
    pub acceleration_x: Option<f64>,
    pub acceleration_y: Option<f64>,
    pub acceleration_z: Option<f64>,
    pub rssi: Option<i64>,
    pub battery_voltage: Option<f64>,
    pub movement_counter: Option<i64>,
}

impl MeasurementFields {
    /// True when temperature, humidity or pressure is present.
    ///
    /// Presence check, not truthiness: `Some(0.0)` counts.
    pub fn has_environmental(&self) -> bool {
        self.temperature.is_some() || self.humidity.is_some() || self.pressure.is_some()
    }

    /// True when no field at all is set
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Number of populated fields
    pub fn populated(&self) -> usize {
        [
            self.temperature.is_some(),
            self.humidity.is_some(),
            self.pressure.is_some(),
            self.acceleration_x.is_some(),
            self.acceleration_y.is_some(),
            self.acceleration_z.is_some(),
            self.rssi.is_some(),
            self.battery_voltage.is_some(),
            self.movement_counter.is_some(),
        ]
        .iter()
        .filter(|set| **set)
        .count()
    }
}

/// Append-only measurement row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementRecord {
    /// Owning sensor
    pub sensor_id: SensorKey,

    /// Ingestion receipt time
    pub observed_at: DateTime<Utc>,

    /// Measured values
    pub fields: MeasurementFields,
}
