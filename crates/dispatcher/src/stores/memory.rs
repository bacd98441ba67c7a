//! In-memory SensorStore
//!
//! Used with `--memory-store` for dry runs and by the tests. Supports an
//! injected per-call latency and injected append failures.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use contracts::{
    ContractError, MeasurementRecord, SensorIdentity, SensorKey, SensorStore, SourceAddress,
    UpsertedSensor,
};

#[derive(Debug, Default)]
struct MemoryState {
    sensors: Vec<SensorIdentity>,
    by_address: HashMap<SourceAddress, usize>,
    measurements: Vec<MeasurementRecord>,
}

/// SensorStore backed by process memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
    latency: Duration,
    fail_appends: AtomicBool,
    fail_next_appends: AtomicU32,
    upsert_calls: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every store call by `latency`
    pub fn with_latency(latency: Duration) -> Self {
        Self {
            latency,
            ..Self::default()
        }
    }

    /// Make every append fail until switched off
    pub fn set_fail_appends(&self, fail: bool) {
        self.fail_appends.store(fail, Ordering::Relaxed);
    }

    /// Make the next `count` appends fail
    pub fn fail_next_appends(&self, count: u32) {
        self.fail_next_appends.store(count, Ordering::Relaxed);
    }

    /// All sensors, in creation order
    pub fn sensors(&self) -> Vec<SensorIdentity> {
        self.lock().sensors.clone()
    }

    /// Sensor registered under `address`
    pub fn sensor(&self, address: &str) -> Option<SensorIdentity> {
        let state = self.lock();
        state
            .by_address
            .get(address)
            .map(|idx| state.sensors[*idx].clone())
    }

    /// All measurements, in append order
    pub fn measurements(&self) -> Vec<MeasurementRecord> {
        self.lock().measurements.clone()
    }

    /// Measurements belonging to `address`
    pub fn measurements_for(&self, address: &str) -> Vec<MeasurementRecord> {
        let Some(sensor) = self.sensor(address) else {
            return Vec::new();
        };
        self.lock()
            .measurements
            .iter()
            .filter(|m| m.sensor_id == sensor.id)
            .cloned()
            .collect()
    }

    pub fn sensor_count(&self) -> usize {
        self.lock().sensors.len()
    }

    pub fn measurement_count(&self) -> usize {
        self.lock().measurements.len()
    }

    /// Number of upsert calls that reached the store
    pub fn upsert_calls(&self) -> u64 {
        self.upsert_calls.load(Ordering::Relaxed)
    }

    /// Edit a sensor the way the CRUD API would
    pub fn update_sensor(&self, address: &str, display_name: &str, is_active: bool) -> bool {
        let mut state = self.lock();
        let Some(idx) = state.by_address.get(address).copied() else {
            return false;
        };
        let sensor = &mut state.sensors[idx];
        sensor.display_name = display_name.to_string();
        sensor.is_active = is_active;
        true
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn delay(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }

    fn should_fail_append(&self) -> bool {
        if self.fail_appends.load(Ordering::Relaxed) {
            return true;
        }
        self.fail_next_appends
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1))
            .is_ok()
    }
}

impl SensorStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn upsert_sensor(
        &self,
        address: &SourceAddress,
        display_name: &str,
    ) -> Result<UpsertedSensor, ContractError> {
        self.upsert_calls.fetch_add(1, Ordering::Relaxed);
        self.delay().await;

        let mut state = self.lock();
        if let Some(idx) = state.by_address.get(address).copied() {
            return Ok(UpsertedSensor {
                identity: state.sensors[idx].clone(),
                created: false,
            });
        }

        let identity = SensorIdentity {
            id: state.sensors.len() as SensorKey + 1,
            source_address: address.clone(),
            display_name: display_name.to_string(),
            is_active: true,
            last_seen_at: None,
        };
        let idx = state.sensors.len();
        state.sensors.push(identity.clone());
        state.by_address.insert(address.clone(), idx);
        Ok(UpsertedSensor {
            identity,
            created: true,
        })
    }

    async fn touch_sensor(
        &self,
        sensor_id: SensorKey,
        seen_at: DateTime<Utc>,
    ) -> Result<(), ContractError> {
        self.delay().await;

        let mut state = self.lock();
        let sensor = state
            .sensors
            .iter_mut()
            .find(|s| s.id == sensor_id)
            .ok_or_else(|| {
                ContractError::persistence("touch_sensor", format!("no sensor with id {sensor_id}"))
            })?;
        sensor.last_seen_at = Some(seen_at);
        Ok(())
    }

    async fn append_measurement(&self, record: &MeasurementRecord) -> Result<(), ContractError> {
        self.delay().await;

        if self.should_fail_append() {
            return Err(ContractError::persistence(
                "append_measurement",
                "injected failure",
            ));
        }
        let mut state = self.lock();
        if !state.sensors.iter().any(|s| s.id == record.sensor_id) {
            return Err(ContractError::persistence(
                "append_measurement",
                format!("foreign key violation: sensor {}", record.sensor_id),
            ));
        }
        state.measurements.push(record.clone());
        Ok(())
    }
}
