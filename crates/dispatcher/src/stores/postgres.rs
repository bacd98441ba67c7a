//! Postgres SensorStore (sqlx)

use std::time::Duration;

use chrono::{DateTime, Utc};
use contracts::{
    ContractError, MeasurementRecord, SensorIdentity, SensorKey, SensorStore, SourceAddress,
    StoreConfig, UpsertedSensor,
};
use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::{info, instrument};

const CREATE_SENSORS: &str = r#"
CREATE TABLE IF NOT EXISTS sensors (
    id BIGSERIAL PRIMARY KEY,
    source_address VARCHAR(64) NOT NULL UNIQUE,
    name VARCHAR(100) NOT NULL,
    is_active BOOLEAN NOT NULL DEFAULT TRUE,
    last_seen TIMESTAMPTZ,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
)
"#;

const CREATE_MEASUREMENTS: &str = r#"
CREATE TABLE IF NOT EXISTS measurements (
    time TIMESTAMPTZ NOT NULL,
    sensor_id BIGINT NOT NULL REFERENCES sensors (id),
    temperature DOUBLE PRECISION,
    humidity DOUBLE PRECISION,
    pressure DOUBLE PRECISION,
    acceleration_x DOUBLE PRECISION,
    acceleration_y DOUBLE PRECISION,
    acceleration_z DOUBLE PRECISION,
    rssi BIGINT,
    battery_voltage DOUBLE PRECISION,
    movement_counter BIGINT,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
)
"#;

const INSERT_SENSOR: &str = r#"
INSERT INTO sensors (source_address, name, is_active)
VALUES ($1, $2, TRUE)
ON CONFLICT (source_address) DO NOTHING
RETURNING id, source_address, name, is_active, last_seen
"#;

const SELECT_SENSOR: &str = r#"
SELECT id, source_address, name, is_active, last_seen
FROM sensors
WHERE source_address = $1
"#;

const TOUCH_SENSOR: &str = "UPDATE sensors SET last_seen = $2 WHERE id = $1";

const INSERT_MEASUREMENT: &str = r#"
INSERT INTO measurements (
    time, sensor_id, temperature, humidity, pressure,
    acceleration_x, acceleration_y, acceleration_z,
    rssi, battery_voltage, movement_counter
)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
"#;

#[derive(Debug, sqlx::FromRow)]
struct SensorRow {
    id: i64,
    source_address: String,
    name: String,
    is_active: bool,
    last_seen: Option<DateTime<Utc>>,
}

impl From<SensorRow> for SensorIdentity {
    fn from(row: SensorRow) -> Self {
        Self {
            id: row.id,
            source_address: SourceAddress::from(row.source_address),
            display_name: row.name,
            is_active: row.is_active,
            last_seen_at: row.last_seen,
        }
    }
}

fn db_error(operation: &'static str) -> impl FnOnce(sqlx::Error) -> ContractError {
    move |e| ContractError::persistence(operation, e.to_string())
}

/// SensorStore backed by a Postgres connection pool
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Open a pool sized from `config.max_connections`
    #[instrument(
        name = "pg_store_connect",
        skip(config),
        fields(max_connections = config.max_connections)
    )]
    pub async fn connect(config: &StoreConfig) -> Result<Self, ContractError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
            .connect(&config.url)
            .await
            .map_err(db_error("connect"))?;

        let store = Self { pool };
        if config.bootstrap_schema {
            store.bootstrap_schema().await?;
        }
        info!("Connected to Postgres");
        Ok(store)
    }

    /// Wrap an existing pool
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the `sensors` and `measurements` tables when missing
    pub async fn bootstrap_schema(&self) -> Result<(), ContractError> {
        for statement in [CREATE_SENSORS, CREATE_MEASUREMENTS] {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(db_error("bootstrap_schema"))?;
        }
        Ok(())
    }

    /// Close every pooled connection
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

impl SensorStore for PgStore {
    fn name(&self) -> &str {
        "postgres"
    }

    async fn upsert_sensor(
        &self,
        address: &SourceAddress,
        display_name: &str,
    ) -> Result<UpsertedSensor, ContractError> {
        let inserted: Option<SensorRow> = sqlx::query_as(INSERT_SENSOR)
            .bind(address.as_str())
            .bind(display_name)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("upsert_sensor"))?;

        if let Some(row) = inserted {
            return Ok(UpsertedSensor {
                identity: row.into(),
                created: true,
            });
        }

        // lost the race (or already known): the row exists now
        let existing: SensorRow = sqlx::query_as(SELECT_SENSOR)
            .bind(address.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(db_error("upsert_sensor"))?;
        Ok(UpsertedSensor {
            identity: existing.into(),
            created: false,
        })
    }

    async fn touch_sensor(
        &self,
        sensor_id: SensorKey,
        seen_at: DateTime<Utc>,
    ) -> Result<(), ContractError> {
        sqlx::query(TOUCH_SENSOR)
            .bind(sensor_id)
            .bind(seen_at)
            .execute(&self.pool)
            .await
            .map_err(db_error("touch_sensor"))?;
        Ok(())
    }

    async fn append_measurement(&self, record: &MeasurementRecord) -> Result<(), ContractError> {
        let f = &record.fields;
        sqlx::query(INSERT_MEASUREMENT)
            .bind(record.observed_at)
            .bind(record.sensor_id)
            .bind(f.temperature)
            .bind(f.humidity)
            .bind(f.pressure)
            .bind(f.acceleration_x)
            .bind(f.acceleration_y)
            .bind(f.acceleration_z)
            .bind(f.rssi)
            .bind(f.battery_voltage)
            .bind(f.movement_counter)
            .execute(&self.pool)
            .await
            .map_err(db_error("append_measurement"))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sensor_row_into_identity() {
        let row = SensorRow {
            id: 3,
            source_address: "pws_42".into(),
            name: "PWS Sensor 42".into(),
            is_active: true,
            last_seen: None,
        };
        let identity = SensorIdentity::from(row);
        assert_eq!(identity.source_address, "pws_42");
        assert_eq!(identity.display_name, "PWS Sensor 42");
    }

    #[test]
    fn test_upsert_never_updates_existing_rows() {
        assert!(INSERT_SENSOR.contains("DO NOTHING"));
        assert!(!INSERT_SENSOR.contains("DO UPDATE"));
    }

    #[tokio::test]
    async fn test_connect_failure_is_persistence_error() {
        let config = StoreConfig {
            url: "postgres://router@127.0.0.1:1/telemetry".into(),
            acquire_timeout_secs: 1,
            ..Default::default()
        };
        let err = PgStore::connect(&config).await.unwrap_err();
        assert!(err.is_persistence());
    }
}
