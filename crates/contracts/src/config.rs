//! IngestConfig - Config Loader output
//!
//! Describes the complete router configuration: broker, subscriptions,
//! persistence, worker pool, identity policy and refresh requests.
//! Every field has a default so an empty file is a valid configuration.

use serde::{Deserialize, Serialize};

/// Topic patterns subscribed by default.
///
/// `gw-req/get_configs/res` is subscribed but not processed.
pub const DEFAULT_TOPICS: &[&str] = &[
    "sensors/+/+/+",
    "sensor/+/data",
    "gw-event/received_data",
    "gw-req/get_configs/res",
    "pws-packet/+/+/+",
    "wirepas-json-event/packet/+/+/+",
];

/// Complete router configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Broker connection settings
    pub broker: BrokerConfig,

    /// Subscribed topic patterns
    pub topics: TopicList,

    /// Persistence settings
    pub store: StoreConfig,

    /// Worker pool sizing
    pub workers: WorkerConfig,

    /// Sensor identity policy
    pub identity: IdentityPolicy,

    /// On-demand refresh requests
    pub refresh: RefreshConfig,
}

/// Subscribed topic patterns (defaults to [`DEFAULT_TOPICS`])
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TopicList(pub Vec<String>);

impl Default for TopicList {
    fn default() -> Self {
        Self(DEFAULT_TOPICS.iter().map(|t| t.to_string()).collect())
    }
}

impl TopicList {
    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Broker connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerConfig {
    /// Broker host name
    pub host: String,

    /// Broker TCP port
    pub port: u16,

    /// MQTT client identifier
    pub client_id: String,

    /// Optional user name
    pub username: Option<String>,

    /// Optional password
    pub password: Option<String>,

    /// Keep-alive interval in seconds
    pub keep_alive_secs: u64,

    /// Bound on a single connect attempt
    pub connect_timeout_secs: u64,

    /// Initial connect attempts before giving up (0 = retry forever)
    pub connect_attempts: u32,

    /// Capacity of the client request queue (subscribe / publish)
    pub request_capacity: usize,

    /// Reconnect backoff
    pub reconnect: ReconnectConfig,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 1883,
            client_id: "telemetry-router".to_string(),
            username: None,
            password: None,
            keep_alive_secs: 60,
            connect_timeout_secs: 10,
            connect_attempts: 5,
            request_capacity: 16,
            reconnect: ReconnectConfig::default(),
        }
    }
}

impl BrokerConfig {
    /// `host:port`, used in logs and errors
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Credentials, only when both parts are set and non-empty
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (self.username.as_deref(), self.password.as_deref()) {
            (Some(u), Some(p)) if !u.is_empty() => Some((u, p)),
            _ => None,
        }
    }
}

/// Exponential reconnect backoff
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconnectConfig {
    /// First delay after a connection loss
    pub initial_backoff_ms: u64,

    /// Upper bound of the delay
    pub max_backoff_ms: u64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_backoff_ms: 500,
            max_backoff_ms: 30_000,
        }
    }
}

/// Persistence backend
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreKind {
    /// PostgreSQL via connection pool
    #[default]
    Postgres,
    /// In-process store (tests, dry runs)
    Memory,
}

/// Persistence settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Backend
    pub kind: StoreKind,

    /// Database URL (Postgres only)
    pub url: String,

    /// Connection pool size, must be >= worker pool size
    pub max_connections: u32,

    /// Bound on waiting for a pooled connection
    pub acquire_timeout_secs: u64,

    /// Create tables when missing
    pub bootstrap_schema: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            kind: StoreKind::Postgres,
            url: String::new(),
            max_connections: 10,
            acquire_timeout_secs: 5,
            bootstrap_schema: true,
        }
    }
}

/// Worker pool sizing
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Number of concurrent workers
    pub pool_size: usize,

    /// Queue between the subscriber and the workers
    pub queue_capacity: usize,

    /// Drain deadline on shutdown
    pub shutdown_grace_secs: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            pool_size: 8,
            queue_capacity: 256,
            shutdown_grace_secs: 5,
        }
    }
}

/// Sensor identity policy
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityPolicy {
    /// Create the identity on first contact even when the message carries
    /// no persistable field
    pub create_without_fields: bool,
}

impl Default for IdentityPolicy {
    fn default() -> Self {
        Self {
            create_without_fields: true,
        }
    }
}

/// Refresh request settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RefreshConfig {
    /// Topic the request is published on
    pub topic: String,

    /// Value of the `action` field
    pub action: String,

    /// Periodic refresh interval (0 = on demand only)
    pub interval_secs: u64,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            topic: "wirepas/request/sensor-data".to_string(),
            action: "refresh_all".to_string(),
            interval_secs: 0,
        }
    }
}
