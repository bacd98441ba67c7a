//! Configuration validation
//!
//! Rules:
//! - broker host / client id non-empty, port != 0
//! - at least one topic, every topic a legal MQTT filter
//! - reconnect backoff range ordered
//! - worker pool and queue non-zero
//! - Postgres store needs a URL and enough pooled connections for every worker
//! - refresh topic non-empty, refresh interval at most one week

use contracts::{ContractError, IngestConfig, StoreKind};

/// Upper bound on `refresh.interval_secs` (one week)
const MAX_REFRESH_INTERVAL_SECS: u64 = 7 * 24 * 60 * 60;

/// Validate an IngestConfig
///
/// Returns the first error encountered, or Ok(()).
pub fn validate(config: &IngestConfig) -> Result<(), ContractError> {
    validate_broker(config)?;
    validate_topics(config)?;
    validate_workers(config)?;
    validate_store(config)?;
    validate_refresh(config)?;
    Ok(())
}

/// Check an MQTT subscription filter.
///
/// `+` must occupy a whole level, `#` must be a whole level and the last one.
pub fn is_valid_topic_filter(filter: &str) -> bool {
    if filter.is_empty() {
        return false;
    }
    let levels: Vec<&str> = filter.split('/').collect();
    let last = levels.len() - 1;
    levels.iter().enumerate().all(|(idx, level)| {
        if level.contains('#') {
            return *level == "#" && idx == last;
        }
        !level.contains('+') || *level == "+"
    })
}

fn validate_broker(config: &IngestConfig) -> Result<(), ContractError> {
    let broker = &config.broker;

    if broker.host.trim().is_empty() {
        return Err(ContractError::config_validation(
            "broker.host",
            "broker host cannot be empty",
        ));
    }
    if broker.port == 0 {
        return Err(ContractError::config_validation(
            "broker.port",
            "port must be > 0",
        ));
    }
    if broker.client_id.trim().is_empty() {
        return Err(ContractError::config_validation(
            "broker.client_id",
            "client_id cannot be empty",
        ));
    }
    if broker.keep_alive_secs == 0 {
        return Err(ContractError::config_validation(
            "broker.keep_alive_secs",
            "keep_alive_secs must be > 0",
        ));
    }
    if broker.connect_timeout_secs == 0 {
        return Err(ContractError::config_validation(
            "broker.connect_timeout_secs",
            "connect_timeout_secs must be > 0",
        ));
    }

    let reconnect = &broker.reconnect;
    if reconnect.initial_backoff_ms > reconnect.max_backoff_ms {
        return Err(ContractError::config_validation(
            "broker.reconnect.initial_backoff_ms / broker.reconnect.max_backoff_ms",
            format!(
                "initial_backoff_ms ({}) must be <= max_backoff_ms ({})",
                reconnect.initial_backoff_ms, reconnect.max_backoff_ms
            ),
        ));
    }

    Ok(())
}

fn validate_topics(config: &IngestConfig) -> Result<(), ContractError> {
    if config.topics.is_empty() {
        return Err(ContractError::config_validation(
            "topics",
            "at least one topic must be subscribed",
        ));
    }
    for (idx, topic) in config.topics.iter().enumerate() {
        if !is_valid_topic_filter(topic) {
            return Err(ContractError::config_validation(
                format!("topics[{idx}]"),
                format!("'{topic}' is not a valid topic filter"),
            ));
        }
    }
    Ok(())
}

fn validate_workers(config: &IngestConfig) -> Result<(), ContractError> {
    let workers = &config.workers;

    if workers.pool_size == 0 {
        return Err(ContractError::config_validation(
            "workers.pool_size",
            "pool_size must be >= 1",
        ));
    }
    if workers.queue_capacity == 0 {
        return Err(ContractError::config_validation(
            "workers.queue_capacity",
            "queue_capacity must be >= 1",
        ));
    }
    if workers.shutdown_grace_secs == 0 {
        return Err(ContractError::config_validation(
            "workers.shutdown_grace_secs",
            "shutdown_grace_secs must be >= 1",
        ));
    }
    Ok(())
}

fn validate_store(config: &IngestConfig) -> Result<(), ContractError> {
    let store = &config.store;
    if store.kind != StoreKind::Postgres {
        return Ok(());
    }

    if store.url.trim().is_empty() {
        return Err(ContractError::config_validation(
            "store.url",
            "postgres store requires a database url",
        ));
    }
    if (store.max_connections as usize) < config.workers.pool_size {
        return Err(ContractError::config_validation(
            "store.max_connections / workers.pool_size",
            format!(
                "max_connections ({}) must be >= pool_size ({})",
                store.max_connections, config.workers.pool_size
            ),
        ));
    }
    Ok(())
}

fn validate_refresh(config: &IngestConfig) -> Result<(), ContractError> {
    let topic = config.refresh.topic.trim();
    if topic.is_empty() {
        return Err(ContractError::config_validation(
            "refresh.topic",
            "refresh topic cannot be empty",
        ));
    }
    // published, not subscribed: wildcards are not allowed here
    if topic.contains(['+', '#']) {
        return Err(ContractError::config_validation(
            "refresh.topic",
            format!("'{topic}' must not contain wildcards"),
        ));
    }
    if config.refresh.interval_secs > MAX_REFRESH_INTERVAL_SECS {
        return Err(ContractError::config_validation(
            "refresh.interval_secs",
            format!("must be at most {MAX_REFRESH_INTERVAL_SECS} (0 disables)"),
        ));
    }
    Ok(())
}
