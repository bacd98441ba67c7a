//! Error types for CLI operations.

use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Broker could not be reached
    #[error("Failed to connect to broker at {address}: {message}")]
    BrokerConnection { address: String, message: String },

    /// Store could not be opened
    #[error("Failed to open {store} store: {message}")]
    StoreConnection { store: String, message: String },
}

impl CliError {
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    pub fn broker_connection(address: impl Into<String>, message: impl Into<String>) -> Self {
        Self::BrokerConnection {
            address: address.into(),
            message: message.into(),
        }
    }

    pub fn store_connection(store: impl Into<String>, message: impl Into<String>) -> Self {
        Self::StoreConnection {
            store: store.into(),
            message: message.into(),
        }
    }
}
