//! Transport error types

use thiserror::Error;

/// Transport specific error
#[derive(Debug, Error)]
pub enum TransportError {
    /// Broker refused or dropped the initial connection
    #[error("failed to connect to broker {address}: {message}")]
    ConnectFailed { address: String, message: String },

    /// No acknowledgement within the connect timeout
    #[error("timed out after {timeout_secs}s connecting to broker {address}")]
    ConnectTimeout { address: String, timeout_secs: u64 },

    /// Established connection failed
    #[error("connection error: {message}")]
    Connection { message: String },

    /// Subscribe request rejected
    #[error("failed to subscribe to '{filter}': {message}")]
    Subscribe { filter: String, message: String },

    /// Publish request rejected
    #[error("failed to publish to '{topic}': {message}")]
    Publish { topic: String, message: String },

    /// Session closed (explicit disconnect or receiver dropped)
    #[error("transport closed")]
    Closed,

    /// Operation not allowed in the current state
    #[error("invalid state: {0}")]
    InvalidState(String),
}

impl TransportError {
    /// Create connection error
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Create subscribe error
    pub fn subscribe(filter: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Subscribe {
            filter: filter.into(),
            message: message.into(),
        }
    }

    /// Create publish error
    pub fn publish(topic: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Publish {
            topic: topic.into(),
            message: message.into(),
        }
    }
}

/// Result alias
pub type Result<T> = std::result::Result<T, TransportError>;
