//! Ingestion error types
//!
//! One variant per way a single message can fail normalization. None of
//! them is fatal: the worker logs the error and moves on.

use contracts::ProtocolKind;
use thiserror::Error;

/// Normalization error
#[derive(Debug, Error)]
pub enum IngestionError {
    /// Payload is not valid UTF-8 text
    #[error("{protocol} payload is not valid text: {source}")]
    Decode {
        protocol: ProtocolKind,
        #[source]
        source: std::str::Utf8Error,
    },

    /// Payload could not be parsed (and no fallback applied)
    #[error("failed to parse {protocol} payload: {message}")]
    Parse {
        protocol: ProtocolKind,
        message: String,
    },

    /// Payload parsed but held no recognised field set
    #[error("unrecognised {protocol} payload shape: {message}")]
    Shape {
        protocol: ProtocolKind,
        message: String,
    },
}

impl IngestionError {
    /// Create parse error
    pub fn parse(protocol: ProtocolKind, message: impl Into<String>) -> Self {
        Self::Parse {
            protocol,
            message: message.into(),
        }
    }

    /// Create shape error
    pub fn shape(protocol: ProtocolKind, message: impl Into<String>) -> Self {
        Self::Shape {
            protocol,
            message: message.into(),
        }
    }

    /// Protocol of the offending message
    pub fn protocol(&self) -> ProtocolKind {
        match self {
            Self::Decode { protocol, .. }
            | Self::Parse { protocol, .. }
            | Self::Shape { protocol, .. } => *protocol,
        }
    }
}

/// Ingestion Result alias
pub type Result<T> = std::result::Result<T, IngestionError>;
