//! Dispatcher error types

use contracts::{ContractError, ProtocolKind, SourceAddress};
use ingestion::IngestionError;
use observability::MessageOutcome;
use thiserror::Error;

/// Failure of a single message on its way to the store
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Normalization failed (decode / parse / shape)
    #[error(transparent)]
    Ingestion(#[from] IngestionError),

    /// Store rejected an upsert or append
    #[error("persistence failed for {address}: {source}")]
    Persistence {
        protocol: ProtocolKind,
        address: SourceAddress,
        #[source]
        source: ContractError,
    },
}

impl DispatchError {
    /// Create persistence error
    pub fn persistence(
        protocol: ProtocolKind,
        address: SourceAddress,
        source: ContractError,
    ) -> Self {
        Self::Persistence {
            protocol,
            address,
            source,
        }
    }

    /// Protocol of the offending message
    pub fn protocol(&self) -> ProtocolKind {
        match self {
            Self::Ingestion(e) => e.protocol(),
            Self::Persistence { protocol, .. } => *protocol,
        }
    }

    /// Metrics outcome label for this error
    pub fn outcome(&self) -> MessageOutcome {
        match self {
            Self::Ingestion(IngestionError::Decode { .. }) => MessageOutcome::DecodeError,
            Self::Ingestion(IngestionError::Parse { .. }) => MessageOutcome::ParseError,
            Self::Ingestion(IngestionError::Shape { .. }) => MessageOutcome::ShapeError,
            Self::Persistence { .. } => MessageOutcome::PersistenceError,
        }
    }
}

/// Dispatcher Result alias
pub type Result<T> = std::result::Result<T, DispatchError>;
