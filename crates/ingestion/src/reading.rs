//! Normalizer output

use contracts::{MeasurementFields, ProtocolKind, SourceAddress};

/// Canonical reading produced by a normalizer
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    /// Protocol family the message came from
    pub protocol: ProtocolKind,
    /// Canonical, protocol-prefixed address
    pub address: SourceAddress,
    /// Extracted fields (all optional)
    pub fields: MeasurementFields,
}

impl Reading {
    pub fn new(protocol: ProtocolKind, address: SourceAddress, fields: MeasurementFields) -> Self {
        Self {
            protocol,
            address,
            fields,
        }
    }
}

/// Recognised no-op messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Topic matched no routing rule
    UnknownTopic,
    /// Subscribed topic reserved for future use
    ReservedTopic,
    /// Empty or whitespace-only payload
    EmptyPayload,
    /// Mesh packet carrying `trace_options` (diagnostics)
    MeshDiagnostic,
    /// Mesh packet without a `data` object
    MeshNoData,
}

impl SkipReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::UnknownTopic => "unknown_topic",
            Self::ReservedTopic => "reserved_topic",
            Self::EmptyPayload => "empty_payload",
            Self::MeshDiagnostic => "mesh_diagnostic",
            Self::MeshNoData => "mesh_no_data",
        }
    }
}

/// Result of normalizing one message
#[derive(Debug, Clone, PartialEq)]
pub enum Normalized {
    Reading(Reading),
    Skipped {
        protocol: ProtocolKind,
        reason: SkipReason,
    },
}

impl Normalized {
    pub fn skipped(protocol: ProtocolKind, reason: SkipReason) -> Self {
        Self::Skipped { protocol, reason }
    }

    pub fn protocol(&self) -> ProtocolKind {
        match self {
            Self::Reading(reading) => reading.protocol,
            Self::Skipped { protocol, .. } => *protocol,
        }
    }

    /// The reading, if any
    pub fn into_reading(self) -> Option<Reading> {
        match self {
            Self::Reading(reading) => Some(reading),
            Self::Skipped { .. } => None,
        }
    }
}
