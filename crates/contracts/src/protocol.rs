//! Gateway protocol families

use serde::{Deserialize, Serialize};
use std::fmt;

/// Protocol family a topic belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProtocolKind {
    /// Direct BLE-relay RuuviTag (`sensors/+/+/+`, `sensor/+/data`)
    RuuviTagDirect,
    /// Envelope gateway (`gw-event/received_data`)
    GatewayEnvelope,
    /// Packet gateway (`pws-packet/+/+/+`)
    PacketGateway,
    /// Mesh gateway (`wirepas-json-event/packet/+/+/+`)
    MeshGateway,
    /// Anything else
    Unknown,
}

impl ProtocolKind {
    /// Stable label used in logs and metrics
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RuuviTagDirect => "ruuvitag_direct",
            Self::GatewayEnvelope => "gateway_envelope",
            Self::PacketGateway => "packet_gateway",
            Self::MeshGateway => "mesh_gateway",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ProtocolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
