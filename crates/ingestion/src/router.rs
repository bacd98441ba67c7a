//! Topic Router
//!
//! Classifies a topic into a protocol family once, extracting the routing
//! keys each normalizer needs. Matching is done on slice patterns over the
//! topic levels, so a short topic simply fails to match a rule.

use contracts::ProtocolKind;

/// Metric segment of a `sensors/<family>/<addr>/<metric>` topic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectMetric<'a> {
    /// Full JSON object
    Data,
    Temperature,
    Humidity,
    Pressure,
    Battery,
    Acceleration,
    /// Any other single-value metric name
    Other(&'a str),
}

impl<'a> DirectMetric<'a> {
    fn from_segment(segment: &'a str) -> Self {
        match segment {
            "data" => Self::Data,
            "temperature" => Self::Temperature,
            "humidity" => Self::Humidity,
            "pressure" => Self::Pressure,
            "battery" => Self::Battery,
            "acceleration" => Self::Acceleration,
            other => Self::Other(other),
        }
    }
}

/// Classified topic with its routing keys
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route<'a> {
    /// `sensors/<family>/<addr>/<metric>` or `sensor/<addr>/data`
    RuuviTagDirect {
        address: &'a str,
        metric: DirectMetric<'a>,
    },
    /// `gw-event/received_data`; the address is in the payload
    GatewayEnvelope,
    /// `pws-packet/<timestamp>/<sinkId>/<addr>`
    PacketGateway {
        timestamp: &'a str,
        sink_id: &'a str,
        address: &'a str,
    },
    /// `wirepas-json-event/packet/<networkId>/<sourceAddr>/<destEndpoint>`
    MeshGateway {
        network_id: &'a str,
        source_address: &'a str,
        destination_endpoint: &'a str,
    },
    /// `gw-req/get_configs/res`: subscribed, not processed
    Reserved,
    Unknown,
}

impl Route<'_> {
    /// Protocol family of the route
    pub fn kind(&self) -> ProtocolKind {
        match self {
            Self::RuuviTagDirect { .. } => ProtocolKind::RuuviTagDirect,
            Self::GatewayEnvelope => ProtocolKind::GatewayEnvelope,
            Self::PacketGateway { .. } => ProtocolKind::PacketGateway,
            Self::MeshGateway { .. } => ProtocolKind::MeshGateway,
            Self::Reserved | Self::Unknown => ProtocolKind::Unknown,
        }
    }
}

/// Classify a topic.
///
/// Rules are prefix rules: extra trailing levels are ignored. An empty
/// address level never matches.
pub fn classify(topic: &str) -> Route<'_> {
    let levels: Vec<&str> = topic.split('/').collect();

    match levels[..] {
        ["sensors", _family, address, metric, ..] if !address.is_empty() => {
            Route::RuuviTagDirect {
                address,
                metric: DirectMetric::from_segment(metric),
            }
        }
        ["gw-event", "received_data", ..] => Route::GatewayEnvelope,
        ["gw-req", "get_configs", "res", ..] => Route::Reserved,
        ["sensor", address, "data", ..] if !address.is_empty() => Route::RuuviTagDirect {
            address,
            metric: DirectMetric::Data,
        },
        ["pws-packet", timestamp, sink_id, address, ..] if !address.is_empty() => {
            Route::PacketGateway {
                timestamp,
                sink_id,
                address,
            }
        }
        ["wirepas-json-event", "packet", network_id, source_address, destination_endpoint, ..]
            if !source_address.is_empty() =>
        {
            Route::MeshGateway {
                network_id,
                source_address,
                destination_endpoint,
            }
        }
        _ => Route::Unknown,
    }
}
