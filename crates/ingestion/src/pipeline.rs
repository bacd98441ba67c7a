//! Ingestion entry point
//!
//! Topic Router + protocol-selected normalizer for one inbound message.

use std::sync::Arc;

use contracts::{InboundMessage, ProtocolKind};
use tracing::trace;

use crate::adapters::{envelope, mesh, packet, ruuvitag};
use crate::error::{IngestionError, Result};
use crate::metrics::IngestionMetrics;
use crate::reading::{Normalized, SkipReason};
use crate::router::{classify, Route};

/// Normalize one message.
///
/// Unknown and reserved topics are skipped before the payload is looked at;
/// an empty payload is skipped on every topic.
pub fn normalize_message(message: &InboundMessage) -> Result<Normalized> {
    let route = classify(&message.topic);
    let protocol = route.kind();

    match route {
        Route::Unknown => return Ok(Normalized::skipped(protocol, SkipReason::UnknownTopic)),
        Route::Reserved => return Ok(Normalized::skipped(protocol, SkipReason::ReservedTopic)),
        _ => {}
    }

    let text = std::str::from_utf8(&message.payload)
        .map_err(|source| IngestionError::Decode { protocol, source })?;
    if text.trim().is_empty() {
        return Ok(Normalized::skipped(protocol, SkipReason::EmptyPayload));
    }

    normalize_routed(route, text)
}

fn normalize_routed(route: Route<'_>, text: &str) -> Result<Normalized> {
    match route {
        Route::RuuviTagDirect { address, metric } => ruuvitag::normalize(text, address, metric),
        Route::GatewayEnvelope => envelope::normalize(text),
        Route::PacketGateway {
            timestamp,
            sink_id,
            address,
        } => {
            // the timestamp level is a hint only; receipt time stays canonical
            trace!(timestamp, sink_id, "packet gateway routing keys");
            packet::normalize(text, address)
        }
        Route::MeshGateway {
            network_id,
            source_address,
            destination_endpoint,
        } => {
            trace!(network_id, destination_endpoint, "mesh gateway routing keys");
            mesh::normalize(text, source_address)
        }
        Route::Reserved => Ok(Normalized::skipped(
            ProtocolKind::Unknown,
            SkipReason::ReservedTopic,
        )),
        Route::Unknown => Ok(Normalized::skipped(
            ProtocolKind::Unknown,
            SkipReason::UnknownTopic,
        )),
    }
}

/// Normalizer with shared counters
#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    metrics: Arc<IngestionMetrics>,
}

impl Normalizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalize and count the result
    pub fn normalize(&self, message: &InboundMessage) -> Result<Normalized> {
        let result = normalize_message(message);
        self.metrics.record(&result);
        result
    }

    pub fn metrics(&self) -> Arc<IngestionMetrics> {
        Arc::clone(&self.metrics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reading::Reading;
    use bytes::Bytes;

    fn message(topic: &str, payload: &'static [u8]) -> InboundMessage {
        InboundMessage::now(topic, Bytes::from_static(payload))
    }

    fn reading(topic: &str, payload: &'static [u8]) -> Reading {
        normalize_message(&message(topic, payload))
            .unwrap()
            .into_reading()
            .unwrap()
    }

    #[test]
    fn test_dispatch_by_route() {
        assert_eq!(
            reading("sensors/ruuvitag/AA/data", br#"{"temperature": 1}"#).address,
            "AA"
        );
        assert_eq!(
            reading("sensor/BB/data", br#"{"temperature": 1}"#).protocol,
            ProtocolKind::RuuviTagDirect
        );
        assert_eq!(
            reading("gw-event/received_data", br#"{"source_endpoint": "3", "data": {}}"#).address,
            "hetic_3"
        );
        assert_eq!(
            reading("pws-packet/1000/5/42", br#"{"humidity": 3}"#).address,
            "pws_42"
        );
        assert_eq!(
            reading("wirepas-json-event/packet/1/77/1", br#"{"data": {"pressure": 3}}"#).address,
            "wirepas_77"
        );
    }

    #[test]
    fn test_fallback_example() {
        let reading = reading("pws-packet/1000/5/42", br#""temp":23.5,"hum":60"#);
        assert_eq!(reading.fields.temperature, Some(23.5));
        assert_eq!(reading.fields.humidity, Some(60.0));
        assert_eq!(reading.fields.pressure, None);
    }

    #[test]
    fn test_empty_payload_skipped_on_every_topic() {
        for topic in [
            "sensors/ruuvitag/AA/data",
            "sensors/ruuvitag/AA/temperature",
            "sensor/AA/data",
            "gw-event/received_data",
            "pws-packet/1/2/3",
            "wirepas-json-event/packet/1/2/3",
            "gw-req/get_configs/res",
            "somewhere/else",
        ] {
            for payload in [&b""[..], &b"  \n"[..]] {
                let result =
                    normalize_message(&InboundMessage::now(topic, Bytes::from_static(payload)));
                assert!(
                    matches!(result, Ok(Normalized::Skipped { .. })),
                    "topic {topic}: {result:?}"
                );
            }
        }
    }

    #[test]
    fn test_unknown_topic_skipped() {
        let result = normalize_message(&message("home/kitchen", b"{}")).unwrap();
        assert_eq!(
            result,
            Normalized::skipped(ProtocolKind::Unknown, SkipReason::UnknownTopic)
        );
    }

    #[test]
    fn test_reserved_topic_skipped() {
        let result =
            normalize_message(&message("gw-req/get_configs/res", b"{\"cfg\": 1}")).unwrap();
        assert!(matches!(
            result,
            Normalized::Skipped {
                reason: SkipReason::ReservedTopic,
                ..
            }
        ));
    }

    #[test]
    fn test_invalid_utf8_is_decode_error() {
        let err = normalize_message(&message("sensor/AA/data", &[0xff, 0xfe, 0x00])).unwrap_err();
        assert!(matches!(err, IngestionError::Decode { .. }));
        assert_eq!(err.protocol(), ProtocolKind::RuuviTagDirect);
    }

    #[test]
    fn test_normalizer_counts() {
        let normalizer = Normalizer::new();
        normalizer.normalize(&message("sensor/AA/data", br#"{"temperature": 1}"#)).unwrap();
        normalizer.normalize(&message("unknown/topic", b"x")).unwrap();
        let _ = normalizer.normalize(&message("sensor/AA/data", b"{"));
        let _ = normalizer.normalize(&message("pws-packet/1/2/3", br#"{"x": 1}"#));
        let _ = normalizer.normalize(&message("sensor/AA/data", &[0xff]));

        let snapshot = normalizer.metrics().snapshot();
        assert_eq!(snapshot.messages_received, 5);
        assert_eq!(snapshot.readings, 1);
        assert_eq!(snapshot.skipped, 1);
        assert_eq!(snapshot.parse_errors, 1);
        assert_eq!(snapshot.shape_errors, 1);
        assert_eq!(snapshot.decode_errors, 1);
        assert_eq!(snapshot.errors(), 3);
    }
}
