//! Envelope gateway normalizer
//!
//! `{"source_endpoint": "7", "data": {...}, "rx_time_ms_epoch": 12345}`.
//! The gateway's `rx_time_ms_epoch` is stored in the `rssi` column; this
//! mapping is kept as published by the gateway integration.

use contracts::{ProtocolKind, SourceAddress};
use serde_json::Value;

use super::common::{as_i64, expect_object, extract_fields, parse_json};
use crate::error::Result;
use crate::reading::{Normalized, Reading};

const PROTOCOL: ProtocolKind = ProtocolKind::GatewayEnvelope;
const UNKNOWN_ENDPOINT: &str = "unknown";

pub fn normalize(text: &str) -> Result<Normalized> {
    let value = parse_json(text, PROTOCOL)?;
    let envelope = expect_object(&value, PROTOCOL, "envelope")?;

    let endpoint = match envelope.get("source_endpoint") {
        Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        _ => UNKNOWN_ENDPOINT.to_string(),
    };

    let mut fields = match envelope.get("data") {
        None | Some(Value::Null) => Default::default(),
        Some(data) => extract_fields(expect_object(data, PROTOCOL, "envelope.data")?),
    };
    fields.rssi = envelope.get("rx_time_ms_epoch").and_then(as_i64);

    Ok(Normalized::Reading(Reading::new(
        PROTOCOL,
        SourceAddress::gateway_envelope(&endpoint),
        fields,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::IngestionError;

    #[test]
    fn test_envelope_example() {
        let reading = normalize(
            r#"{"source_endpoint":"7","data":{"temperature":21.0},"rx_time_ms_epoch":12345}"#,
        )
        .unwrap()
        .into_reading()
        .unwrap();
        assert_eq!(reading.address, "hetic_7");
        assert_eq!(reading.fields.temperature, Some(21.0));
        assert_eq!(reading.fields.rssi, Some(12345));
        assert_eq!(reading.fields.humidity, None);
    }

    #[test]
    fn test_numeric_endpoint() {
        let reading = normalize(r#"{"source_endpoint": 12, "data": {"humidity": 50}}"#)
            .unwrap()
            .into_reading()
            .unwrap();
        assert_eq!(reading.address, "hetic_12");
        assert_eq!(reading.fields.rssi, None);
    }

    #[test]
    fn test_missing_endpoint_is_unknown() {
        let reading = normalize(r#"{"data": {"pressure": 990}}"#)
            .unwrap()
            .into_reading()
            .unwrap();
        assert_eq!(reading.address, "hetic_unknown");
    }

    #[test]
    fn test_nested_rssi_is_replaced() {
        let reading = normalize(r#"{"source_endpoint":"1","data":{"temperature":1,"rssi":-40}}"#)
            .unwrap()
            .into_reading()
            .unwrap();
        assert_eq!(reading.fields.rssi, None);
    }

    #[test]
    fn test_missing_data_gives_empty_fields() {
        let reading = normalize(r#"{"source_endpoint":"1"}"#)
            .unwrap()
            .into_reading()
            .unwrap();
        assert!(!reading.fields.has_environmental());
    }

    #[test]
    fn test_data_not_an_object() {
        let err = normalize(r#"{"source_endpoint":"1","data":"00ff"}"#).unwrap_err();
        assert!(matches!(err, IngestionError::Shape { .. }));
    }
}
