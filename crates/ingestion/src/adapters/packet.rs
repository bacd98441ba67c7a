//! Packet gateway normalizer
//!
//! The packet gateway publishes several JSON layouts. The field set is
//! located by ordered shape detection:
//!
//! 1. a top-level `temperature`/`humidity`/`pressure` key: the object itself
//! 2. a `data` key holding an object: that object
//! 3. a `payload` key: its value
//! 4. a `sink_id` key: explicit lookup of a fixed key set at top level
//! 5. otherwise the object as-is
//!
//! Payloads that are not JSON go through the key:value fallback parser.

use contracts::{MeasurementFields, ProtocolKind, SourceAddress};
use serde_json::Value;
use tracing::trace;

use super::common::{expect_object, extract_fields, f64_field, i64_field, kind_of, Object};
use super::fallback;
use crate::error::{IngestionError, Result};
use crate::reading::{Normalized, Reading};

const PROTOCOL: ProtocolKind = ProtocolKind::PacketGateway;

/// Layout detected in a packet gateway object
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PacketShape<'v> {
    /// Fields at top level
    Flat(&'v Object),
    /// Fields under `data`
    Nested(&'v Object),
    /// Fields under `payload` (any JSON value)
    Wrapped(&'v Value),
    /// Sink envelope with a fixed key set at top level
    SinkEnvelope(&'v Object),
    /// No recognised marker
    Raw(&'v Object),
}

/// Apply the ordered shape rules
pub fn detect_shape(object: &Object) -> PacketShape<'_> {
    if ["temperature", "humidity", "pressure"]
        .iter()
        .any(|key| object.contains_key(*key))
    {
        return PacketShape::Flat(object);
    }
    if let Some(Value::Object(data)) = object.get("data") {
        return PacketShape::Nested(data);
    }
    if let Some(payload) = object.get("payload") {
        return PacketShape::Wrapped(payload);
    }
    if object.contains_key("sink_id") {
        return PacketShape::SinkEnvelope(object);
    }
    PacketShape::Raw(object)
}

pub fn normalize(text: &str, address: &str) -> Result<Normalized> {
    let fields = match serde_json::from_str::<Value>(text) {
        Ok(value) => {
            let object = expect_object(&value, PROTOCOL, "packet")?;
            fields_from_shape(detect_shape(object))?
        }
        Err(e) => fields_from_raw(text, &e.to_string())?,
    };

    if fields.is_empty() {
        return Err(IngestionError::shape(PROTOCOL, "no recognised field in packet"));
    }

    Ok(Normalized::Reading(Reading::new(
        PROTOCOL,
        SourceAddress::packet_gateway(address),
        fields,
    )))
}

fn fields_from_shape(shape: PacketShape<'_>) -> Result<MeasurementFields> {
    trace!(?shape, "packet shape detected");
    match shape {
        PacketShape::Flat(object) | PacketShape::Nested(object) | PacketShape::Raw(object) => {
            Ok(extract_fields(object))
        }
        PacketShape::SinkEnvelope(object) => Ok(sink_envelope_fields(object)),
        PacketShape::Wrapped(Value::Object(object)) => Ok(extract_fields(object)),
        // some firmware double-encodes the payload as a string
        PacketShape::Wrapped(Value::String(inner)) => match serde_json::from_str::<Value>(inner) {
            Ok(Value::Object(object)) => Ok(extract_fields(&object)),
            Ok(other) => Err(IngestionError::shape(
                PROTOCOL,
                format!("packet.payload holds {}", kind_of(&other)),
            )),
            Err(e) => fields_from_raw(inner, &e.to_string()),
        },
        PacketShape::Wrapped(other) => Err(IngestionError::shape(
            PROTOCOL,
            format!("packet.payload is {}, expected an object", kind_of(other)),
        )),
    }
}

fn sink_envelope_fields(object: &Object) -> MeasurementFields {
    MeasurementFields {
        temperature: f64_field(object, "temperature"),
        humidity: f64_field(object, "humidity"),
        pressure: f64_field(object, "pressure"),
        battery_voltage: f64_field(object, "battery_voltage"),
        rssi: i64_field(object, "rssi"),
        ..Default::default()
    }
}

fn fields_from_raw(text: &str, json_error: &str) -> Result<MeasurementFields> {
    if !fallback::applies(text) {
        return Err(IngestionError::parse(PROTOCOL, json_error));
    }
    let fields = fallback::parse_key_values(text);
    if fields.is_empty() {
        return Err(IngestionError::parse(
            PROTOCOL,
            format!("fallback parser recovered no field ({json_error})"),
        ));
    }
    Ok(fields)
}
