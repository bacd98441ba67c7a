//! Mesh gateway normalizer
//!
//! Telemetry lives in the nested `data` object; `rssi` is read from the
//! packet itself. Packets without data, or whose data carries
//! `trace_options`, are network diagnostics and are skipped.

use contracts::{ProtocolKind, SourceAddress};
use serde_json::Value;

use super::common::{as_i64, expect_object, extract_fields, parse_json};
use crate::error::Result;
use crate::reading::{Normalized, Reading, SkipReason};

const PROTOCOL: ProtocolKind = ProtocolKind::MeshGateway;

pub fn normalize(text: &str, source_address: &str) -> Result<Normalized> {
    let value = parse_json(text, PROTOCOL)?;
    let packet = expect_object(&value, PROTOCOL, "packet")?;

    let data = match packet.get("data") {
        None | Some(Value::Null) => {
            return Ok(Normalized::skipped(PROTOCOL, SkipReason::MeshNoData));
        }
        Some(data) => expect_object(data, PROTOCOL, "packet.data")?,
    };
    if data.is_empty() {
        return Ok(Normalized::skipped(PROTOCOL, SkipReason::MeshNoData));
    }
    if data.contains_key("trace_options") {
        return Ok(Normalized::skipped(PROTOCOL, SkipReason::MeshDiagnostic));
    }

    let mut fields = extract_fields(data);
    fields.rssi = packet.get("rssi").and_then(as_i64);

    Ok(Normalized::Reading(Reading::new(
        PROTOCOL,
        SourceAddress::mesh_gateway(source_address),
        fields,
    )))
}
