//! Direct RuuviTag normalizer
//!
//! `data` topics carry a full JSON object; single-metric topics carry a
//! bare float.

use contracts::{MeasurementFields, ProtocolKind, SourceAddress};

use super::common::{expect_object, extract_fields, parse_json};
use crate::error::{IngestionError, Result};
use crate::reading::{Normalized, Reading};
use crate::router::DirectMetric;

const PROTOCOL: ProtocolKind = ProtocolKind::RuuviTagDirect;

pub fn normalize(text: &str, address: &str, metric: DirectMetric<'_>) -> Result<Normalized> {
    let fields = match metric {
        DirectMetric::Data => {
            let value = parse_json(text, PROTOCOL)?;
            extract_fields(expect_object(&value, PROTOCOL, "payload")?)
        }
        single => single_metric(text, single)?,
    };

    Ok(Normalized::Reading(Reading::new(
        PROTOCOL,
        SourceAddress::ruuvitag(address),
        fields,
    )))
}

/// Bare float on a single-metric topic; only that field is populated.
///
/// Metrics without a matching field (acceleration, unknown names) produce
/// an empty field set.
fn single_metric(text: &str, metric: DirectMetric<'_>) -> Result<MeasurementFields> {
    let value = text
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| {
            IngestionError::parse(PROTOCOL, format!("expected a number, got {text:?}"))
        })?;

    let mut fields = MeasurementFields::default();
    match metric {
        DirectMetric::Temperature => fields.temperature = Some(value),
        DirectMetric::Humidity => fields.humidity = Some(value),
        DirectMetric::Pressure => fields.pressure = Some(value),
        DirectMetric::Battery => fields.battery_voltage = Some(value),
        DirectMetric::Acceleration | DirectMetric::Other(_) | DirectMetric::Data => {}
    }
    Ok(fields)
}
