//! Adapter common utility functions

use contracts::{MeasurementFields, ProtocolKind};
use serde_json::{Map, Value};

use crate::error::{IngestionError, Result};

/// JSON object
pub type Object = Map<String, Value>;

/// Parse text as JSON
pub fn parse_json(text: &str, protocol: ProtocolKind) -> Result<Value> {
    serde_json::from_str(text).map_err(|e| IngestionError::parse(protocol, e.to_string()))
}

/// Require a JSON object
pub fn expect_object<'v>(
    value: &'v Value,
    protocol: ProtocolKind,
    what: &str,
) -> Result<&'v Object> {
    value.as_object().ok_or_else(|| {
        IngestionError::shape(protocol, format!("{what} is {}, expected an object", kind_of(value)))
    })
}

/// Numeric value: JSON numbers and numeric strings; non-finite rejected
pub fn as_f64(value: &Value) -> Option<f64> {
    let v = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    v.is_finite().then_some(v)
}

/// Integer value; floats are accepted when they carry no fraction
pub fn as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(whole_f64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(whole_f64))
        }
        _ => None,
    }
}

fn whole_f64(v: f64) -> Option<i64> {
    (v.is_finite() && v.fract() == 0.0 && v.abs() < i64::MAX as f64).then_some(v as i64)
}

pub fn f64_field(object: &Object, key: &str) -> Option<f64> {
    object.get(key).and_then(as_f64)
}

pub fn i64_field(object: &Object, key: &str) -> Option<i64> {
    object.get(key).and_then(as_i64)
}

/// Extract every recognised measurement key from an object
pub fn extract_fields(object: &Object) -> MeasurementFields {
    MeasurementFields {
        temperature: f64_field(object, "temperature"),
        humidity: f64_field(object, "humidity"),
        pressure: f64_field(object, "pressure"),
        acceleration_x: f64_field(object, "acceleration_x"),
        acceleration_y: f64_field(object, "acceleration_y"),
        acceleration_z: f64_field(object, "acceleration_z"),
        rssi: i64_field(object, "rssi"),
        battery_voltage: f64_field(object, "battery_voltage"),
        movement_counter: i64_field(object, "movement_counter"),
    }
}

/// JSON type name for error messages
pub fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_numeric_strings_accepted() {
        assert_eq!(as_f64(&json!("21.5")), Some(21.5));
        assert_eq!(as_f64(&json!(" 3 ")), Some(3.0));
        assert_eq!(as_f64(&json!("warm")), None);
        assert_eq!(as_f64(&json!("NaN")), None);
        assert_eq!(as_f64(&Value::Null), None);
    }

    #[test]
    fn test_integers() {
        assert_eq!(as_i64(&json!(-70)), Some(-70));
        assert_eq!(as_i64(&json!(-70.0)), Some(-70));
        assert_eq!(as_i64(&json!(-70.5)), None);
        assert_eq!(as_i64(&json!("12345")), Some(12345));
        assert_eq!(as_i64(&json!(1_700_000_000_000_i64)), Some(1_700_000_000_000));
    }

    #[test]
    fn test_extract_fields_ignores_unknown_and_null() {
        let value = json!({
            "temperature": 0.0,
            "humidity": null,
            "rssi": -60,
            "movement_counter": 7,
            "colour": "blue"
        });
        let fields = extract_fields(value.as_object().unwrap());
        assert_eq!(fields.temperature, Some(0.0));
        assert_eq!(fields.humidity, None);
        assert_eq!(fields.rssi, Some(-60));
        assert_eq!(fields.movement_counter, Some(7));
        assert_eq!(fields.populated(), 3);
    }

    #[test]
    fn test_expect_object_reports_kind() {
        let err = expect_object(&json!([1, 2]), ProtocolKind::MeshGateway, "payload").unwrap_err();
        assert!(err.to_string().contains("an array"), "got: {err}");
    }
}
