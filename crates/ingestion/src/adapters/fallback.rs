//! Raw key:value fallback parser
//!
//! For packet gateway payloads that are not valid JSON but look like
//! `temp:23.5,hum:60`. Each segment is parsed on its own; a bad segment is
//! skipped without discarding the others.

use contracts::MeasurementFields;

/// Characters stripped from keys and values around the separators
const TRIM: &[char] = &['"', '\'', '{', '}', '[', ']'];

/// Whether the text is eligible for the fallback parser
pub fn applies(text: &str) -> bool {
    text.contains(':') && text.contains(',')
}

/// Recover environmental fields from `key:value` segments
pub fn parse_key_values(text: &str) -> MeasurementFields {
    let mut fields = MeasurementFields::default();

    for segment in text.split(',') {
        let Some((key, value)) = segment.split_once(':') else {
            continue;
        };
        let key = clean(key).to_lowercase();
        let Ok(value) = clean(value).parse::<f64>() else {
            continue;
        };
        if !value.is_finite() {
            continue;
        }

        match key.as_str() {
            "temp" | "temperature" => fields.temperature = Some(value),
            "hum" | "humidity" => fields.humidity = Some(value),
            "press" | "pressure" => fields.pressure = Some(value),
            _ => {}
        }
    }

    fields
}

fn clean(s: &str) -> &str {
    s.trim().trim_matches(TRIM).trim()
}
