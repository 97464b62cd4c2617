//! Conversion of document values into JSON-safe data.
//!
//! Rules:
//! - unset values disappear from maps; an explicit null stays null
//! - arrays keep their order, an unset element becomes null
//! - timestamps become ISO-8601 strings in UTC with millisecond precision
//! - non-finite doubles become null

use chrono::SecondsFormat;
use serde_json::{json, Map, Number, Value as Json};

use crate::types::Timestamp;
use crate::value::{Fields, Value};

/// Serialize a single value. Returns `None` for [`Value::Unset`].
pub fn serialize_value(value: &Value) -> Option<Json> {
    let json = match value {
        Value::Unset => return None,
        Value::Null => Json::Null,
        Value::Boolean(b) => Json::Bool(*b),
        Value::Integer(i) => Json::from(*i),
        Value::Double(f) => Number::from_f64(*f).map_or(Json::Null, Json::Number),
        Value::Timestamp(ts) => Json::String(iso_timestamp(ts)),
        Value::String(s) | Value::Bytes(s) | Value::Reference(s) => Json::String(s.clone()),
        Value::GeoPoint(point) => json!({
            "latitude": point.latitude,
            "longitude": point.longitude,
        }),
        Value::Array(items) => Json::Array(
            items
                .iter()
                .map(|item| serialize_value(item).unwrap_or(Json::Null))
                .collect(),
        ),
        Value::Map(fields) => Json::Object(serialize_fields(fields)),
    };
    Some(json)
}

/// Serialize a field map, dropping unset entries.
pub fn serialize_fields(fields: &Fields) -> Map<String, Json> {
    fields
        .iter()
        .filter_map(|(key, value)| serialize_value(value).map(|json| (key.clone(), json)))
        .collect()
}

/// `2024-03-01T09:00:00.000Z`
pub fn iso_timestamp(ts: &Timestamp) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}
