//! Document-store values as they arrive on the wire.
//!
//! The document store encodes every field as a single-key JSON object whose
//! key names the value type, e.g. `{"stringValue": "u1"}` or
//! `{"timestampValue": "2024-03-01T09:00:00Z"}`. [`Value`] decodes that
//! representation into a typed tree. A value object carrying no recognized
//! type tag decodes to [`Value::Unset`], the equivalent of a missing value.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Deserialize;
use serde_json::{Map, Value as Json};

use crate::error::CoreError;
use crate::types::Timestamp;

/// The field map of a document or of a nested map value.
pub type Fields = BTreeMap<String, Value>;

/// A latitude/longitude pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

/// A dynamically typed document value.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "serde_json::Value")]
pub enum Value {
    /// No type tag was present.
    Unset,
    Null,
    Boolean(bool),
    Integer(i64),
    Double(f64),
    Timestamp(Timestamp),
    String(String),
    /// Base64 text exactly as received.
    Bytes(String),
    /// Full path of the referenced document.
    Reference(String),
    GeoPoint(GeoPoint),
    Array(Vec<Value>),
    Map(Fields),
}

impl Value {
    /// True for anything other than `Null` and `Unset`.
    pub fn is_present(&self) -> bool {
        !matches!(self, Value::Null | Value::Unset)
    }

    /// Read a scalar as text.
    ///
    /// Maps, arrays, nulls, unset values and empty strings yield `None`.
    pub fn as_text(&self) -> Option<String> {
        match self {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Integer(i) => Some(i.to_string()),
            Value::Double(f) if f.is_finite() => Some(f.to_string()),
            Value::Boolean(b) => Some(b.to_string()),
            Value::Reference(path) => Some(path.clone()),
            _ => None,
        }
    }

    /// Interpret the value as a point in time.
    ///
    /// Accepts native timestamps, ISO-8601 strings (with or without an
    /// offset, or a bare date) and numbers as epoch milliseconds. Zero and
    /// empty strings count as absent.
    pub fn as_timestamp(&self) -> Option<Timestamp> {
        match self {
            Value::Timestamp(ts) => Some(*ts),
            Value::String(s) => parse_timestamp_text(s),
            Value::Integer(ms) if *ms != 0 => DateTime::from_timestamp_millis(*ms),
            Value::Double(ms) if ms.is_finite() && *ms != 0.0 => {
                DateTime::from_timestamp_millis(ms.trunc() as i64)
            }
            _ => None,
        }
    }
}

fn parse_timestamp_text(text: &str) -> Option<Timestamp> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
        return Some(ts.with_timezone(&Utc));
    }
    // Offset-less forms are read as UTC.
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

// ---------------------------------------------------------------------------
// Wire decoding
// ---------------------------------------------------------------------------

impl TryFrom<Json> for Value {
    type Error = CoreError;

    fn try_from(wire: Json) -> Result<Self, Self::Error> {
        let Json::Object(mut object) = wire else {
            return Err(CoreError::InvalidValue {
                tag: "document",
                reason: "expected a JSON object".to_string(),
            });
        };

        if object.contains_key("nullValue") {
            return Ok(Value::Null);
        }
        if let Some(raw) = object.remove("booleanValue") {
            return raw
                .as_bool()
                .map(Value::Boolean)
                .ok_or_else(|| invalid("booleanValue", &raw));
        }
        if let Some(raw) = object.remove("integerValue") {
            return decode_integer(&raw)
                .map(Value::Integer)
                .ok_or_else(|| invalid("integerValue", &raw));
        }
        if let Some(raw) = object.remove("doubleValue") {
            return decode_double(&raw)
                .map(Value::Double)
                .ok_or_else(|| invalid("doubleValue", &raw));
        }
        if let Some(raw) = object.remove("timestampValue") {
            return raw
                .as_str()
                .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                .map(|ts| Value::Timestamp(ts.with_timezone(&Utc)))
                .ok_or_else(|| invalid("timestampValue", &raw));
        }
        if let Some(raw) = object.remove("stringValue") {
            return match raw {
                Json::String(s) => Ok(Value::String(s)),
                other => Err(invalid("stringValue", &other)),
            };
        }
        if let Some(raw) = object.remove("bytesValue") {
            return match raw {
                Json::String(s) => Ok(Value::Bytes(s)),
                other => Err(invalid("bytesValue", &other)),
            };
        }
        if let Some(raw) = object.remove("referenceValue") {
            return match raw {
                Json::String(s) => Ok(Value::Reference(s)),
                other => Err(invalid("referenceValue", &other)),
            };
        }
        if let Some(raw) = object.remove("geoPointValue") {
            return decode_geo_point(&raw)
                .map(Value::GeoPoint)
                .ok_or_else(|| invalid("geoPointValue", &raw));
        }
        if let Some(raw) = object.remove("arrayValue") {
            return decode_array(raw).map(Value::Array);
        }
        if let Some(raw) = object.remove("mapValue") {
            return decode_map(raw).map(Value::Map);
        }

        Ok(Value::Unset)
    }
}

/// Decode a `fields` object into a [`Fields`] map.
pub fn decode_fields(raw: Map<String, Json>) -> Result<Fields, CoreError> {
    raw.into_iter()
        .map(|(key, value)| Value::try_from(value).map(|decoded| (key, decoded)))
        .collect()
}

fn invalid(tag: &'static str, raw: &Json) -> CoreError {
    CoreError::InvalidValue {
        tag,
        reason: format!("unexpected payload {raw}"),
    }
}

/// 64-bit integers travel as decimal strings; plain numbers are accepted too.
fn decode_integer(raw: &Json) -> Option<i64> {
    match raw {
        Json::String(s) => s.trim().parse().ok(),
        Json::Number(n) => n.as_i64(),
        _ => None,
    }
}

fn decode_double(raw: &Json) -> Option<f64> {
    match raw {
        Json::Number(n) => n.as_f64(),
        Json::String(s) => match s.as_str() {
            "NaN" => Some(f64::NAN),
            "Infinity" => Some(f64::INFINITY),
            "-Infinity" => Some(f64::NEG_INFINITY),
            other => other.parse().ok(),
        },
        _ => None,
    }
}

/// Zero coordinates are omitted on the wire.
fn decode_geo_point(raw: &Json) -> Option<GeoPoint> {
    let object = raw.as_object()?;
    let coordinate = |key: &str| match object.get(key) {
        None => Some(0.0),
        Some(value) => value.as_f64(),
    };
    Some(GeoPoint {
        latitude: coordinate("latitude")?,
        longitude: coordinate("longitude")?,
    })
}

fn decode_array(raw: Json) -> Result<Vec<Value>, CoreError> {
    let Json::Object(mut object) = raw else {
        return Err(invalid("arrayValue", &raw));
    };
    match object.remove("values") {
        None | Some(Json::Null) => Ok(Vec::new()),
        Some(Json::Array(values)) => values.into_iter().map(Value::try_from).collect(),
        Some(other) => Err(invalid("arrayValue", &other)),
    }
}

fn decode_map(raw: Json) -> Result<Fields, CoreError> {
    let Json::Object(mut object) = raw else {
        return Err(invalid("mapValue", &raw));
    };
    match object.remove("fields") {
        None | Some(Json::Null) => Ok(Fields::new()),
        Some(Json::Object(fields)) => decode_fields(fields),
        Some(other) => Err(invalid("mapValue", &other)),
    }
}
