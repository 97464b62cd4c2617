//! Sync metadata carried by every mirrored row.

use serde::Serialize;

use crate::aliases::{SOURCE, UPDATED_AT, VERSION};
use crate::conflict::Recency;
use crate::types::Timestamp;
use crate::value::{Fields, Value};

/// Source recorded when the document does not name one.
pub const DEFAULT_SOURCE: &str = "firebase";

/// Version assumed when the document carries no usable one.
pub const DEFAULT_VERSION: i64 = 1;

/// `version`, `source` and `updated_at` for one document write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncMetadata {
    pub version: i64,
    pub source: String,
    pub updated_at: Timestamp,
}

impl SyncMetadata {
    /// Resolve metadata from a document payload.
    ///
    /// `updated_at` is the first of: the payload's `updated_at`, its
    /// `updatedAt`, the store-assigned `update_time`, the `fallback`
    /// timestamp, and finally `now`.
    pub fn resolve(
        fields: &Fields,
        update_time: Option<Timestamp>,
        fallback: Option<Timestamp>,
        now: Timestamp,
    ) -> Self {
        let updated_at = UPDATED_AT
            .timestamp(fields)
            .or(update_time)
            .or(fallback)
            .unwrap_or(now);

        Self {
            version: coerce_version(VERSION.value(fields)),
            source: coerce_source(SOURCE.value(fields)),
            updated_at,
        }
    }

    /// The `(updated_at, version)` key compared by the conflict rule.
    pub fn recency(&self) -> Recency {
        Recency {
            updated_at: self.updated_at,
            version: self.version,
        }
    }
}

fn coerce_version(value: Option<&Value>) -> i64 {
    let parsed = match value {
        Some(Value::Integer(v)) => Some(*v),
        Some(Value::Double(v)) if v.fract() == 0.0 && *v >= 1.0 && *v <= i64::MAX as f64 => {
            Some(*v as i64)
        }
        Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    parsed.filter(|v| *v > 0).unwrap_or(DEFAULT_VERSION)
}

fn coerce_source(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
        _ => DEFAULT_SOURCE.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn fields(entries: Vec<(&str, Value)>) -> Fields {
        entries
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect()
    }

    fn at(hour: u32) -> Timestamp {
        Utc.with_ymd_and_hms(2024, 3, 1, hour, 0, 0).unwrap()
    }

    #[test]
    fn defaults_when_payload_is_empty() {
        let meta = SyncMetadata::resolve(&Fields::new(), None, None, at(12));
        assert_eq!(meta.version, 1);
        assert_eq!(meta.source, "firebase");
        assert_eq!(meta.updated_at, at(12));
    }

    #[test]
    fn snake_case_updated_at_takes_priority() {
        let doc = fields(vec![
            ("updated_at", Value::Timestamp(at(1))),
            ("updatedAt", Value::Timestamp(at(2))),
        ]);
        let meta = SyncMetadata::resolve(&doc, Some(at(3)), Some(at(4)), at(5));
        assert_eq!(meta.updated_at, at(1));
    }

    #[test]
    fn store_update_time_then_fallback_then_now() {
        let doc = Fields::new();
        assert_eq!(
            SyncMetadata::resolve(&doc, Some(at(3)), Some(at(4)), at(5)).updated_at,
            at(3)
        );
        assert_eq!(
            SyncMetadata::resolve(&doc, None, Some(at(4)), at(5)).updated_at,
            at(4)
        );
    }

    #[test]
    fn unparsable_updated_at_is_ignored() {
        let doc = fields(vec![("updatedAt", Value::String("soon".into()))]);
        let meta = SyncMetadata::resolve(&doc, Some(at(3)), None, at(5));
        assert_eq!(meta.updated_at, at(3));
    }

    #[test]
    fn version_coercion() {
        let cases = [
            (Value::Integer(4), 4),
            (Value::Double(3.0), 3),
            (Value::Double(2.5), 1),
            (Value::String(" 7 ".into()), 7),
            (Value::String("seven".into()), 1),
            (Value::Integer(0), 1),
            (Value::Integer(-2), 1),
            (Value::Boolean(true), 1),
        ];
        for (value, expected) in cases {
            let doc = fields(vec![("version", value.clone())]);
            let meta = SyncMetadata::resolve(&doc, None, None, at(0));
            assert_eq!(meta.version, expected, "version from {value:?}");
        }
    }

    #[test]
    fn source_is_trimmed_or_defaulted() {
        let doc = fields(vec![("source", Value::String("  web ".into()))]);
        assert_eq!(SyncMetadata::resolve(&doc, None, None, at(0)).source, "web");

        let doc = fields(vec![("source", Value::String("   ".into()))]);
        assert_eq!(
            SyncMetadata::resolve(&doc, None, None, at(0)).source,
            "firebase"
        );
    }
}
