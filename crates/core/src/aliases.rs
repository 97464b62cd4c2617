//! Field-name synonyms.
//!
//! Documents are written by several clients that disagree on casing
//! (`userId` vs `user_id`). Each logical field carries its ordered list of
//! candidate names; lookups walk the list and take the first usable value.

use crate::types::Timestamp;
use crate::value::{Fields, Value};

/// Ordered candidate names for one logical field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldAliases {
    candidates: &'static [&'static str],
}

pub const USER_ID: FieldAliases = FieldAliases::new(&["userId", "user_id"]);
pub const COURSE_ID: FieldAliases =
    FieldAliases::new(&["courseId", "course_id", "classId", "sessionId"]);
pub const STATUS: FieldAliases = FieldAliases::new(&["status"]);
pub const TS_UTC: FieldAliases = FieldAliases::new(&["tsUtc", "ts_utc", "capturedAt", "timestamp"]);
pub const EMAIL: FieldAliases = FieldAliases::new(&["email"]);
pub const DISPLAY_NAME: FieldAliases = FieldAliases::new(&["displayName", "display_name"]);
pub const ROLE: FieldAliases = FieldAliases::new(&["role"]);
pub const UPDATED_AT: FieldAliases = FieldAliases::new(&["updated_at", "updatedAt"]);
pub const VERSION: FieldAliases = FieldAliases::new(&["version"]);
pub const SOURCE: FieldAliases = FieldAliases::new(&["source"]);

impl FieldAliases {
    pub const fn new(candidates: &'static [&'static str]) -> Self {
        Self { candidates }
    }

    pub fn candidates(&self) -> &'static [&'static str] {
        self.candidates
    }

    /// First candidate holding something other than null/unset.
    pub fn value<'a>(&self, fields: &'a Fields) -> Option<&'a Value> {
        self.values(fields).next()
    }

    /// First candidate that reads as non-empty text.
    pub fn text(&self, fields: &Fields) -> Option<String> {
        self.values(fields).find_map(Value::as_text)
    }

    /// First candidate that reads as a timestamp.
    pub fn timestamp(&self, fields: &Fields) -> Option<Timestamp> {
        self.values(fields).find_map(Value::as_timestamp)
    }

    fn values<'a>(&self, fields: &'a Fields) -> impl Iterator<Item = &'a Value> + 'a {
        let candidates = self.candidates;
        candidates
            .iter()
            .filter_map(move |name| fields.get(*name))
            .filter(|value| value.is_present())
    }
}
