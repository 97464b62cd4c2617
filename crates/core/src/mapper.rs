//! Per-collection mapping of document payloads to mirror rows.
//!
//! Malformed documents are skipped rather than rejected: a missing required
//! field yields [`MapOutcome::Skipped`] and no row. The caller decides how to
//! report it.

use std::fmt;

use serde::Serialize;
use serde_json::{Map, Value as Json};

use crate::aliases::{COURSE_ID, DISPLAY_NAME, EMAIL, ROLE, STATUS, TS_UTC, USER_ID};
use crate::collection::{Collection, RowShape};
use crate::metadata::SyncMetadata;
use crate::notification::DocumentSnapshot;
use crate::row::{AppUserRow, AttendanceEventRow, GenericMirrorRow, MirrorRow};
use crate::serializer::serialize_value;
use crate::types::Timestamp;
use crate::value::Fields;

/// Metadata keys kept out of the generic `data` column; they have their own
/// columns.
pub const RESERVED_FIELDS: [&str; 4] = ["updated_at", "updatedAt", "version", "source"];

/// Attendance status stored when the document has none.
pub const UNKNOWN_STATUS: &str = "unknown";

/// Result of mapping one document.
#[derive(Debug, Clone, PartialEq)]
pub enum MapOutcome {
    Row(MirrorRow),
    Skipped(SkipReason),
}

/// Why a document produced no row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SkipReason {
    MissingUserOrCourse { has_user_id: bool, has_course_id: bool },
    MissingEmail,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::MissingUserOrCourse {
                has_user_id,
                has_course_id,
            } => write!(
                f,
                "missing userId/courseId (user id present: {has_user_id}, course id present: {has_course_id})"
            ),
            SkipReason::MissingEmail => f.write_str("missing email"),
        }
    }
}

/// Map a written document of `collection` to its mirror row.
///
/// `fallback` and `now` feed [`SyncMetadata::resolve`].
pub fn map_document(
    collection: Collection,
    document_id: &str,
    snapshot: &DocumentSnapshot,
    fallback: Option<Timestamp>,
    now: Timestamp,
) -> MapOutcome {
    let sync = SyncMetadata::resolve(&snapshot.fields, snapshot.update_time, fallback, now);
    match collection.shape() {
        RowShape::AttendanceEvent => map_attendance(document_id, &snapshot.fields, sync),
        RowShape::AppUser => map_user(document_id, &snapshot.fields, sync),
        RowShape::Generic => map_generic(collection, document_id, &snapshot.fields, sync),
    }
}

fn map_attendance(document_id: &str, fields: &Fields, sync: SyncMetadata) -> MapOutcome {
    let (user_id, course_id) = match (USER_ID.text(fields), COURSE_ID.text(fields)) {
        (Some(user_id), Some(course_id)) => (user_id, course_id),
        (user_id, course_id) => {
            return MapOutcome::Skipped(SkipReason::MissingUserOrCourse {
                has_user_id: user_id.is_some(),
                has_course_id: course_id.is_some(),
            });
        }
    };

    let status = STATUS
        .text(fields)
        .unwrap_or_else(|| UNKNOWN_STATUS.to_string());
    let ts_utc = TS_UTC.timestamp(fields).unwrap_or(sync.updated_at);

    MapOutcome::Row(MirrorRow::AttendanceEvent(AttendanceEventRow {
        id: document_id.to_string(),
        user_id,
        course_id,
        status,
        ts_utc,
        sync,
    }))
}

fn map_user(document_id: &str, fields: &Fields, sync: SyncMetadata) -> MapOutcome {
    let Some(email) = EMAIL
        .text(fields)
        .map(|email| email.trim().to_lowercase())
        .filter(|email| !email.is_empty())
    else {
        return MapOutcome::Skipped(SkipReason::MissingEmail);
    };

    MapOutcome::Row(MirrorRow::AppUser(AppUserRow {
        id: document_id.to_string(),
        email,
        display_name: DISPLAY_NAME.text(fields),
        role: ROLE.text(fields),
        sync,
    }))
}

fn map_generic(
    collection: Collection,
    document_id: &str,
    fields: &Fields,
    sync: SyncMetadata,
) -> MapOutcome {
    MapOutcome::Row(MirrorRow::Generic(GenericMirrorRow {
        collection,
        id: document_id.to_string(),
        data: Json::Object(sanitize_document(fields)),
        sync,
    }))
}

/// Serialize a document for the `data` column, leaving out
/// [`RESERVED_FIELDS`].
pub fn sanitize_document(fields: &Fields) -> Map<String, Json> {
    fields
        .iter()
        .filter(|(key, _)| !RESERVED_FIELDS.contains(&key.as_str()))
        .filter_map(|(key, value)| serialize_value(value).map(|json| (key.clone(), json)))
        .collect()
}
