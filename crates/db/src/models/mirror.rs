//! Rows as stored in the mirror tables.

use rollcall_core::types::Timestamp;
use serde::Serialize;
use sqlx::FromRow;

/// A row from `attendance_event`.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AttendanceEvent {
    pub id: String,
    pub user_id: String,
    pub course_id: String,
    pub status: String,
    pub ts_utc: Timestamp,
    pub version: i64,
    pub updated_at: Timestamp,
    pub source: String,
}

/// A row from `app_user`.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AppUser {
    pub id: String,
    pub email: String,
    pub display_name: Option<String>,
    pub role: Option<String>,
    pub version: i64,
    pub updated_at: Timestamp,
    pub source: String,
}

/// A row from one of the `{collection}_mirror` tables.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct MirrorDocument {
    pub id: String,
    pub data: serde_json::Value,
    pub version: i64,
    pub updated_at: Timestamp,
    pub source: String,
}
