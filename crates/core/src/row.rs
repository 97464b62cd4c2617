//! Relational rows produced from documents.

use serde::Serialize;

use crate::collection::Collection;
use crate::conflict::Recency;
use crate::metadata::SyncMetadata;
use crate::types::Timestamp;

/// A typed column value ready to be bound to a statement parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnValue {
    Text(String),
    NullableText(Option<String>),
    BigInt(i64),
    Timestamp(Timestamp),
    Json(serde_json::Value),
}

/// One named column of a row.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: &'static str,
    pub value: ColumnValue,
}

impl Column {
    pub fn new(name: &'static str, value: ColumnValue) -> Self {
        Self { name, value }
    }
}

/// Row of `attendance_event`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttendanceEventRow {
    pub id: String,
    pub user_id: String,
    pub course_id: String,
    pub status: String,
    pub ts_utc: Timestamp,
    pub sync: SyncMetadata,
}

/// Row of `app_user`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AppUserRow {
    pub id: String,
    pub email: String,
    pub display_name: Option<String>,
    pub role: Option<String>,
    pub sync: SyncMetadata,
}

/// Row of a `{collection}_mirror` table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenericMirrorRow {
    pub collection: Collection,
    pub id: String,
    pub data: serde_json::Value,
    pub sync: SyncMetadata,
}

/// Any row the mirror writes.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MirrorRow {
    AttendanceEvent(AttendanceEventRow),
    AppUser(AppUserRow),
    Generic(GenericMirrorRow),
}

impl MirrorRow {
    pub fn collection(&self) -> Collection {
        match self {
            MirrorRow::AttendanceEvent(_) => Collection::Attendance,
            MirrorRow::AppUser(_) => Collection::Users,
            MirrorRow::Generic(row) => row.collection,
        }
    }

    pub fn table(&self) -> &'static str {
        self.collection().table()
    }

    pub fn id(&self) -> &str {
        match self {
            MirrorRow::AttendanceEvent(row) => &row.id,
            MirrorRow::AppUser(row) => &row.id,
            MirrorRow::Generic(row) => &row.id,
        }
    }

    pub fn sync(&self) -> &SyncMetadata {
        match self {
            MirrorRow::AttendanceEvent(row) => &row.sync,
            MirrorRow::AppUser(row) => &row.sync,
            MirrorRow::Generic(row) => &row.sync,
        }
    }

    pub fn recency(&self) -> Recency {
        self.sync().recency()
    }

    /// Columns in statement order, `id` first and sync columns last.
    pub fn columns(&self) -> Vec<Column> {
        let mut columns = vec![Column::new("id", ColumnValue::Text(self.id().to_string()))];
        match self {
            MirrorRow::AttendanceEvent(row) => columns.extend([
                Column::new("user_id", ColumnValue::Text(row.user_id.clone())),
                Column::new("course_id", ColumnValue::Text(row.course_id.clone())),
                Column::new("status", ColumnValue::Text(row.status.clone())),
                Column::new("ts_utc", ColumnValue::Timestamp(row.ts_utc)),
            ]),
            MirrorRow::AppUser(row) => columns.extend([
                Column::new("email", ColumnValue::Text(row.email.clone())),
                Column::new(
                    "display_name",
                    ColumnValue::NullableText(row.display_name.clone()),
                ),
                Column::new("role", ColumnValue::NullableText(row.role.clone())),
            ]),
            MirrorRow::Generic(row) => {
                columns.push(Column::new("data", ColumnValue::Json(row.data.clone())));
            }
        }
        let sync = self.sync();
        columns.extend([
            Column::new("version", ColumnValue::BigInt(sync.version)),
            Column::new("updated_at", ColumnValue::Timestamp(sync.updated_at)),
            Column::new("source", ColumnValue::Text(sync.source.clone())),
        ]);
        columns
    }
}
