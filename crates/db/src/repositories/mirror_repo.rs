//! Conditional upserts and deletes against the mirror tables.
//!
//! The recency check runs inside the `INSERT .. ON CONFLICT .. DO UPDATE ..
//! WHERE` statement so that overlapping deliveries for the same document
//! cannot lose an update between a read and a write.

use rollcall_core::collection::Collection;
use rollcall_core::row::{Column, ColumnValue, MirrorRow};
use sqlx::postgres::PgArguments;
use sqlx::query::Query;
use sqlx::{PgPool, Postgres};

use crate::error::DbError;
use crate::models::mirror::{AppUser, AttendanceEvent, MirrorDocument};

/// Columns the recency predicate and conflict target depend on.
const REQUIRED_COLUMNS: [&str; 3] = ["id", "updated_at", "version"];

const ATTENDANCE_EVENT_COLUMNS: &str =
    "id, user_id, course_id, status, ts_utc, version, updated_at, source";

const APP_USER_COLUMNS: &str = "id, email, display_name, role, version, updated_at, source";

const MIRROR_DOCUMENT_COLUMNS: &str = "id, data, version, updated_at, source";

/// Provides the mirror's write path and read-back queries.
pub struct MirrorRepo;

impl MirrorRepo {
    /// Upsert a mapped row.
    ///
    /// Returns `true` when the row was inserted or updated, `false` when the
    /// stored row was at least as recent and the write was discarded.
    pub async fn upsert(pool: &PgPool, row: &MirrorRow) -> Result<bool, DbError> {
        Self::upsert_columns(pool, row.table(), &row.columns()).await
    }

    /// Upsert raw columns into `table`.
    ///
    /// Fails without touching the database when `columns` is empty or lacks
    /// `id`, `updated_at` or `version`.
    pub async fn upsert_columns(
        pool: &PgPool,
        table: &'static str,
        columns: &[Column],
    ) -> Result<bool, DbError> {
        let sql = upsert_sql(table, columns)?;

        let mut query = sqlx::query(&sql);
        for column in columns {
            query = bind_value(query, &column.value);
        }

        let result = query.execute(pool).await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete the row for `id` regardless of its version.
    ///
    /// Returns whether a row was removed.
    pub async fn delete(pool: &PgPool, collection: Collection, id: &str) -> Result<bool, DbError> {
        let sql = format!("DELETE FROM {} WHERE id = $1", collection.table());
        let result = sqlx::query(&sql).bind(id).execute(pool).await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn find_attendance_event(
        pool: &PgPool,
        id: &str,
    ) -> Result<Option<AttendanceEvent>, sqlx::Error> {
        let query =
            format!("SELECT {ATTENDANCE_EVENT_COLUMNS} FROM attendance_event WHERE id = $1");
        sqlx::query_as::<_, AttendanceEvent>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_app_user(pool: &PgPool, id: &str) -> Result<Option<AppUser>, sqlx::Error> {
        let query = format!("SELECT {APP_USER_COLUMNS} FROM app_user WHERE id = $1");
        sqlx::query_as::<_, AppUser>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Read a row from a generic `{collection}_mirror` table.
    pub async fn find_mirror_document(
        pool: &PgPool,
        collection: Collection,
        id: &str,
    ) -> Result<Option<MirrorDocument>, sqlx::Error> {
        let query = format!(
            "SELECT {MIRROR_DOCUMENT_COLUMNS} FROM {} WHERE id = $1",
            collection.table()
        );
        sqlx::query_as::<_, MirrorDocument>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Number of rows currently mirrored for `collection`.
    pub async fn count(pool: &PgPool, collection: Collection) -> Result<i64, sqlx::Error> {
        let query = format!("SELECT COUNT(*) FROM {}", collection.table());
        sqlx::query_scalar(&query).fetch_one(pool).await
    }
}

/// Build the conditional upsert for `table`.
///
/// ```text
/// INSERT INTO t (id, .., version, updated_at, source) VALUES ($1, ..)
/// ON CONFLICT (id) DO UPDATE SET col = EXCLUDED.col, ..
/// WHERE EXCLUDED.updated_at > t.updated_at
///    OR (EXCLUDED.updated_at = t.updated_at AND EXCLUDED.version > t.version)
/// ```
pub(crate) fn upsert_sql(table: &str, columns: &[Column]) -> Result<String, DbError> {
    if columns.is_empty() {
        return Err(DbError::EmptyRow {
            table: table.to_string(),
        });
    }
    for required in REQUIRED_COLUMNS {
        if !columns.iter().any(|c| c.name == required) {
            return Err(DbError::MissingColumn {
                table: table.to_string(),
                column: required,
            });
        }
    }

    let names: Vec<&str> = columns.iter().map(|c| c.name).collect();
    let placeholders: Vec<String> = (1..=names.len()).map(|i| format!("${i}")).collect();
    let assignments: Vec<String> = names
        .iter()
        .filter(|name| **name != "id")
        .map(|name| format!("{name} = EXCLUDED.{name}"))
        .collect();

    Ok(format!(
        "INSERT INTO {table} ({columns}) VALUES ({placeholders}) \
         ON CONFLICT (id) DO UPDATE SET {assignments} \
         WHERE EXCLUDED.updated_at > {table}.updated_at \
         OR (EXCLUDED.updated_at = {table}.updated_at AND EXCLUDED.version > {table}.version)",
        columns = names.join(", "),
        placeholders = placeholders.join(", "),
        assignments = assignments.join(", "),
    ))
}

fn bind_value<'q>(
    query: Query<'q, Postgres, PgArguments>,
    value: &'q ColumnValue,
) -> Query<'q, Postgres, PgArguments> {
    match value {
        ColumnValue::Text(text) => query.bind(text.as_str()),
        ColumnValue::NullableText(text) => query.bind(text.as_deref()),
        ColumnValue::BigInt(number) => query.bind(*number),
        ColumnValue::Timestamp(ts) => query.bind(*ts),
        ColumnValue::Json(json) => query.bind(json),
    }
}
