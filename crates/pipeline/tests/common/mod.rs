#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use rollcall_core::collection::Collection;
use rollcall_core::notification::ChangeNotification;
use rollcall_core::row::MirrorRow;
use rollcall_core::value::{Fields, Value};
use rollcall_db::{DbError, MemoryMirrorStore, MirrorStore};
use rollcall_pipeline::Dispatcher;

pub fn at(hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, hour, 0, 0).unwrap()
}

pub fn fields(entries: &[(&str, Value)]) -> Fields {
    entries
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

pub fn text(value: &str) -> Value {
    Value::String(value.to_string())
}

/// Dispatcher over a fresh in-memory store.
pub fn memory_dispatcher() -> (Dispatcher, Arc<MemoryMirrorStore>) {
    let store = Arc::new(MemoryMirrorStore::new());
    (Dispatcher::new(store.clone()), store)
}

/// Attendance write for `a1` at `hour` with `version`.
pub fn attendance_write(status: &str, hour: u32, version: i64) -> ChangeNotification {
    ChangeNotification::written(
        Collection::Attendance,
        "a1",
        fields(&[
            ("userId", text("u1")),
            ("classId", text("c1")),
            ("status", text(status)),
            ("capturedAt", Value::Timestamp(at(8))),
            ("version", Value::Integer(version)),
        ]),
        Some(at(hour)),
    )
}

/// Store whose every call fails as if the database were unreachable.
#[derive(Debug, Default)]
pub struct UnreachableStore;

#[async_trait]
impl MirrorStore for UnreachableStore {
    async fn upsert(&self, _row: &MirrorRow) -> Result<bool, DbError> {
        Err(DbError::Database(sqlx::Error::PoolTimedOut))
    }

    async fn delete(&self, _collection: Collection, _id: &str) -> Result<bool, DbError> {
        Err(DbError::Database(sqlx::Error::PoolTimedOut))
    }

    async fn ping(&self) -> Result<(), DbError> {
        Err(DbError::Database(sqlx::Error::PoolTimedOut))
    }
}
