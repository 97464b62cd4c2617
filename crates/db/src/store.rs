//! The store seam the dispatcher writes through.
//!
//! [`PgMirrorStore`] owns the connection pool and is opened and closed
//! explicitly by the process entry point. [`MemoryMirrorStore`] applies the
//! same recency rule in memory, for dry runs and tests.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use rollcall_core::collection::Collection;
use rollcall_core::conflict::should_apply;
use rollcall_core::row::MirrorRow;

use crate::config::DbConfig;
use crate::error::DbError;
use crate::repositories::MirrorRepo;
use crate::DbPool;

/// Destination of mirrored rows.
#[async_trait]
pub trait MirrorStore: Send + Sync {
    /// Conditionally upsert `row`. Returns whether it was applied.
    async fn upsert(&self, row: &MirrorRow) -> Result<bool, DbError>;

    /// Unconditionally delete `id`. Returns whether a row was removed.
    async fn delete(&self, collection: Collection, id: &str) -> Result<bool, DbError>;

    /// Check that the store is reachable.
    async fn ping(&self) -> Result<(), DbError>;
}

// ---------------------------------------------------------------------------
// Postgres
// ---------------------------------------------------------------------------

/// Postgres-backed store.
#[derive(Debug, Clone)]
pub struct PgMirrorStore {
    pool: DbPool,
}

impl PgMirrorStore {
    /// Connect a new pool sized by `config`.
    pub async fn open(config: &DbConfig) -> Result<Self, DbError> {
        let pool = crate::create_pool(config).await?;
        tracing::info!(
            max_connections = config.max_connections,
            ssl_mode = ?config.ssl_mode,
            "Mirror database pool opened"
        );
        Ok(Self { pool })
    }

    /// Wrap an existing pool.
    pub fn from_pool(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    /// Close the pool, waiting for checked-out connections to return.
    pub async fn close(&self) {
        self.pool.close().await;
        tracing::info!("Mirror database pool closed");
    }
}

#[async_trait]
impl MirrorStore for PgMirrorStore {
    async fn upsert(&self, row: &MirrorRow) -> Result<bool, DbError> {
        MirrorRepo::upsert(&self.pool, row).await
    }

    async fn delete(&self, collection: Collection, id: &str) -> Result<bool, DbError> {
        MirrorRepo::delete(&self.pool, collection, id).await
    }

    async fn ping(&self) -> Result<(), DbError> {
        crate::health_check(&self.pool).await?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// In-memory
// ---------------------------------------------------------------------------

/// Store keeping rows in a map keyed by table and id.
#[derive(Debug, Default)]
pub struct MemoryMirrorStore {
    rows: Mutex<HashMap<(&'static str, String), MirrorRow>>,
}

impl MemoryMirrorStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, collection: Collection, id: &str) -> Option<MirrorRow> {
        self.lock()
            .get(&(collection.table(), id.to_string()))
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<(&'static str, String), MirrorRow>> {
        self.rows.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl MirrorStore for MemoryMirrorStore {
    async fn upsert(&self, row: &MirrorRow) -> Result<bool, DbError> {
        let mut rows = self.lock();
        let key = (row.table(), row.id().to_string());
        let applied = match rows.get(&key) {
            Some(stored) => should_apply(row.recency(), stored.recency()),
            None => true,
        };
        if applied {
            rows.insert(key, row.clone());
        }
        Ok(applied)
    }

    async fn delete(&self, collection: Collection, id: &str) -> Result<bool, DbError> {
        Ok(self
            .lock()
            .remove(&(collection.table(), id.to_string()))
            .is_some())
    }

    async fn ping(&self) -> Result<(), DbError> {
        Ok(())
    }
}
