//! Trigger dispatcher.
//!
//! One notification in, at most one store operation out: a delete when the
//! document no longer exists, otherwise the collection's mapper followed by
//! the conditional upsert. Nothing is batched across notifications.

use std::sync::Arc;

use chrono::Utc;
use rollcall_core::event::DocumentEventData;
use rollcall_core::mapper::{map_document, MapOutcome, SkipReason};
use rollcall_core::notification::ChangeNotification;
use rollcall_core::types::Timestamp;
use rollcall_db::{DbError, MirrorStore};
use serde::Serialize;

use crate::error::PipelineError;

/// What a single dispatch did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DispatchOutcome {
    /// The document was deleted; `removed` is false when no row existed.
    Deleted { removed: bool },
    /// The row was offered to the store; `applied` is false when the stored
    /// row was at least as recent.
    Upserted { applied: bool },
    /// The document failed validation and produced no row.
    Skipped { reason: SkipReason },
}

/// Routes change notifications to the mirror store.
#[derive(Clone)]
pub struct Dispatcher {
    store: Arc<dyn MirrorStore>,
}

impl Dispatcher {
    pub fn new(store: Arc<dyn MirrorStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn MirrorStore> {
        &self.store
    }

    /// Apply one notification.
    ///
    /// Store failures are logged with the collection and document id and
    /// then returned unchanged.
    pub async fn dispatch(
        &self,
        notification: &ChangeNotification,
    ) -> Result<DispatchOutcome, DbError> {
        self.dispatch_at(notification, Utc::now()).await
    }

    /// Decode a raw document event and apply it.
    pub async fn handle_event(
        &self,
        event: DocumentEventData,
        subject: Option<&str>,
        event_time: Option<Timestamp>,
    ) -> Result<DispatchOutcome, PipelineError> {
        let notification = event.into_notification(subject, event_time)?;
        Ok(self.dispatch(&notification).await?)
    }

    async fn dispatch_at(
        &self,
        notification: &ChangeNotification,
        now: Timestamp,
    ) -> Result<DispatchOutcome, DbError> {
        let collection = notification.collection;
        let doc_id = notification.document_id.as_str();

        let Some(after) = &notification.after else {
            let removed = self
                .store
                .delete(collection, doc_id)
                .await
                .inspect_err(|e| {
                    tracing::error!(%collection, doc_id, error = %e, "Failed to delete mirrored row");
                })?;
            tracing::debug!(%collection, doc_id, removed, "Mirrored row deleted");
            return Ok(DispatchOutcome::Deleted { removed });
        };

        let row = match map_document(collection, doc_id, after, notification.event_time, now) {
            MapOutcome::Row(row) => row,
            MapOutcome::Skipped(reason) => {
                tracing::warn!(%collection, doc_id, %reason, "Document skipped");
                return Ok(DispatchOutcome::Skipped { reason });
            }
        };

        let applied = self.store.upsert(&row).await.inspect_err(|e| {
            tracing::error!(%collection, doc_id, error = %e, "Failed to upsert mirrored row");
        })?;

        let sync = row.sync();
        tracing::debug!(
            %collection,
            doc_id,
            applied,
            version = sync.version,
            updated_at = %sync.updated_at,
            "Mirrored row upserted"
        );
        Ok(DispatchOutcome::Upserted { applied })
    }
}
