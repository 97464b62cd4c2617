//! Change notifications delivered by the document store.

use crate::collection::Collection;
use crate::error::CoreError;
use crate::types::Timestamp;
use crate::value::Fields;

/// Document state after a write.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DocumentSnapshot {
    pub fields: Fields,
    /// Store-assigned time of the write.
    pub update_time: Option<Timestamp>,
}

/// One document-level mutation in a watched collection.
///
/// `after` is `None` when the document no longer exists.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeNotification {
    pub collection: Collection,
    pub document_id: String,
    pub existed_before: bool,
    pub after: Option<DocumentSnapshot>,
    /// Time the runtime reported for the event, used as a fallback
    /// `updated_at`.
    pub event_time: Option<Timestamp>,
}

impl ChangeNotification {
    /// A create or update of `document_id`.
    pub fn written(
        collection: Collection,
        document_id: impl Into<String>,
        fields: Fields,
        update_time: Option<Timestamp>,
    ) -> Self {
        Self {
            collection,
            document_id: document_id.into(),
            existed_before: false,
            after: Some(DocumentSnapshot {
                fields,
                update_time,
            }),
            event_time: None,
        }
    }

    /// A delete of `document_id`.
    pub fn deleted(collection: Collection, document_id: impl Into<String>) -> Self {
        Self {
            collection,
            document_id: document_id.into(),
            existed_before: true,
            after: None,
            event_time: None,
        }
    }

    pub fn with_event_time(mut self, event_time: Option<Timestamp>) -> Self {
        self.event_time = event_time;
        self
    }

    pub fn exists_after(&self) -> bool {
        self.after.is_some()
    }
}

/// `{collection}/{docId}` extracted from a document resource name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentPath {
    pub collection: String,
    pub document_id: String,
}

impl DocumentPath {
    /// Parse any of:
    ///
    /// - `projects/{p}/databases/{d}/documents/{collection}/{docId}`
    /// - `documents/{collection}/{docId}`
    /// - `{collection}/{docId}`
    ///
    /// Only top-level documents are accepted.
    pub fn parse(path: &str) -> Result<Self, CoreError> {
        let relative = match path.strip_prefix("projects/") {
            Some(rest) => Self::strip_database(rest).ok_or_else(|| {
                CoreError::InvalidDocumentPath {
                    path: path.to_string(),
                    reason: "expected projects/{p}/databases/{d}/documents/...",
                }
            })?,
            None => path.strip_prefix("documents/").unwrap_or(path),
        };

        let segments: Vec<&str> = relative.split('/').collect();
        match segments.as_slice() {
            [collection, document_id] if !collection.is_empty() && !document_id.is_empty() => {
                Ok(Self {
                    collection: (*collection).to_string(),
                    document_id: (*document_id).to_string(),
                })
            }
            [_, _, _, ..] => Err(CoreError::InvalidDocumentPath {
                path: path.to_string(),
                reason: "not a top-level document",
            }),
            _ => Err(CoreError::InvalidDocumentPath {
                path: path.to_string(),
                reason: "expected {collection}/{docId}",
            }),
        }
    }

    /// `{p}/databases/{d}/documents/{rest}` to `{rest}`.
    fn strip_database(rest: &str) -> Option<&str> {
        let mut parts = rest.splitn(4, '/');
        match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(project), Some("databases"), Some(database), Some(tail))
                if !project.is_empty() && !database.is_empty() =>
            {
                tail.strip_prefix("documents/")
            }
            _ => None,
        }
    }

    /// The watched collection this path belongs to.
    pub fn collection(&self) -> Result<Collection, CoreError> {
        self.collection.parse()
    }
}
