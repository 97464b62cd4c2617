//! JSON wire format of document events and exported documents.
//!
//! A document event body looks like
//!
//! ```json
//! {
//!   "value":    { "name": "...", "fields": { ... }, "updateTime": "..." },
//!   "oldValue": { "name": "...", "fields": { ... }, "updateTime": "..." }
//! }
//! ```
//!
//! with `value` absent for deletes and `oldValue` absent for creates.

use serde::Deserialize;

use crate::error::CoreError;
use crate::notification::{ChangeNotification, DocumentPath, DocumentSnapshot};
use crate::types::Timestamp;
use crate::value::Fields;

/// A document resource as serialized by the document store.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub name: String,
    #[serde(default)]
    pub fields: Fields,
    pub create_time: Option<Timestamp>,
    pub update_time: Option<Timestamp>,
}

impl Document {
    /// Treat an exported document as a write notification.
    pub fn into_notification(self) -> Result<ChangeNotification, CoreError> {
        let path = DocumentPath::parse(&self.name)?;
        let collection = path.collection()?;
        Ok(ChangeNotification::written(
            collection,
            path.document_id,
            self.fields,
            self.update_time,
        ))
    }
}

/// Before/after pair pushed by the trigger runtime.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentEventData {
    #[serde(default)]
    pub value: Option<Document>,
    #[serde(default)]
    pub old_value: Option<Document>,
}

impl DocumentEventData {
    /// Build a notification.
    ///
    /// `subject` is the event subject (`documents/{collection}/{docId}`) when
    /// the transport provides one; otherwise the path comes from the
    /// document names in the body.
    pub fn into_notification(
        self,
        subject: Option<&str>,
        event_time: Option<Timestamp>,
    ) -> Result<ChangeNotification, CoreError> {
        let name = match subject {
            Some(subject) => subject,
            None => self
                .value
                .as_ref()
                .or(self.old_value.as_ref())
                .map(|doc| doc.name.as_str())
                .ok_or_else(|| {
                    CoreError::Validation(
                        "event carries neither a subject nor a document".to_string(),
                    )
                })?,
        };
        let path = DocumentPath::parse(name)?;
        let collection = path.collection()?;

        Ok(ChangeNotification {
            collection,
            document_id: path.document_id,
            existed_before: self.old_value.is_some(),
            after: self.value.map(|doc| DocumentSnapshot {
                fields: doc.fields,
                update_time: doc.update_time,
            }),
            event_time,
        })
    }
}
