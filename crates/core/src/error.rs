#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Collection '{0}' is not mirrored")]
    UnwatchedCollection(String),

    #[error("Invalid document path '{path}': {reason}")]
    InvalidDocumentPath { path: String, reason: &'static str },

    #[error("Invalid {tag} value: {reason}")]
    InvalidValue { tag: &'static str, reason: String },
}
