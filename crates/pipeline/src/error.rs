use rollcall_core::error::CoreError;
use rollcall_db::DbError;

/// Failure while turning a raw event into a mirrored row.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// The event could not be decoded or targets an unwatched collection.
    /// Redelivering it will not help.
    #[error(transparent)]
    Event(#[from] CoreError),

    #[error(transparent)]
    Store(#[from] DbError),
}

impl PipelineError {
    /// Whether redelivering the same event could succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            PipelineError::Event(_) => false,
            PipelineError::Store(e) => !e.is_programming_error(),
        }
    }
}
