use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use rollcall_core::error::CoreError;
use rollcall_db::DbError;
use rollcall_pipeline::PipelineError;
use serde_json::json;

/// Application-level error type for HTTP handlers.
///
/// Produces `{"error", "code"}` bodies. Event-shape problems and rows the
/// executor refuses are 4xx so the trigger runtime stops redelivering them.
/// Other store failures are 5xx so it retries.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// The event could not be decoded into a notification.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The mirror store failed.
    #[error(transparent)]
    Db(#[from] DbError),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl From<PipelineError> for AppError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::Event(e) => AppError::Core(e),
            PipelineError::Store(e) => AppError::Db(e),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Core(core) => {
                let code = match core {
                    CoreError::Validation(_) => "VALIDATION_ERROR",
                    CoreError::UnwatchedCollection(_) => "UNWATCHED_COLLECTION",
                    CoreError::InvalidDocumentPath { .. } => "INVALID_DOCUMENT_PATH",
                    CoreError::InvalidValue { .. } => "INVALID_VALUE",
                };
                (StatusCode::BAD_REQUEST, code, core.to_string())
            }

            // Already logged with collection and document id by the dispatcher.
            AppError::Db(db) if db.is_programming_error() => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "UNMAPPABLE_ROW",
                "The document could not be mapped to a mirror row".to_string(),
            ),
            AppError::Db(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal error occurred".to_string(),
            ),

            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}
