//! Document change events pushed by the trigger runtime.
//!
//! Events arrive in binary CloudEvents mode: attributes in `ce-*` headers,
//! the document pair as the JSON body.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::routing::post;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use rollcall_core::event::DocumentEventData;
use rollcall_pipeline::DispatchOutcome;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

const SUBJECT_HEADER: &str = "ce-subject";
const TIME_HEADER: &str = "ce-time";
const ID_HEADER: &str = "ce-id";

/// POST /events -- mirror one document change.
async fn receive_event(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<Json<DataResponse<DispatchOutcome>>> {
    let event_id = header(&headers, ID_HEADER);
    let subject = header(&headers, SUBJECT_HEADER);
    let event_time = header(&headers, TIME_HEADER)
        .map(parse_event_time)
        .transpose()?;

    let event = decode_body(&body)?;

    let outcome = state
        .dispatcher
        .handle_event(event, subject, event_time)
        .await
        .map_err(|e| {
            if !e.is_retryable() {
                tracing::warn!(event_id, subject, error = %e, "Rejected document event");
            }
            AppError::from(e)
        })?;

    tracing::debug!(event_id, subject, ?outcome, "Document event handled");
    Ok(Json(DataResponse { data: outcome }))
}

/// An empty body is a delete with the path taken from `ce-subject`.
fn decode_body(body: &[u8]) -> AppResult<DocumentEventData> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(DocumentEventData::default());
    }
    serde_json::from_slice(body)
        .map_err(|e| AppError::BadRequest(format!("Malformed document event: {e}")))
}

fn parse_event_time(raw: &str) -> AppResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| AppError::BadRequest(format!("Invalid {TIME_HEADER} header '{raw}': {e}")))
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

pub fn router() -> Router<AppState> {
    Router::new().route("/events", post(receive_event))
}
