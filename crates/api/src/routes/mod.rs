pub mod events;
pub mod health;

use axum::Router;

use crate::state::AppState;

/// All routes served by the receiver.
///
/// ```text
/// GET  /health     service and database health
/// POST /events     document change events
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .merge(events::router())
}
