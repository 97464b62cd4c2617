use std::sync::Arc;

use rollcall_pipeline::Dispatcher;

use crate::config::ServerConfig;

/// Shared application state available to all handlers via `State<AppState>`.
#[derive(Clone)]
pub struct AppState {
    /// Routes decoded events to the mirror store.
    pub dispatcher: Dispatcher,
    pub config: Arc<ServerConfig>,
}
