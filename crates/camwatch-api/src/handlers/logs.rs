//! Recent event log.

use axum::extract::State;
use axum::Json;

use camwatch_models::LogEntry;

use crate::state::AppState;

/// Recent events, newest first.
pub async fn get_logs(State(state): State<AppState>) -> Json<Vec<LogEntry>> {
    Json(state.hub.recent())
}
