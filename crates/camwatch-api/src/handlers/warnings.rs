//! Per-camera warning handlers.

use std::collections::HashMap;

use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;

use camwatch_models::WarningState;

use crate::state::AppState;

#[derive(Serialize)]
pub struct WarningsResponse {
    pub warnings: HashMap<String, WarningState>,
}

#[derive(Serialize)]
pub struct ClearWarningResponse {
    pub status: &'static str,
}

/// Current warning of every camera.
pub async fn get_current_warning(State(state): State<AppState>) -> Json<WarningsResponse> {
    Json(WarningsResponse {
        warnings: state.supervisor.warnings().get_all().await,
    })
}

/// Clear a camera's warning. Clearing an absent warning is not an error.
pub async fn clear_warning(State(state): State<AppState>, Path(cam): Path<String>) -> Json<ClearWarningResponse> {
    state.supervisor.warnings().clear(&cam).await;
    Json(ClearWarningResponse { status: "cleared" })
}
