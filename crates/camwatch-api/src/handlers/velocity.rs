//! On-demand velocity analysis.

use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;

use camwatch_models::{Modality, StreamKey};

use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Serialize)]
pub struct VelocityResponse {
    pub status: &'static str,
    pub narrations: Vec<String>,
}

/// Narrate every spatial position cluster of a stream.
pub async fn analyze_velocity(
    State(state): State<AppState>,
    Path((cam, mode)): Path<(String, String)>,
) -> ApiResult<Json<VelocityResponse>> {
    let modality: Modality = mode.parse()?;
    let key = StreamKey::new(cam, modality);
    let narrations = state.supervisor.analyze_velocity(&key).await?;

    Ok(Json(VelocityResponse {
        status: "done",
        narrations,
    }))
}
