use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::app_state::AppState;
use crate::models::job::GateSnapshot;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub busy: bool,
}

/// GET /health — liveness plus whether a classification is in flight.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        busy: state.gate.is_busy(),
    })
}

/// GET /status — current job and latest published result.
pub async fn gate_status(State(state): State<AppState>) -> Json<GateSnapshot> {
    Json(state.gate.snapshot())
}
