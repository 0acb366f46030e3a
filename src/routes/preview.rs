use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::app_state::AppState;
use crate::services::preview::LogEntry;

/// GET /preview.jpg — latest rendered camera frame.
pub async fn preview_frame(State(state): State<AppState>) -> Response {
    match state.board.frame_jpeg() {
        Some(jpeg) => ([(header::CONTENT_TYPE, "image/jpeg")], jpeg).into_response(),
        None => (StatusCode::NOT_FOUND, "No frame yet").into_response(),
    }
}

/// GET /log — classification results, newest first.
pub async fn result_log(State(state): State<AppState>) -> Json<Vec<LogEntry>> {
    Json(state.board.entries())
}
