use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;

use crate::app_state::AppState;
use crate::services::gate::{UploadOutcome, BUSY_REPLY};

/// POST /upload — raw image bytes in, classification text (or `BUSY`) out.
///
/// Always 200: a busy gate and a failed job are both ordinary replies.
pub async fn upload_image(State(state): State<AppState>, body: Bytes) -> (StatusCode, String) {
    metrics::counter!("uploads_total").increment(1);
    tracing::debug!(bytes = body.len(), "Upload received");

    match state.gate.submit(body).await {
        UploadOutcome::Busy => (StatusCode::OK, BUSY_REPLY.to_string()),
        UploadOutcome::Completed(text) => (StatusCode::OK, text),
    }
}
