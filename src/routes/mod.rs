pub mod health;
pub mod metrics;
pub mod preview;
pub mod upload;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::app_state::AppState;

/// Build the HTTP surface. `/metrics` is only mounted when a recorder handle is given.
pub fn router(
    state: AppState,
    max_upload_bytes: usize,
    prometheus: Option<Arc<PrometheusHandle>>,
) -> Router {
    let mut app = Router::new()
        .route("/upload", post(upload::upload_image))
        .route("/health", get(health::health_check))
        .route("/status", get(health::gate_status))
        .route("/preview.jpg", get(preview::preview_frame))
        .route("/log", get(preview::result_log))
        .with_state(state);

    if let Some(handle) = prometheus {
        app = app.route(
            "/metrics",
            get(metrics::prometheus_metrics).with_state(handle),
        );
    }

    app.layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
}
