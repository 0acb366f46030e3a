use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusBuilder;
use tracing_subscriber::EnvFilter;

use sortcam::app_state::AppState;
use sortcam::config::AppConfig;
use sortcam::routes;
use sortcam::services::{
    gate::{Gate, JobPolicy},
    gemini::GeminiClient,
    preview::{spawn_preview_loop, PreviewBoard},
};

#[tokio::main]
async fn main() {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    // Load configuration from environment
    let config = AppConfig::from_env().expect("Failed to load configuration from environment");

    tracing::info!(model = %config.gemini_model, "Initializing sortcam server");

    // Initialize Prometheus metrics recorder
    let prometheus_handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus metrics recorder");
    let prometheus_handle = Arc::new(prometheus_handle);
    routes::metrics::describe_metrics();

    // Initialize Gemini client
    let gemini = GeminiClient::new(
        config.gemini_api_key.clone(),
        config.gemini_model.clone(),
        config.gemini_base_url.clone(),
        config.classify_timeout(),
    )
    .expect("Failed to initialize Gemini client");

    let gate = Gate::new(
        Arc::new(gemini),
        JobPolicy {
            decode: config.decode_policy(),
            classify_timeout: config.classify_timeout(),
        },
    );

    // Live preview + result log
    let board = Arc::new(PreviewBoard::new(config.result_log_capacity));
    let preview_task = spawn_preview_loop(gate.clone(), board.clone(), config.preview_settings());

    let state = AppState::new(gate, board);
    let app = routes::router(state, config.max_upload_bytes, Some(prometheus_handle));

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    preview_task.abort();
    tracing::info!("Server stopped");
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
