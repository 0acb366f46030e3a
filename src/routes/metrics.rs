use axum::response::IntoResponse;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;

/// Prometheus metrics scrape endpoint.
/// Returns metrics in Prometheus text exposition format.
pub async fn prometheus_metrics(
    axum::extract::State(handle): axum::extract::State<Arc<PrometheusHandle>>,
) -> impl IntoResponse {
    handle.render()
}

/// Register descriptions for the metrics the service records.
pub fn describe_metrics() {
    metrics::describe_counter!("uploads_total", "Total image uploads received");
    metrics::describe_counter!(
        "uploads_busy_total",
        "Uploads answered BUSY because a classification was in flight"
    );
    metrics::describe_counter!(
        "classification_jobs_completed",
        "Classification jobs that produced a reply"
    );
    metrics::describe_counter!(
        "classification_jobs_failed",
        "Classification jobs that ended in an error"
    );
    metrics::describe_histogram!(
        "classification_job_seconds",
        "Time from admission to published result"
    );
    metrics::describe_gauge!(
        "classification_busy",
        "1 while a classification job holds the upload slot"
    );
}
