//! Test helper utilities: stub classifiers and an in-process server

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use image::DynamicImage;
use sortcam::app_state::AppState;
use sortcam::models::classification::ClassificationResult;
use sortcam::routes;
use sortcam::services::classifier::{Classifier, ClassifyError};
use sortcam::services::decoder::RetryPolicy;
use sortcam::services::gate::{Gate, JobPolicy};
use sortcam::services::preview::{spawn_preview_loop, PreviewBoard, PreviewSettings};
use tokio::sync::Notify;
use tokio::task::JoinHandle;

pub const PLASTIC_REPLY: &str = "Item: plastic bottle\nCategory: Plastic";

/// Upload limit used by test servers.
pub const TEST_MAX_UPLOAD_BYTES: usize = 64 * 1024;

/// Always answers with the same reply.
pub struct FixedReply(pub &'static str);

#[async_trait]
impl Classifier for FixedReply {
    async fn classify(&self, _image: &DynamicImage) -> Result<ClassificationResult, ClassifyError> {
        Ok(ClassificationResult::from_reply(self.0.to_string()))
    }
}

/// Blocks until released, then answers like [`FixedReply`].
pub struct Gated {
    pub release: Arc<Notify>,
    pub reply: &'static str,
}

#[async_trait]
impl Classifier for Gated {
    async fn classify(&self, _image: &DynamicImage) -> Result<ClassificationResult, ClassifyError> {
        self.release.notified().await;
        Ok(ClassificationResult::from_reply(self.reply.to_string()))
    }
}

/// Fails like an unreachable service.
pub struct Unreachable;

#[async_trait]
impl Classifier for Unreachable {
    async fn classify(&self, _image: &DynamicImage) -> Result<ClassificationResult, ClassifyError> {
        Err(ClassifyError::Api {
            status: 403,
            message: "API key not valid.".to_string(),
        })
    }
}

pub fn test_policy() -> JobPolicy {
    JobPolicy {
        decode: RetryPolicy {
            max_attempts: 5,
            interval: Duration::from_millis(20),
        },
        classify_timeout: Duration::from_secs(5),
    }
}

/// A sortcam server on an ephemeral localhost port.
pub struct TestServer {
    pub base_url: String,
    pub state: AppState,
    server: JoinHandle<()>,
    preview: JoinHandle<()>,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.server.abort();
        self.preview.abort();
    }
}

pub async fn spawn_server(classifier: Arc<dyn Classifier>) -> TestServer {
    spawn_server_with_limit(classifier, TEST_MAX_UPLOAD_BYTES).await
}

pub async fn spawn_server_with_limit(
    classifier: Arc<dyn Classifier>,
    max_upload_bytes: usize,
) -> TestServer {
    let gate = Gate::new(classifier, test_policy());
    let board = Arc::new(PreviewBoard::new(10));
    let preview = spawn_preview_loop(
        gate.clone(),
        board.clone(),
        PreviewSettings {
            interval: Duration::from_millis(10),
            max_width: 400,
            max_height: 300,
            decode: test_policy().decode,
        },
    );

    let state = AppState::new(gate, board);
    let app = routes::router(state.clone(), max_upload_bytes, None);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test listener");
    let addr = listener.local_addr().expect("listener address");
    let server = tokio::spawn(async move {
        axum::serve(listener, app).await.expect("test server error");
    });

    TestServer {
        base_url: format!("http://{}", addr),
        state,
        server,
        preview,
    }
}

/// Wait (bounded) until the gate reports a job in flight.
pub async fn wait_until_busy(state: &AppState) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !state.gate.is_busy() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("gate never became busy");
}

pub async fn post_upload(
    client: &reqwest::Client,
    server: &TestServer,
    body: Vec<u8>,
) -> Result<(reqwest::StatusCode, String), reqwest::Error> {
    let response = client.post(server.url("/upload")).body(body).send().await?;
    let status = response.status();
    let text = response.text().await?;
    Ok((status, text))
}

/// The word after `Category:` in a two-line reply.
pub fn category_line(reply: &str) -> Option<&str> {
    reply
        .lines()
        .find_map(|line| line.trim().strip_prefix("Category:"))
        .map(str::trim)
}
