//! Single-slot admission gate between the upload endpoint and classification jobs.
//!
//! At most one job runs at a time. The HTTP handler admits a job, spawns it,
//! and waits on a completion channel owned by that job, so a caller only ever
//! sees the result of its own upload. Releasing the slot is tied to a drop
//! guard that travels with the job, so the gate is freed even if the job
//! task panics or is dropped before publishing.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use bytes::Bytes;
use tokio::sync::oneshot;
use uuid::Uuid;

use crate::models::classification::ClassificationResult;
use crate::models::job::{GateSnapshot, JobStatus, UploadJob};
use crate::services::classifier::{Classifier, ClassifyError};
use crate::services::decoder::{decode_with_retry, DecodeError, RetryPolicy};

/// Reply sent to a camera whose upload arrives while a job is running.
pub const BUSY_REPLY: &str = "BUSY";

const INITIAL_RESULT: &str = "Waiting...";
const ABORTED_RESULT: &str = "Error: classification job aborted before publishing a result";

/// Per-job processing limits.
#[derive(Debug, Clone, Copy)]
pub struct JobPolicy {
    pub decode: RetryPolicy,
    pub classify_timeout: Duration,
}

impl Default for JobPolicy {
    fn default() -> Self {
        Self {
            decode: RetryPolicy::default(),
            classify_timeout: Duration::from_secs(30),
        }
    }
}

struct GateState {
    busy: bool,
    job: Option<UploadJob>,
    preview: Option<Bytes>,
    latest_result: String,
}

fn lock(state: &Mutex<GateState>) -> MutexGuard<'_, GateState> {
    // No code panics while holding the lock, but never let poisoning wedge the gate.
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Shared handle to the gate; clones refer to the same slot.
#[derive(Clone)]
pub struct Gate {
    state: Arc<Mutex<GateState>>,
    classifier: Arc<dyn Classifier>,
    policy: JobPolicy,
}

/// Result of offering an upload to the gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    /// Another job holds the slot.
    Busy,
    /// The job ran; carries the published text (classification or error description).
    Completed(String),
}

/// Everything a successful admission hands back.
pub struct Admission {
    pub ticket: JobTicket,
    pub pending: PendingResult,
}

/// The work half of an admission, consumed by [`Gate::run_job`].
pub struct JobTicket {
    job_id: Uuid,
    bytes: Bytes,
    release: BusyRelease,
}

impl JobTicket {
    pub fn job_id(&self) -> Uuid {
        self.job_id
    }
}

/// The waiting half of an admission.
pub struct PendingResult {
    job_id: Uuid,
    done: oneshot::Receiver<String>,
    state: Arc<Mutex<GateState>>,
}

impl PendingResult {
    pub fn job_id(&self) -> Uuid {
        self.job_id
    }

    /// Wait until this job publishes its result.
    pub async fn await_result(self) -> String {
        match self.done.await {
            Ok(text) => text,
            Err(_) => {
                tracing::warn!(job_id = %self.job_id, "Completion channel closed without a result");
                lock(&self.state).latest_result.clone()
            }
        }
    }
}

/// Publishes the job outcome and frees the slot exactly once.
struct BusyRelease {
    state: Arc<Mutex<GateState>>,
    job_id: Uuid,
    done: Option<oneshot::Sender<String>>,
}

impl BusyRelease {
    fn publish(mut self, status: JobStatus, text: String) {
        self.finish(status, text);
    }

    fn finish(&mut self, status: JobStatus, text: String) {
        let Some(done) = self.done.take() else {
            return;
        };

        {
            let mut state = lock(&self.state);
            if let Some(job) = state.job.as_mut().filter(|job| job.id == self.job_id) {
                job.finish(status, text.clone());
            }
            state.latest_result = text.clone();
            state.busy = false;
        }
        metrics::gauge!("classification_busy").set(0.0);

        // The caller may have disconnected; the result stays published either way.
        let _ = done.send(text);
    }
}

impl Drop for BusyRelease {
    fn drop(&mut self) {
        if self.done.is_some() {
            tracing::error!(job_id = %self.job_id, "Job ended without publishing a result");
            metrics::counter!("classification_jobs_failed").increment(1);
            self.finish(JobStatus::Failed, ABORTED_RESULT.to_string());
        }
    }
}

impl Gate {
    pub fn new(classifier: Arc<dyn Classifier>, policy: JobPolicy) -> Self {
        Self {
            state: Arc::new(Mutex::new(GateState {
                busy: false,
                job: None,
                preview: None,
                latest_result: INITIAL_RESULT.to_string(),
            })),
            classifier,
            policy,
        }
    }

    /// Claim the slot for `bytes`, or `None` if a job is already admitted.
    ///
    /// The check and the claim happen under one lock acquisition. On success
    /// the bytes also become the latest preview image.
    pub fn try_admit(&self, bytes: Bytes) -> Option<Admission> {
        let job = {
            let mut state = lock(&self.state);
            if state.busy {
                return None;
            }
            let job = UploadJob::admitted(bytes.len());
            state.busy = true;
            state.job = Some(job.clone());
            state.preview = Some(bytes.clone());
            job
        };
        metrics::gauge!("classification_busy").set(1.0);

        let (tx, rx) = oneshot::channel();
        Some(Admission {
            ticket: JobTicket {
                job_id: job.id,
                bytes,
                release: BusyRelease {
                    state: Arc::clone(&self.state),
                    job_id: job.id,
                    done: Some(tx),
                },
            },
            pending: PendingResult {
                job_id: job.id,
                done: rx,
                state: Arc::clone(&self.state),
            },
        })
    }

    /// Decode and classify an admitted upload, then publish the outcome.
    ///
    /// Failures become the published text. The slot is released when the
    /// ticket's guard is consumed or dropped.
    pub async fn run_job(&self, ticket: JobTicket) {
        let JobTicket {
            job_id,
            bytes,
            release,
        } = ticket;
        let start = Instant::now();
        tracing::info!(job_id = %job_id, bytes = bytes.len(), "Classification job started");

        match self.classify_bytes(&bytes).await {
            Ok(result) => {
                tracing::info!(
                    job_id = %job_id,
                    item = result.item.as_deref().unwrap_or("unknown"),
                    category = %result.category,
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "Classification complete"
                );
                metrics::counter!("classification_jobs_completed").increment(1);
                release.publish(JobStatus::Done, result.text);
            }
            Err(e) => {
                tracing::warn!(
                    job_id = %job_id,
                    error = %e,
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "Classification job failed"
                );
                metrics::counter!("classification_jobs_failed").increment(1);
                release.publish(JobStatus::Failed, format!("Error: {e}"));
            }
        }

        metrics::histogram!("classification_job_seconds").record(start.elapsed().as_secs_f64());
    }

    async fn classify_bytes(&self, bytes: &[u8]) -> Result<ClassificationResult, JobError> {
        let image = decode_with_retry(bytes, &self.policy.decode).await?;

        let timeout = self.policy.classify_timeout;
        let result = tokio::time::timeout(timeout, self.classifier.classify(&image))
            .await
            .map_err(|_| ClassifyError::Timeout(timeout))??;
        Ok(result)
    }

    /// Admit, run on its own task, and wait for the outcome.
    pub async fn submit(&self, bytes: Bytes) -> UploadOutcome {
        let Some(Admission { ticket, pending }) = self.try_admit(bytes) else {
            tracing::info!("Upload rejected, classification already in progress");
            metrics::counter!("uploads_busy_total").increment(1);
            return UploadOutcome::Busy;
        };

        let gate = self.clone();
        tokio::spawn(async move { gate.run_job(ticket).await });

        UploadOutcome::Completed(pending.await_result().await)
    }

    /// Most recently admitted image bytes, regardless of how its job ended.
    pub fn peek_preview(&self) -> Option<Bytes> {
        lock(&self.state).preview.clone()
    }

    pub fn latest_result(&self) -> String {
        lock(&self.state).latest_result.clone()
    }

    pub fn is_busy(&self) -> bool {
        lock(&self.state).busy
    }

    pub fn snapshot(&self) -> GateSnapshot {
        let state = lock(&self.state);
        GateSnapshot {
            busy: state.busy,
            status: state.job.as_ref().map_or(JobStatus::Idle, |job| job.status),
            job: state.job.clone(),
            latest_result: state.latest_result.clone(),
        }
    }
}

/// Anything that can go wrong inside one job.
#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Classification(#[from] ClassifyError),
}
