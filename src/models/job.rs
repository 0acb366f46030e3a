use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Lifecycle of a classification job held by the gate.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Idle,
    Running,
    Done,
    Failed,
}

/// One decode + classify attempt for one uploaded image.
#[derive(Debug, Clone, Serialize)]
pub struct UploadJob {
    pub id: Uuid,
    pub status: JobStatus,
    pub byte_len: usize,
    pub result: Option<String>,
    pub created_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl UploadJob {
    pub fn admitted(byte_len: usize) -> Self {
        Self {
            id: Uuid::new_v4(),
            status: JobStatus::Running,
            byte_len,
            result: None,
            created_at: Utc::now(),
            finished_at: None,
        }
    }

    pub(crate) fn finish(&mut self, status: JobStatus, result: String) {
        self.status = status;
        self.result = Some(result);
        self.finished_at = Some(Utc::now());
    }
}

/// Point-in-time view of the gate for status reporting.
#[derive(Debug, Clone, Serialize)]
pub struct GateSnapshot {
    pub busy: bool,
    /// Status of the current job, `Idle` before the first upload.
    pub status: JobStatus,
    pub job: Option<UploadJob>,
    pub latest_result: String,
}
