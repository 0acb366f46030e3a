//! Live preview of the latest upload plus a log of classification results.
//!
//! A periodic task reads the gate's published state and pushes it to a
//! [`DisplaySurface`]. It never writes gate state and never waits on a job.

use std::collections::VecDeque;
use std::io::Cursor;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use image::{DynamicImage, ImageFormat};
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use uuid::Uuid;

use crate::models::job::JobStatus;
use crate::services::classifier::orient;
use crate::services::decoder::{decode_with_retry, RetryPolicy};
use crate::services::gate::Gate;

#[derive(Debug, Clone, Copy)]
pub struct PreviewSettings {
    pub interval: Duration,
    pub max_width: u32,
    pub max_height: u32,
    pub decode: RetryPolicy,
}

/// Where preview frames and result lines end up.
pub trait DisplaySurface: Send + Sync {
    /// Show an oriented, downsampled frame.
    fn show_frame(&self, frame: DynamicImage);

    /// Append a finished job's result text.
    fn log_result(&self, text: &str);
}

/// Spawn the polling task. Abort the returned handle to stop it.
pub fn spawn_preview_loop(
    gate: Gate,
    surface: Arc<dyn DisplaySurface>,
    settings: PreviewSettings,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(settings.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut cursor = PreviewCursor::default();

        loop {
            ticker.tick().await;
            cursor.refresh(&gate, surface.as_ref(), &settings).await;
        }
    })
}

/// What the loop has already pushed to the surface.
#[derive(Default)]
struct PreviewCursor {
    shown: Option<Bytes>,
    logged_job: Option<Uuid>,
}

impl PreviewCursor {
    async fn refresh(
        &mut self,
        gate: &Gate,
        surface: &dyn DisplaySurface,
        settings: &PreviewSettings,
    ) {
        if let Some(bytes) = gate.peek_preview() {
            if !self.already_shown(&bytes) {
                self.shown = Some(bytes.clone());
                match decode_with_retry(&bytes, &settings.decode).await {
                    Ok(image) => {
                        let frame =
                            orient(&image).thumbnail(settings.max_width, settings.max_height);
                        surface.show_frame(frame);
                    }
                    Err(e) => tracing::warn!(error = %e, "Preview frame skipped"),
                }
            }
        }

        let snapshot = gate.snapshot();
        if let Some(job) = snapshot.job {
            let finished = matches!(job.status, JobStatus::Done | JobStatus::Failed);
            if finished && self.logged_job != Some(job.id) {
                self.logged_job = Some(job.id);
                surface.log_result(job.result.as_deref().unwrap_or(&snapshot.latest_result));
            }
        }
    }

    /// Same upload buffer as last time (the gate hands out clones of one allocation).
    fn already_shown(&self, bytes: &Bytes) -> bool {
        self.shown
            .as_ref()
            .is_some_and(|shown| shown.as_ptr() == bytes.as_ptr() && shown.len() == bytes.len())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    pub at: DateTime<Utc>,
    pub text: String,
}

/// In-memory display: latest frame as JPEG and a bounded, newest-first result log.
pub struct PreviewBoard {
    frame: Mutex<Option<Bytes>>,
    log: Mutex<VecDeque<LogEntry>>,
    capacity: usize,
}

impl PreviewBoard {
    pub fn new(capacity: usize) -> Self {
        Self {
            frame: Mutex::new(None),
            log: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity: capacity.max(1),
        }
    }

    pub fn frame_jpeg(&self) -> Option<Bytes> {
        self.frame
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn entries(&self) -> Vec<LogEntry> {
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }
}

impl DisplaySurface for PreviewBoard {
    fn show_frame(&self, frame: DynamicImage) {
        let rgb = DynamicImage::ImageRgb8(frame.to_rgb8());
        let mut buf = Vec::new();
        if let Err(e) = rgb.write_to(&mut Cursor::new(&mut buf), ImageFormat::Jpeg) {
            tracing::warn!(error = %e, "Failed to encode preview frame");
            return;
        }
        *self.frame.lock().unwrap_or_else(PoisonError::into_inner) = Some(Bytes::from(buf));
    }

    fn log_result(&self, text: &str) {
        tracing::info!(result = %text, "Result logged");
        let mut log = self.log.lock().unwrap_or_else(PoisonError::into_inner);
        log.push_front(LogEntry {
            at: Utc::now(),
            text: text.to_string(),
        });
        log.truncate(self.capacity);
    }
}
