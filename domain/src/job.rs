//! Generation job status reports.
//!
//! GPU and voice providers call back with a job's status in their own
//! vocabulary. This module normalizes the report and emits the domain event
//! that pushes the change to the job owner's open tabs.

use crate::error::{validation_error, Error, ValidationErrorKind};
use chrono::Utc;
use events::{DomainEvent, EventPublisher};
use log::*;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;

const MAX_PROGRESS: u8 = 100;

/// What a generation job produces. Doubles as the SSE category, so a page
/// showing only video work can subscribe to `video`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobKind {
    Image,
    Video,
    Voice,
}

impl JobKind {
    pub fn category(&self) -> &'static str {
        match self {
            JobKind::Image => "image",
            JobKind::Video => "video",
            JobKind::Voice => "voice",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    InProgress,
    Completed,
    Failed,
    Cancelled,
    TimedOut,
}

impl JobStatus {
    /// Maps a provider status (`IN_QUEUE`, `COMPLETED`, ...) or one of our own
    /// lower-case names to a status.
    pub fn from_provider_status(raw: &str) -> Result<Self, Error> {
        match raw.trim() {
            "IN_QUEUE" | "queued" => Ok(JobStatus::Queued),
            "IN_PROGRESS" | "in_progress" | "processing" => Ok(JobStatus::InProgress),
            "COMPLETED" | "completed" => Ok(JobStatus::Completed),
            "FAILED" | "failed" => Ok(JobStatus::Failed),
            "CANCELLED" | "cancelled" => Ok(JobStatus::Cancelled),
            "TIMED_OUT" | "timed_out" => Ok(JobStatus::TimedOut),
            other => Err(validation_error(
                ValidationErrorKind::UnknownStatus,
                &format!("Unknown job status: {other}"),
            )),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::InProgress => "in_progress",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Cancelled => "cancelled",
            JobStatus::TimedOut => "timed_out",
        }
    }

    /// No further reports are expected for the job.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobStatus::Queued | JobStatus::InProgress)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Body of a job-status callback.
#[derive(Debug, Clone, Deserialize)]
pub struct JobStatusUpdate {
    pub job_id: String,
    /// Owner of the job; the user whose tabs are notified.
    pub user_id: String,
    pub kind: JobKind,
    /// Provider status string, see [`JobStatus::from_provider_status`].
    pub status: String,
    #[serde(default)]
    pub progress: Option<u8>,
    #[serde(default)]
    pub output_urls: Vec<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl JobStatusUpdate {
    fn validate(&self) -> Result<JobStatus, Error> {
        if self.job_id.trim().is_empty() {
            return Err(validation_error(ValidationErrorKind::Invalid, "job_id must not be empty"));
        }
        if self.user_id.trim().is_empty() {
            return Err(validation_error(ValidationErrorKind::Invalid, "user_id must not be empty"));
        }
        if let Some(progress) = self.progress {
            if progress > MAX_PROGRESS {
                return Err(validation_error(
                    ValidationErrorKind::Invalid,
                    &format!("progress must be at most {MAX_PROGRESS}, got {progress}"),
                ));
            }
        }

        JobStatus::from_provider_status(&self.status)
    }

    fn snapshot(&self, status: JobStatus, error: Option<&str>) -> Value {
        let progress = match status {
            JobStatus::Completed => Some(self.progress.unwrap_or(MAX_PROGRESS)),
            _ => self.progress,
        };

        json!({
            "id": self.job_id,
            "kind": self.kind,
            "status": status,
            "progress": progress,
            "output_urls": self.output_urls,
            "error": error,
            "updated_at": Utc::now().to_rfc3339(),
        })
    }
}

/// Validates a provider status report and notifies the job owner.
/// Returns the normalized status.
pub async fn report_status(
    publisher: &EventPublisher,
    update: JobStatusUpdate,
) -> Result<JobStatus, Error> {
    let status = update.validate()?;
    debug!(
        "Job {} ({}) reported {} as {}",
        update.job_id,
        update.kind.category(),
        update.status,
        status
    );

    let category = update.kind.category().to_string();
    let notify_user_ids = vec![update.user_id.clone()];

    let event = match status {
        JobStatus::Queued | JobStatus::InProgress => DomainEvent::GenerationJobProgressed {
            job_id: update.job_id.clone(),
            category,
            job: update.snapshot(status, None),
            notify_user_ids,
        },
        JobStatus::Completed => DomainEvent::GenerationJobCompleted {
            job_id: update.job_id.clone(),
            category,
            job: update.snapshot(status, None),
            notify_user_ids,
        },
        JobStatus::Failed | JobStatus::Cancelled | JobStatus::TimedOut => {
            let error = update
                .error
                .clone()
                .filter(|e| !e.trim().is_empty())
                .unwrap_or_else(|| status.as_str().to_string());
            warn!("Job {} ended as {}: {}", update.job_id, status, error);

            DomainEvent::GenerationJobFailed {
                job_id: update.job_id.clone(),
                category,
                job: update.snapshot(status, Some(&error)),
                error,
                notify_user_ids,
            }
        }
    };

    publisher.publish(event).await;
    Ok(status)
}
