//! Repository traits describing persistence adapters.

use std::collections::BTreeMap;

use async_trait::async_trait;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::entities::{Artifact, JobFailure, JobProgress, JobRecord, QualityMetrics};
use crate::domain::error::DomainError;
use crate::domain::types::{JobStatus, OutputFormat, TaskType};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("resource not found")]
    NotFound,
    #[error("database timeout")]
    Timeout,
    #[error("store unavailable: {message}")]
    Unavailable { message: String },
    #[error("integrity error: {message}")]
    Integrity { message: String },
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    pub fn integrity(message: impl Into<String>) -> Self {
        Self::Integrity {
            message: message.into(),
        }
    }

    /// Errors worth retrying: the store may answer on a later attempt.
    pub fn is_transient(&self) -> bool {
        matches!(self, RepoError::Timeout | RepoError::Unavailable { .. })
    }
}

impl From<DomainError> for RepoError {
    fn from(err: DomainError) -> Self {
        Self::integrity(err.to_string())
    }
}

/// Compare-and-set status change plus the fields written alongside it.
#[derive(Debug, Clone)]
pub struct JobTransition {
    pub id: Uuid,
    pub from: JobStatus,
    pub to: JobStatus,
    pub at: OffsetDateTime,
    pub progress: Option<JobProgress>,
    pub results: Option<BTreeMap<OutputFormat, Artifact>>,
    pub quality: Option<QualityMetrics>,
    pub failure: Option<JobFailure>,
}

impl JobTransition {
    pub fn new(id: Uuid, from: JobStatus, to: JobStatus) -> Self {
        Self {
            id,
            from,
            to,
            at: OffsetDateTime::now_utc(),
            progress: None,
            results: None,
            quality: None,
            failure: None,
        }
    }

    pub fn with_progress(mut self, progress: JobProgress) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn with_results(mut self, results: BTreeMap<OutputFormat, Artifact>) -> Self {
        self.results = Some(results);
        self
    }

    pub fn with_quality(mut self, quality: QualityMetrics) -> Self {
        self.quality = Some(quality);
        self
    }

    pub fn with_failure(mut self, failure: JobFailure) -> Self {
        self.failure = Some(failure);
        self
    }

    /// Apply the transition to an in-memory record whose status already matched `from`.
    pub fn apply_to(&self, record: &mut JobRecord) {
        record.status = self.to;
        record.updated_at = self.at;
        if self.to == JobStatus::Processing && record.started_at.is_none() {
            record.started_at = Some(self.at);
        }
        if self.to.is_terminal() {
            record.completed_at = Some(self.at);
        }
        if let Some(progress) = self.progress.as_ref() {
            record.progress = progress.clone();
        }
        if let Some(results) = self.results.as_ref() {
            record.results = results.clone();
        }
        if let Some(quality) = self.quality.as_ref() {
            record.quality = Some(quality.clone());
        }
        if let Some(failure) = self.failure.as_ref() {
            record.failure = Some(failure.clone());
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TransitionOutcome {
    Applied(Box<JobRecord>),
    /// The job was no longer in the expected state; carries the state observed instead.
    Conflict(JobStatus),
}

#[derive(Debug, Clone, Default)]
pub struct JobHistoryFilter {
    pub team_id: Option<String>,
    pub service_name: Option<String>,
    pub status: Option<JobStatus>,
    pub created_after: Option<OffsetDateTime>,
    pub created_before: Option<OffsetDateTime>,
    pub limit: u32,
}

impl JobHistoryFilter {
    pub fn matches(&self, job: &JobRecord) -> bool {
        self.team_id.as_deref().is_none_or(|team| job.team_id == team)
            && self
                .service_name
                .as_deref()
                .is_none_or(|service| job.service_name == service)
            && self.status.is_none_or(|status| job.status == status)
            && self.created_after.is_none_or(|after| job.created_at >= after)
            && self
                .created_before
                .is_none_or(|before| job.created_at <= before)
    }
}

#[async_trait]
pub trait JobStore: Send + Sync {
    async fn insert_job(&self, job: &JobRecord) -> Result<(), RepoError>;

    async fn find_job(&self, id: Uuid) -> Result<Option<JobRecord>, RepoError>;

    /// Move a job between lifecycle states if and only if it is still in `transition.from`.
    async fn transition(&self, transition: JobTransition) -> Result<TransitionOutcome, RepoError>;

    /// Overwrite progress while the job is processing. Returns `false` when it is not.
    async fn update_progress(&self, id: Uuid, progress: &JobProgress) -> Result<bool, RepoError>;

    /// Raise the cooperative cancellation flag on a processing job. Returns `false` when
    /// the job is not processing.
    async fn request_cancel(&self, id: Uuid) -> Result<bool, RepoError>;

    async fn list_jobs(&self, filter: &JobHistoryFilter) -> Result<Vec<JobRecord>, RepoError>;

    /// Queued and processing jobs, oldest first.
    async fn list_active(&self) -> Result<Vec<JobRecord>, RepoError>;

    async fn list_created_since(
        &self,
        team_id: Option<&str>,
        since: OffsetDateTime,
    ) -> Result<Vec<JobRecord>, RepoError>;

    async fn count_by_status(&self, status: JobStatus) -> Result<u64, RepoError>;

    /// Active jobs submitted strictly before `created_at`.
    async fn count_active_before(&self, created_at: OffsetDateTime) -> Result<u64, RepoError>;

    /// Processing durations of the most recent completed jobs, newest first.
    async fn recent_processing_seconds(
        &self,
        since: OffsetDateTime,
        limit: u32,
    ) -> Result<Vec<f64>, RepoError>;

    async fn oldest_queued_at(&self) -> Result<Option<OffsetDateTime>, RepoError>;

    /// Delete terminal jobs completed before `cutoff`, returning the number removed.
    async fn purge_finished_before(&self, cutoff: OffsetDateTime) -> Result<u64, RepoError>;

    async fn health_check(&self) -> Result<(), RepoError>;
}

#[derive(Debug, Clone)]
pub struct NewTaskRecord {
    pub task_type: TaskType,
    pub payload: serde_json::Value,
    pub run_at: OffsetDateTime,
    pub max_attempts: i32,
    pub priority: i32,
}

#[async_trait]
pub trait TaskQueue: Send + Sync {
    /// Hand a task to the queue, returning the queue-assigned id once it is acknowledged.
    async fn enqueue(&self, task: NewTaskRecord) -> Result<String, RepoError>;
}
