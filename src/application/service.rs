//! Job submission, lookup and cancellation.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use time::OffsetDateTime;
use tracing::{info, warn};
use uuid::Uuid;

use crate::application::fetch::{FetchError, SpecFetcher, parse_spec_url};
use crate::application::jobs::{CANCELLED_LABEL, enqueue_execute_job};
use crate::application::quality_report::{
    AlertSeverity, Leaderboard, LeaderboardFilters, MonitoringReport, QualityAlert,
    QualityReporter, TeamStanding, TimePeriod,
};
use crate::application::repos::{
    JobHistoryFilter, JobStore, JobTransition, RepoError, TaskQueue, TransitionOutcome,
};
use crate::application::spec::{SpecError, normalize};
use crate::application::tracker::{JobStatistics, QueueStatus, StatusTracker};
use crate::domain::entities::{Artifact, JobProgress, JobRecord, QualityMetrics};
use crate::domain::types::{JobStatus, OutputFormat, SpecFormat};

pub const MAX_IDENTIFIER_LEN: usize = 128;
/// Label written when the queue refused a freshly created job.
pub const ENQUEUE_FAILED_LABEL: &str = "Could not be queued";
const CANCEL_ATTEMPTS: usize = 3;

#[derive(Debug, Error)]
pub enum JobServiceError {
    #[error("{0}")]
    Validation(String),
    #[error("job `{0}` not found")]
    NotFound(Uuid),
    #[error("failed to fetch specification from `{url}`: {source}")]
    Fetch {
        url: String,
        #[source]
        source: FetchError,
    },
    #[error(transparent)]
    Storage(#[from] RepoError),
}

impl JobServiceError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

impl From<SpecError> for JobServiceError {
    fn from(err: SpecError) -> Self {
        Self::Validation(err.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct SubmitJobCommand {
    pub specification: Value,
    pub spec_format: Option<SpecFormat>,
    pub output_formats: Vec<OutputFormat>,
    pub team_id: String,
    pub service_name: String,
}

#[derive(Debug, Clone)]
pub struct SubmitFromUrlCommand {
    pub specification_url: String,
    pub spec_format: Option<SpecFormat>,
    pub output_formats: Vec<OutputFormat>,
    pub team_id: String,
    pub service_name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct JobStatusView {
    pub job: JobRecord,
    pub estimated_completion: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CancelEffect {
    /// A queued job was cancelled immediately.
    Cancelled,
    /// A processing job was flagged; the executor stops it at the next step boundary.
    Requested,
    /// The job had already finished; nothing changed.
    AlreadyTerminal,
    /// The job kept changing state under every attempt; nothing changed.
    Unchanged,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CancelOutcome {
    pub job_id: Uuid,
    pub status: JobStatus,
    pub effect: CancelEffect,
}

/// Why an artifact cannot be served.
#[derive(Debug, Clone, PartialEq)]
pub enum ArtifactLookup {
    Ready(Artifact),
    NotCompleted(JobStatus),
    NotRequested,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthReport {
    pub healthy: bool,
    pub store_healthy: bool,
    pub queue: Option<QueueStatus>,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct SubmissionLimits {
    pub delivery_attempts: u32,
}

pub struct JobService {
    store: Arc<dyn JobStore>,
    queue: Arc<dyn TaskQueue>,
    fetcher: Arc<dyn SpecFetcher>,
    tracker: Arc<StatusTracker>,
    reports: QualityReporter,
    limits: SubmissionLimits,
}

impl JobService {
    pub fn new(
        store: Arc<dyn JobStore>,
        queue: Arc<dyn TaskQueue>,
        fetcher: Arc<dyn SpecFetcher>,
        tracker: Arc<StatusTracker>,
        limits: SubmissionLimits,
    ) -> Self {
        Self {
            reports: QualityReporter::new(store.clone()),
            store,
            queue,
            fetcher,
            tracker,
            limits,
        }
    }

    pub fn tracker(&self) -> &StatusTracker {
        &self.tracker
    }

    /// Validate and record a submission, then hand it to the queue. Invalid submissions
    /// never create a record.
    pub async fn submit(&self, command: SubmitJobCommand) -> Result<JobRecord, JobServiceError> {
        let team_id = identifier("team_id", &command.team_id)?;
        let service_name = identifier("service_name", &command.service_name)?;
        let output_formats = output_formats(command.output_formats);
        let normalized = normalize(command.specification, command.spec_format, None)?;

        let now = OffsetDateTime::now_utc();
        let job = JobRecord {
            id: Uuid::new_v4(),
            team_id,
            service_name,
            spec_format: normalized.format,
            specification: normalized.document,
            specification_hash: normalized.hash,
            source_url: None,
            output_formats,
            status: JobStatus::Queued,
            progress: JobProgress::queued(now),
            cancel_requested: false,
            results: Default::default(),
            quality: None,
            failure: None,
            created_at: now,
            started_at: None,
            completed_at: None,
            updated_at: now,
        };

        self.create_and_enqueue(job).await
    }

    pub async fn submit_from_url(
        &self,
        command: SubmitFromUrlCommand,
    ) -> Result<JobRecord, JobServiceError> {
        let url = parse_spec_url(&command.specification_url).map_err(|source| {
            JobServiceError::Fetch {
                url: command.specification_url.clone(),
                source,
            }
        })?;
        // Validate identifiers before spending a network round trip.
        let team_id = identifier("team_id", &command.team_id)?;
        let service_name = identifier("service_name", &command.service_name)?;

        let body = self
            .fetcher
            .fetch(&url)
            .await
            .map_err(|source| JobServiceError::Fetch {
                url: url.to_string(),
                source,
            })?;

        let normalized = normalize(
            Value::String(body),
            command.spec_format,
            Some(url.path()),
        )?;

        let now = OffsetDateTime::now_utc();
        let job = JobRecord {
            id: Uuid::new_v4(),
            team_id,
            service_name,
            spec_format: normalized.format,
            specification: normalized.document,
            specification_hash: normalized.hash,
            source_url: Some(url.to_string()),
            output_formats: output_formats(command.output_formats),
            status: JobStatus::Queued,
            progress: JobProgress::queued(now),
            cancel_requested: false,
            results: Default::default(),
            quality: None,
            failure: None,
            created_at: now,
            started_at: None,
            completed_at: None,
            updated_at: now,
        };

        self.create_and_enqueue(job).await
    }

    async fn create_and_enqueue(&self, job: JobRecord) -> Result<JobRecord, JobServiceError> {
        self.store.insert_job(&job).await?;

        if let Err(err) =
            enqueue_execute_job(self.queue.as_ref(), job.id, self.limits.delivery_attempts).await
        {
            warn!(
                target = "specdoc::application::service",
                job_id = %job.id,
                error = %err,
                "enqueue failed, withdrawing job"
            );
            let withdraw = JobTransition::new(job.id, JobStatus::Queued, JobStatus::Cancelled)
                .with_progress(JobProgress::finished(ENQUEUE_FAILED_LABEL, 0));
            if let Err(withdraw_err) = self.store.transition(withdraw).await {
                warn!(
                    target = "specdoc::application::service",
                    job_id = %job.id,
                    error = %withdraw_err,
                    "failed to withdraw unqueued job"
                );
            }
            return Err(err.into());
        }

        metrics::counter!("specdoc_jobs_submitted_total", "format" => job.spec_format.as_str())
            .increment(1);
        info!(
            target = "specdoc::application::service",
            job_id = %job.id,
            team_id = %job.team_id,
            service_name = %job.service_name,
            spec_format = %job.spec_format,
            "documentation job submitted"
        );
        Ok(job)
    }

    pub async fn get_status(&self, id: Uuid) -> Result<JobStatusView, JobServiceError> {
        let job = self.load(id).await?;
        let estimated_completion = self.tracker.estimate_completion(&job).await?;
        Ok(JobStatusView {
            job,
            estimated_completion,
        })
    }

    /// Cancel a job. Terminal jobs are left untouched; queued jobs are cancelled by CAS;
    /// processing jobs are flagged for the executor.
    pub async fn cancel(&self, id: Uuid) -> Result<CancelOutcome, JobServiceError> {
        for _ in 0..CANCEL_ATTEMPTS {
            let job = self.load(id).await?;
            match job.status {
                status if status.is_terminal() => {
                    return Ok(CancelOutcome {
                        job_id: id,
                        status,
                        effect: CancelEffect::AlreadyTerminal,
                    });
                }
                JobStatus::Queued => {
                    let transition =
                        JobTransition::new(id, JobStatus::Queued, JobStatus::Cancelled)
                            .with_progress(JobProgress::finished(CANCELLED_LABEL, 0));
                    if let TransitionOutcome::Applied(_) =
                        self.store.transition(transition).await?
                    {
                        metrics::counter!("specdoc_jobs_cancelled_total").increment(1);
                        info!(
                            target = "specdoc::application::service",
                            job_id = %id,
                            "queued job cancelled"
                        );
                        return Ok(CancelOutcome {
                            job_id: id,
                            status: JobStatus::Cancelled,
                            effect: CancelEffect::Cancelled,
                        });
                    }
                }
                _ => {
                    if self.store.request_cancel(id).await? {
                        info!(
                            target = "specdoc::application::service",
                            job_id = %id,
                            "cancellation requested for processing job"
                        );
                        return Ok(CancelOutcome {
                            job_id: id,
                            status: JobStatus::Processing,
                            effect: CancelEffect::Requested,
                        });
                    }
                }
            }
            // The job moved on between the read and the write; look again.
        }

        let job = self.load(id).await?;
        let effect = match job.status {
            status if status.is_terminal() => CancelEffect::AlreadyTerminal,
            JobStatus::Processing if job.cancel_requested => CancelEffect::Requested,
            _ => CancelEffect::Unchanged,
        };
        warn!(
            target = "specdoc::application::service",
            job_id = %id,
            status = %job.status,
            "job kept changing state while cancelling, reporting last seen state"
        );
        Ok(CancelOutcome {
            job_id: id,
            status: job.status,
            effect,
        })
    }

    pub async fn quality(&self, id: Uuid) -> Result<Option<QualityMetrics>, JobServiceError> {
        Ok(self.load(id).await?.quality)
    }

    pub async fn artifact(
        &self,
        id: Uuid,
        format: OutputFormat,
    ) -> Result<ArtifactLookup, JobServiceError> {
        let job = self.load(id).await?;
        if job.status != JobStatus::Completed {
            return Ok(ArtifactLookup::NotCompleted(job.status));
        }
        Ok(match job.results.get(&format) {
            Some(artifact) => ArtifactLookup::Ready(artifact.clone()),
            None => ArtifactLookup::NotRequested,
        })
    }

    pub async fn history(&self, filter: JobHistoryFilter) -> Result<Vec<JobRecord>, JobServiceError> {
        Ok(self.tracker.history(filter).await?)
    }

    pub async fn active(&self) -> Result<Vec<JobRecord>, JobServiceError> {
        Ok(self.tracker.active().await?)
    }

    pub async fn statistics(
        &self,
        team_id: Option<&str>,
        days: u32,
    ) -> Result<JobStatistics, JobServiceError> {
        Ok(self.tracker.statistics(team_id, days).await?)
    }

    pub async fn leaderboard(
        &self,
        filters: LeaderboardFilters,
    ) -> Result<Leaderboard, JobServiceError> {
        Ok(self.reports.leaderboard(filters).await?)
    }

    pub async fn team_standing(
        &self,
        team_id: &str,
        time_period: TimePeriod,
    ) -> Result<Option<TeamStanding>, JobServiceError> {
        Ok(self.reports.team_standing(team_id, time_period).await?)
    }

    pub async fn quality_alerts(
        &self,
        period_days: u32,
        team_id: Option<&str>,
        severity: Option<AlertSeverity>,
    ) -> Result<Vec<QualityAlert>, JobServiceError> {
        let alerts = self.reports.alerts(period_days, team_id, severity).await?;
        info!(
            target = "specdoc::application::service",
            period_days,
            team_id = team_id.unwrap_or("*"),
            alerts = alerts.len(),
            "quality alerts evaluated"
        );
        Ok(alerts)
    }

    pub async fn quality_monitoring(
        &self,
        period_days: u32,
    ) -> Result<MonitoringReport, JobServiceError> {
        Ok(self.reports.monitoring(period_days).await?)
    }

    pub async fn queue_status(&self) -> Result<QueueStatus, JobServiceError> {
        Ok(self.tracker.queue_status().await?)
    }

    pub async fn health(&self) -> HealthReport {
        let store_healthy = self.store.health_check().await.is_ok();
        let queue = if store_healthy {
            self.tracker.queue_status().await.ok()
        } else {
            None
        };
        HealthReport {
            healthy: store_healthy,
            store_healthy,
            queue,
            timestamp: OffsetDateTime::now_utc(),
        }
    }

    pub async fn store_health(&self) -> Result<(), RepoError> {
        self.store.health_check().await
    }

    async fn load(&self, id: Uuid) -> Result<JobRecord, JobServiceError> {
        self.store
            .find_job(id)
            .await?
            .ok_or(JobServiceError::NotFound(id))
    }
}

fn identifier(field: &str, value: &str) -> Result<String, JobServiceError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(JobServiceError::validation(format!("`{field}` is required")));
    }
    if trimmed.chars().count() > MAX_IDENTIFIER_LEN {
        return Err(JobServiceError::validation(format!(
            "`{field}` must be at most {MAX_IDENTIFIER_LEN} characters"
        )));
    }
    Ok(trimmed.to_string())
}

/// Deduplicate while keeping request order; an empty request means Markdown only.
fn output_formats(requested: Vec<OutputFormat>) -> Vec<OutputFormat> {
    let mut formats = Vec::with_capacity(requested.len());
    for format in requested {
        if !formats.contains(&format) {
            formats.push(format);
        }
    }
    if formats.is_empty() {
        formats.push(OutputFormat::Markdown);
    }
    formats
}
