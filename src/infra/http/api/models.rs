use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::service::{CancelEffect, CancelOutcome, JobStatusView};
use crate::domain::entities::{JobFailure, JobProgress, JobRecord, QualityMetrics};
use crate::domain::types::{JobStatus, OutputFormat, SpecFormat};

#[derive(Debug, Deserialize, Serialize)]
pub struct SubmitJobRequest {
    pub specification: Value,
    #[serde(default)]
    pub spec_format: Option<SpecFormat>,
    #[serde(default)]
    pub output_formats: Vec<OutputFormat>,
    pub team_id: String,
    pub service_name: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct SubmitFromUrlRequest {
    pub specification_url: String,
    #[serde(default)]
    pub spec_format: Option<SpecFormat>,
    #[serde(default)]
    pub output_formats: Vec<OutputFormat>,
    pub team_id: String,
    pub service_name: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct JobLinks {
    pub status: String,
    pub cancel: String,
    pub quality: String,
    pub downloads: BTreeMap<OutputFormat, String>,
}

impl JobLinks {
    pub fn for_job(base_url: &str, job: &JobRecord) -> Self {
        let job_url = format!("{base_url}/api/v1/jobs/{}", job.id);
        let downloads = job
            .output_formats
            .iter()
            .map(|format| (*format, format!("{job_url}/download/{}", format.as_str())))
            .collect();
        Self {
            status: job_url.clone(),
            cancel: job_url.clone(),
            quality: format!("{job_url}/quality"),
            downloads,
        }
    }
}

/// Body of the 202 answer to a submission.
#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitJobResponse {
    pub job_id: Uuid,
    pub status: JobStatus,
    pub progress: JobProgress,
    pub links: JobLinks,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ArtifactLink {
    pub download_url: String,
    pub media_type: String,
    pub file_name: String,
}

/// A job as exposed over HTTP. Specification bodies and artifact contents stay server-side.
#[derive(Debug, Serialize, Deserialize)]
pub struct JobView {
    pub job_id: Uuid,
    pub team_id: String,
    pub service_name: String,
    pub spec_format: SpecFormat,
    pub specification_hash: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    pub output_formats: Vec<OutputFormat>,
    pub status: JobStatus,
    pub progress: JobProgress,
    pub cancel_requested: bool,
    pub results: BTreeMap<OutputFormat, ArtifactLink>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality: Option<QualityMetrics>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<JobFailure>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub started_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub completed_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<JobRecord> for JobView {
    fn from(job: JobRecord) -> Self {
        let results = job
            .results
            .into_iter()
            .map(|(format, artifact)| {
                (
                    format,
                    ArtifactLink {
                        download_url: artifact.download_url,
                        media_type: artifact.media_type,
                        file_name: artifact.file_name,
                    },
                )
            })
            .collect();

        Self {
            job_id: job.id,
            team_id: job.team_id,
            service_name: job.service_name,
            spec_format: job.spec_format,
            specification_hash: job.specification_hash,
            source_url: job.source_url,
            output_formats: job.output_formats,
            status: job.status,
            progress: job.progress,
            cancel_requested: job.cancel_requested,
            results,
            quality: job.quality,
            failure: job.failure,
            created_at: job.created_at,
            started_at: job.started_at,
            completed_at: job.completed_at,
            updated_at: job.updated_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct JobStatusResponse {
    #[serde(flatten)]
    pub job: JobView,
    #[serde(with = "time::serde::rfc3339::option")]
    pub estimated_completion: Option<OffsetDateTime>,
}

impl From<JobStatusView> for JobStatusResponse {
    fn from(view: JobStatusView) -> Self {
        Self {
            job: JobView::from(view.job),
            estimated_completion: view.estimated_completion,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct JobListResponse {
    pub jobs: Vec<JobView>,
    pub count: usize,
}

impl From<Vec<JobRecord>> for JobListResponse {
    fn from(jobs: Vec<JobRecord>) -> Self {
        let jobs: Vec<JobView> = jobs.into_iter().map(JobView::from).collect();
        Self {
            count: jobs.len(),
            jobs,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CancelJobResponse {
    pub job_id: Uuid,
    pub status: JobStatus,
    pub cancelled: bool,
    pub effect: CancelEffect,
    pub message: &'static str,
}

impl From<CancelOutcome> for CancelJobResponse {
    fn from(outcome: CancelOutcome) -> Self {
        let (cancelled, message) = match outcome.effect {
            CancelEffect::Cancelled => (true, "Job cancelled"),
            CancelEffect::Requested => (
                true,
                "Cancellation requested; the job stops at the next step boundary",
            ),
            CancelEffect::AlreadyTerminal => (false, "Job already finished; nothing to cancel"),
            CancelEffect::Unchanged => (false, "Job is changing state; retry the cancellation"),
        };
        Self {
            job_id: outcome.job_id,
            status: outcome.status,
            cancelled,
            effect: outcome.effect,
            message,
        }
    }
}
