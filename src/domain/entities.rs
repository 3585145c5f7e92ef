//! Domain entities mirrored from persistent storage.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::domain::types::{FailureKind, JobStatus, OutputFormat, PipelineStep, SpecFormat};

pub const QUEUED_LABEL: &str = "Queued for processing";
pub const INITIAL_ESTIMATE: Duration = Duration::minutes(5);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: Uuid,
    pub team_id: String,
    pub service_name: String,
    pub spec_format: SpecFormat,
    pub specification: serde_json::Value,
    pub specification_hash: String,
    pub source_url: Option<String>,
    pub output_formats: Vec<OutputFormat>,
    pub status: JobStatus,
    pub progress: JobProgress,
    pub cancel_requested: bool,
    pub results: BTreeMap<OutputFormat, Artifact>,
    pub quality: Option<QualityMetrics>,
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

impl JobRecord {
    /// Wall-clock processing time for jobs that reached a terminal state after starting.
    pub fn processing_seconds(&self) -> Option<f64> {
        let started = self.started_at?;
        let completed = self.completed_at?;
        let elapsed = completed - started;
        (!elapsed.is_negative()).then(|| elapsed.as_seconds_f64())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobProgress {
    pub current_step: String,
    pub total_steps: u32,
    pub completed_steps: u32,
    pub percentage: u32,
    #[serde(with = "time::serde::rfc3339::option")]
    pub estimated_completion: Option<OffsetDateTime>,
}

impl JobProgress {
    pub fn queued(now: OffsetDateTime) -> Self {
        Self {
            current_step: QUEUED_LABEL.to_string(),
            total_steps: PipelineStep::TOTAL,
            completed_steps: 0,
            percentage: 0,
            estimated_completion: Some(now + INITIAL_ESTIMATE),
        }
    }

    /// Progress snapshot while `step` is running, with `completed` steps already done.
    pub fn at_step(
        step: PipelineStep,
        completed: u32,
        estimated_completion: Option<OffsetDateTime>,
    ) -> Self {
        let completed = completed.min(PipelineStep::TOTAL);
        Self {
            current_step: step.label().to_string(),
            total_steps: PipelineStep::TOTAL,
            completed_steps: completed,
            percentage: completed * 100 / PipelineStep::TOTAL,
            estimated_completion,
        }
    }

    pub fn finished(label: &str, completed: u32) -> Self {
        let completed = completed.min(PipelineStep::TOTAL);
        Self {
            current_step: label.to_string(),
            total_steps: PipelineStep::TOTAL,
            completed_steps: completed,
            percentage: completed * 100 / PipelineStep::TOTAL,
            estimated_completion: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    pub content: String,
    pub download_url: String,
    pub media_type: String,
    pub file_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityMetrics {
    pub completeness: u8,
    pub clarity: u8,
    pub accuracy: u8,
    pub overall_score: u8,
    pub suggestions: Vec<String>,
}

impl QualityMetrics {
    pub fn new(completeness: u8, clarity: u8, accuracy: u8, suggestions: Vec<String>) -> Self {
        let weighted = 0.4 * f64::from(completeness)
            + 0.3 * f64::from(clarity)
            + 0.3 * f64::from(accuracy);
        Self {
            completeness,
            clarity,
            accuracy,
            overall_score: weighted.round().clamp(0.0, 100.0) as u8,
            suggestions,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobFailure {
    pub step: PipelineStep,
    pub kind: FailureKind,
    pub message: String,
    pub attempts: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overall_score_is_weighted_and_rounded() {
        let metrics = QualityMetrics::new(90, 70, 85, Vec::new());
        // 36 + 21 + 25.5 = 82.5
        assert_eq!(metrics.overall_score, 83);

        let metrics = QualityMetrics::new(0, 0, 0, Vec::new());
        assert_eq!(metrics.overall_score, 0);
    }

    #[test]
    fn progress_percentage_rounds_down() {
        let progress = JobProgress::at_step(PipelineStep::Generate, 1, None);
        assert_eq!(progress.percentage, 20);
        assert_eq!(progress.current_step, "Generating documentation content");

        let progress = JobProgress::finished("done", 9);
        assert_eq!(progress.completed_steps, 5);
        assert_eq!(progress.percentage, 100);
    }

    #[test]
    fn queued_progress_estimates_five_minutes() {
        let now = OffsetDateTime::now_utc();
        let progress = JobProgress::queued(now);
        assert_eq!(progress.current_step, QUEUED_LABEL);
        assert_eq!(progress.estimated_completion, Some(now + Duration::minutes(5)));
    }
}
