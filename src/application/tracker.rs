//! Progress bookkeeping and read-side aggregates over the job store.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::application::repos::{JobHistoryFilter, JobStore, RepoError};
use crate::domain::entities::{JobProgress, JobRecord};
use crate::domain::types::{JobStatus, PipelineStep};

pub const DEFAULT_HISTORY_LIMIT: u32 = 20;
pub const MAX_HISTORY_LIMIT: u32 = 100;
const ESTIMATE_SAMPLE: u32 = 50;
const ESTIMATE_WINDOW: Duration = Duration::days(7);
/// Minutes of queue wait assumed per queued job when estimating.
const QUEUE_WAIT_MINUTES_PER_JOB: f64 = 5.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QualityStatistics {
    pub scored_jobs: u64,
    pub average_overall: f64,
    pub average_completeness: f64,
    pub average_clarity: f64,
    pub average_accuracy: f64,
    pub min_overall: Option<u8>,
    pub max_overall: Option<u8>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobStatistics {
    pub team_id: Option<String>,
    pub period_days: u32,
    pub total_jobs: u64,
    pub status_counts: BTreeMap<String, u64>,
    pub success_rate: f64,
    pub average_processing_seconds: Option<f64>,
    pub quality: QualityStatistics,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueueStatus {
    pub queued_jobs: u64,
    pub processing_jobs: u64,
    pub max_concurrent_jobs: u32,
    pub system_load_percentage: f64,
    pub oldest_queued_seconds: Option<i64>,
    pub estimated_queue_wait_minutes: f64,
}

pub struct StatusTracker {
    store: Arc<dyn JobStore>,
    max_concurrent: u32,
    default_estimate: Duration,
}

impl StatusTracker {
    pub fn new(store: Arc<dyn JobStore>, max_concurrent: u32, default_estimate: Duration) -> Self {
        Self {
            store,
            max_concurrent: max_concurrent.max(1),
            default_estimate,
        }
    }

    pub fn max_concurrent(&self) -> u32 {
        self.max_concurrent
    }

    /// Progress snapshot for a running step; the estimate spreads the default job
    /// duration evenly over the remaining steps.
    pub fn progress_for(&self, step: PipelineStep, completed: u32, now: OffsetDateTime) -> JobProgress {
        let remaining = PipelineStep::TOTAL.saturating_sub(completed);
        let per_step = self.default_estimate / PipelineStep::TOTAL as f64;
        JobProgress::at_step(step, completed, Some(now + per_step * remaining as f64))
    }

    /// Record that `step` is now running. Returns `false` when the job is no longer processing.
    pub async fn update_progress(
        &self,
        job_id: Uuid,
        step: PipelineStep,
        completed: u32,
    ) -> Result<bool, RepoError> {
        let progress = self.progress_for(step, completed, OffsetDateTime::now_utc());
        self.store.update_progress(job_id, &progress).await
    }

    pub async fn history(&self, mut filter: JobHistoryFilter) -> Result<Vec<JobRecord>, RepoError> {
        filter.limit = clamp_limit(filter.limit);
        self.store.list_jobs(&filter).await
    }

    pub async fn active(&self) -> Result<Vec<JobRecord>, RepoError> {
        self.store.list_active().await
    }

    pub async fn statistics(
        &self,
        team_id: Option<&str>,
        days: u32,
    ) -> Result<JobStatistics, RepoError> {
        let days = days.max(1);
        let since = OffsetDateTime::now_utc() - Duration::days(i64::from(days));
        let jobs = self.store.list_created_since(team_id, since).await?;
        Ok(summarize(team_id, days, &jobs))
    }

    pub async fn estimate_completion(
        &self,
        job: &JobRecord,
    ) -> Result<Option<OffsetDateTime>, RepoError> {
        match job.status {
            status if status.is_terminal() => Ok(job.completed_at),
            JobStatus::Processing => Ok(job.progress.estimated_completion),
            _ => {
                let average = self.average_processing_time().await?;
                let ahead = self.store.count_active_before(job.created_at).await?;
                let wait = average * (ahead as f64 / f64::from(self.max_concurrent));
                Ok(Some(OffsetDateTime::now_utc() + wait + average))
            }
        }
    }

    pub async fn queue_status(&self) -> Result<QueueStatus, RepoError> {
        let queued = self.store.count_by_status(JobStatus::Queued).await?;
        let processing = self.store.count_by_status(JobStatus::Processing).await?;
        let oldest = self.store.oldest_queued_at().await?;
        let max = f64::from(self.max_concurrent);

        Ok(QueueStatus {
            queued_jobs: queued,
            processing_jobs: processing,
            max_concurrent_jobs: self.max_concurrent,
            system_load_percentage: round2(processing as f64 / max * 100.0),
            oldest_queued_seconds: oldest
                .map(|created| (OffsetDateTime::now_utc() - created).whole_seconds().max(0)),
            estimated_queue_wait_minutes: round2(
                queued as f64 * QUEUE_WAIT_MINUTES_PER_JOB / max,
            ),
        })
    }

    async fn average_processing_time(&self) -> Result<Duration, RepoError> {
        let since = OffsetDateTime::now_utc() - ESTIMATE_WINDOW;
        let samples = self
            .store
            .recent_processing_seconds(since, ESTIMATE_SAMPLE)
            .await?;
        if samples.is_empty() {
            return Ok(self.default_estimate);
        }
        let mean = samples.iter().sum::<f64>() / samples.len() as f64;
        Ok(Duration::seconds_f64(mean))
    }
}

pub fn clamp_limit(limit: u32) -> u32 {
    if limit == 0 {
        DEFAULT_HISTORY_LIMIT
    } else {
        limit.min(MAX_HISTORY_LIMIT)
    }
}

fn summarize(team_id: Option<&str>, days: u32, jobs: &[JobRecord]) -> JobStatistics {
    let mut status_counts: BTreeMap<String, u64> = JobStatus::ALL
        .iter()
        .map(|status| (status.as_str().to_string(), 0))
        .collect();
    for job in jobs {
        *status_counts.entry(job.status.as_str().to_string()).or_default() += 1;
    }

    let total = jobs.len() as u64;
    let completed = status_counts
        .get(JobStatus::Completed.as_str())
        .copied()
        .unwrap_or_default();
    let success_rate = if total == 0 {
        0.0
    } else {
        round2(completed as f64 / total as f64 * 100.0)
    };

    let durations: Vec<f64> = jobs
        .iter()
        .filter(|job| job.status == JobStatus::Completed)
        .filter_map(JobRecord::processing_seconds)
        .collect();
    let average_processing_seconds = (!durations.is_empty())
        .then(|| round2(durations.iter().sum::<f64>() / durations.len() as f64));

    JobStatistics {
        team_id: team_id.map(str::to_string),
        period_days: days,
        total_jobs: total,
        status_counts,
        success_rate,
        average_processing_seconds,
        quality: quality_statistics(jobs),
    }
}

fn quality_statistics(jobs: &[JobRecord]) -> QualityStatistics {
    let scored: Vec<_> = jobs.iter().filter_map(|job| job.quality.as_ref()).collect();
    let mean = |pick: fn(&crate::domain::entities::QualityMetrics) -> u8| {
        if scored.is_empty() {
            0.0
        } else {
            round2(scored.iter().map(|q| f64::from(pick(q))).sum::<f64>() / scored.len() as f64)
        }
    };

    QualityStatistics {
        scored_jobs: scored.len() as u64,
        average_overall: mean(|q| q.overall_score),
        average_completeness: mean(|q| q.completeness),
        average_clarity: mean(|q| q.clarity),
        average_accuracy: mean(|q| q.accuracy),
        min_overall: scored.iter().map(|q| q.overall_score).min(),
        max_overall: scored.iter().map(|q| q.overall_score).max(),
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::QualityMetrics;
    use crate::domain::types::{OutputFormat, SpecFormat};
    use crate::infra::memory::MemoryJobStore;

    fn job(status: JobStatus, created_at: OffsetDateTime) -> JobRecord {
        JobRecord {
            id: Uuid::new_v4(),
            team_id: "team".into(),
            service_name: "svc".into(),
            spec_format: SpecFormat::OpenApi,
            specification: serde_json::json!({}),
            specification_hash: String::new(),
            source_url: None,
            output_formats: vec![OutputFormat::Markdown],
            status,
            progress: JobProgress::queued(created_at),
            cancel_requested: false,
            results: BTreeMap::new(),
            quality: None,
            failure: None,
            created_at,
            started_at: None,
            completed_at: None,
            updated_at: created_at,
        }
    }

    #[test]
    fn statistics_summarise_counts_rates_and_quality() {
        let now = OffsetDateTime::now_utc();
        let mut done = job(JobStatus::Completed, now);
        done.started_at = Some(now);
        done.completed_at = Some(now + Duration::seconds(120));
        done.quality = Some(QualityMetrics::new(80, 70, 90, Vec::new()));
        let mut other = done.clone();
        other.completed_at = Some(now + Duration::seconds(60));
        other.quality = Some(QualityMetrics::new(60, 60, 60, Vec::new()));
        let failed = job(JobStatus::Failed, now);
        let queued = job(JobStatus::Queued, now);

        let stats = summarize(Some("team"), 7, &[done, other, failed, queued]);
        assert_eq!(stats.total_jobs, 4);
        assert_eq!(stats.status_counts["completed"], 2);
        assert_eq!(stats.status_counts["cancelled"], 0);
        assert_eq!(stats.success_rate, 50.0);
        assert_eq!(stats.average_processing_seconds, Some(90.0));
        assert_eq!(stats.quality.scored_jobs, 2);
        assert_eq!(stats.quality.min_overall, Some(60));
        assert_eq!(stats.quality.max_overall, Some(80));
    }

    #[test]
    fn empty_statistics_have_zero_success_rate() {
        let stats = summarize(None, 7, &[]);
        assert_eq!(stats.success_rate, 0.0);
        assert_eq!(stats.average_processing_seconds, None);
        assert_eq!(stats.quality.average_overall, 0.0);
    }

    #[test]
    fn history_limit_is_clamped() {
        assert_eq!(clamp_limit(0), 20);
        assert_eq!(clamp_limit(5), 5);
        assert_eq!(clamp_limit(1000), 100);
    }

    #[tokio::test]
    async fn queued_estimate_accounts_for_jobs_ahead() {
        let store = Arc::new(MemoryJobStore::new());
        let tracker = StatusTracker::new(store.clone(), 2, Duration::seconds(300));
        let now = OffsetDateTime::now_utc();

        for offset in 0..4 {
            store
                .insert_job(&job(JobStatus::Queued, now - Duration::minutes(10 - offset)))
                .await
                .expect("insert");
        }
        let mine = job(JobStatus::Queued, now);
        store.insert_job(&mine).await.expect("insert");

        let before = OffsetDateTime::now_utc();
        let estimate = tracker
            .estimate_completion(&mine)
            .await
            .expect("estimate")
            .expect("some");
        // 4 ahead over 2 slots at 300s each, plus the job's own 300s.
        let expected = before + Duration::seconds(900);
        assert!((estimate - expected).abs() < Duration::seconds(5));

        let queue = tracker.queue_status().await.expect("queue");
        assert_eq!(queue.queued_jobs, 5);
        assert_eq!(queue.estimated_queue_wait_minutes, 12.5);
        assert_eq!(queue.system_load_percentage, 0.0);
        assert!(queue.oldest_queued_seconds.unwrap_or_default() >= 600);
    }

    #[test]
    fn step_progress_estimates_remaining_time() {
        let store = Arc::new(MemoryJobStore::new());
        let tracker = StatusTracker::new(store, 10, Duration::seconds(300));
        let now = OffsetDateTime::now_utc();
        let progress = tracker.progress_for(PipelineStep::Format, 2, now);
        assert_eq!(progress.percentage, 40);
        assert_eq!(progress.estimated_completion, Some(now + Duration::seconds(180)));
    }
}
