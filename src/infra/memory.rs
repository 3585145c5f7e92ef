//! In-process store and queue used by tests and single-node runs.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::{DashMap, mapref::entry::Entry};
use time::OffsetDateTime;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::application::repos::{
    JobHistoryFilter, JobStore, JobTransition, NewTaskRecord, RepoError, TaskQueue,
    TransitionOutcome,
};
use crate::domain::entities::{JobProgress, JobRecord};
use crate::domain::error::DomainError;
use crate::domain::types::JobStatus;

#[derive(Debug, Clone, Default)]
pub struct MemoryJobStore {
    jobs: Arc<DashMap<Uuid, JobRecord>>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    fn snapshot(&self) -> Vec<JobRecord> {
        self.jobs.iter().map(|entry| entry.value().clone()).collect()
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn insert_job(&self, job: &JobRecord) -> Result<(), RepoError> {
        match self.jobs.entry(job.id) {
            Entry::Occupied(_) => Err(RepoError::integrity(format!(
                "job `{}` already exists",
                job.id
            ))),
            Entry::Vacant(slot) => {
                slot.insert(job.clone());
                Ok(())
            }
        }
    }

    async fn find_job(&self, id: Uuid) -> Result<Option<JobRecord>, RepoError> {
        Ok(self.jobs.get(&id).map(|entry| entry.value().clone()))
    }

    async fn transition(&self, transition: JobTransition) -> Result<TransitionOutcome, RepoError> {
        DomainError::check_transition(transition.from, transition.to)?;

        // The entry guard holds the shard lock, making check-and-write atomic.
        let mut entry = self
            .jobs
            .get_mut(&transition.id)
            .ok_or(RepoError::NotFound)?;
        if entry.status != transition.from {
            return Ok(TransitionOutcome::Conflict(entry.status));
        }
        transition.apply_to(entry.value_mut());
        Ok(TransitionOutcome::Applied(Box::new(entry.value().clone())))
    }

    async fn update_progress(&self, id: Uuid, progress: &JobProgress) -> Result<bool, RepoError> {
        let mut entry = self.jobs.get_mut(&id).ok_or(RepoError::NotFound)?;
        if entry.status != JobStatus::Processing {
            return Ok(false);
        }
        entry.progress = progress.clone();
        entry.updated_at = OffsetDateTime::now_utc();
        Ok(true)
    }

    async fn request_cancel(&self, id: Uuid) -> Result<bool, RepoError> {
        let mut entry = self.jobs.get_mut(&id).ok_or(RepoError::NotFound)?;
        if entry.status != JobStatus::Processing {
            return Ok(false);
        }
        entry.cancel_requested = true;
        entry.updated_at = OffsetDateTime::now_utc();
        Ok(true)
    }

    async fn list_jobs(&self, filter: &JobHistoryFilter) -> Result<Vec<JobRecord>, RepoError> {
        let mut jobs: Vec<JobRecord> = self
            .snapshot()
            .into_iter()
            .filter(|job| filter.matches(job))
            .collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        jobs.truncate(filter.limit as usize);
        Ok(jobs)
    }

    async fn list_active(&self) -> Result<Vec<JobRecord>, RepoError> {
        let mut jobs: Vec<JobRecord> = self
            .snapshot()
            .into_iter()
            .filter(|job| job.status.is_active())
            .collect();
        jobs.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(jobs)
    }

    async fn list_created_since(
        &self,
        team_id: Option<&str>,
        since: OffsetDateTime,
    ) -> Result<Vec<JobRecord>, RepoError> {
        Ok(self
            .snapshot()
            .into_iter()
            .filter(|job| job.created_at >= since)
            .filter(|job| team_id.is_none_or(|team| job.team_id == team))
            .collect())
    }

    async fn count_by_status(&self, status: JobStatus) -> Result<u64, RepoError> {
        Ok(self
            .jobs
            .iter()
            .filter(|entry| entry.status == status)
            .count() as u64)
    }

    async fn count_active_before(&self, created_at: OffsetDateTime) -> Result<u64, RepoError> {
        Ok(self
            .jobs
            .iter()
            .filter(|entry| entry.status.is_active() && entry.created_at < created_at)
            .count() as u64)
    }

    async fn recent_processing_seconds(
        &self,
        since: OffsetDateTime,
        limit: u32,
    ) -> Result<Vec<f64>, RepoError> {
        let mut completed: Vec<JobRecord> = self
            .snapshot()
            .into_iter()
            .filter(|job| job.status == JobStatus::Completed)
            .filter(|job| job.completed_at.is_some_and(|at| at >= since))
            .collect();
        completed.sort_by(|a, b| b.completed_at.cmp(&a.completed_at));
        Ok(completed
            .iter()
            .filter_map(JobRecord::processing_seconds)
            .take(limit as usize)
            .collect())
    }

    async fn oldest_queued_at(&self) -> Result<Option<OffsetDateTime>, RepoError> {
        Ok(self
            .jobs
            .iter()
            .filter(|entry| entry.status == JobStatus::Queued)
            .map(|entry| entry.created_at)
            .min())
    }

    async fn purge_finished_before(&self, cutoff: OffsetDateTime) -> Result<u64, RepoError> {
        let before = self.jobs.len();
        self.jobs.retain(|_, job| {
            !(job.status.is_terminal() && job.completed_at.is_some_and(|at| at < cutoff))
        });
        Ok((before - self.jobs.len()) as u64)
    }

    async fn health_check(&self) -> Result<(), RepoError> {
        Ok(())
    }
}

/// Queue that records tasks instead of delivering them; callers drain and run them.
#[derive(Debug, Clone, Default)]
pub struct MemoryTaskQueue {
    tasks: Arc<Mutex<Vec<NewTaskRecord>>>,
}

impl MemoryTaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn drain(&self) -> Vec<NewTaskRecord> {
        std::mem::take(&mut *self.tasks.lock().await)
    }

    pub async fn pending(&self) -> usize {
        self.tasks.lock().await.len()
    }
}

#[async_trait]
impl TaskQueue for MemoryTaskQueue {
    async fn enqueue(&self, task: NewTaskRecord) -> Result<String, RepoError> {
        let mut tasks = self.tasks.lock().await;
        tasks.push(task);
        Ok(format!("memory-{}", tasks.len()))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use time::Duration;

    use super::*;
    use crate::domain::types::{OutputFormat, SpecFormat};

    fn record(status: JobStatus, created_at: OffsetDateTime) -> JobRecord {
        JobRecord {
            id: Uuid::new_v4(),
            team_id: "team".into(),
            service_name: "svc".into(),
            spec_format: SpecFormat::OpenApi,
            specification: serde_json::json!({"openapi": "3.0.0"}),
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

    #[tokio::test]
    async fn transition_is_compare_and_set() {
        let store = MemoryJobStore::new();
        let job = record(JobStatus::Queued, OffsetDateTime::now_utc());
        store.insert_job(&job).await.expect("insert");

        let first = store
            .transition(JobTransition::new(
                job.id,
                JobStatus::Queued,
                JobStatus::Processing,
            ))
            .await
            .expect("first claim");
        assert!(matches!(first, TransitionOutcome::Applied(ref r) if r.started_at.is_some()));

        let second = store
            .transition(JobTransition::new(
                job.id,
                JobStatus::Queued,
                JobStatus::Processing,
            ))
            .await
            .expect("second claim");
        assert_eq!(second, TransitionOutcome::Conflict(JobStatus::Processing));
    }

    #[tokio::test]
    async fn illegal_edges_are_rejected_before_touching_state() {
        let store = MemoryJobStore::new();
        let job = record(JobStatus::Completed, OffsetDateTime::now_utc());
        store.insert_job(&job).await.expect("insert");

        let err = store
            .transition(JobTransition::new(
                job.id,
                JobStatus::Completed,
                JobStatus::Queued,
            ))
            .await
            .expect_err("terminal state must not move");
        assert!(matches!(err, RepoError::Integrity { .. }));
        let stored = store.find_job(job.id).await.expect("find").expect("exists");
        assert_eq!(stored.status, JobStatus::Completed);
    }

    #[tokio::test]
    async fn purge_only_removes_expired_terminal_jobs() {
        let store = MemoryJobStore::new();
        let now = OffsetDateTime::now_utc();

        let mut old_done = record(JobStatus::Completed, now - Duration::hours(48));
        old_done.completed_at = Some(now - Duration::hours(47));
        let mut fresh_done = record(JobStatus::Failed, now - Duration::hours(1));
        fresh_done.completed_at = Some(now - Duration::minutes(30));
        let old_queued = record(JobStatus::Queued, now - Duration::hours(72));

        for job in [&old_done, &fresh_done, &old_queued] {
            store.insert_job(job).await.expect("insert");
        }

        let purged = store
            .purge_finished_before(now - Duration::hours(24))
            .await
            .expect("purge");
        assert_eq!(purged, 1);
        assert!(store.find_job(old_done.id).await.expect("find").is_none());
        assert!(store.find_job(fresh_done.id).await.expect("find").is_some());
        assert!(store.find_job(old_queued.id).await.expect("find").is_some());
    }

    #[tokio::test]
    async fn progress_updates_only_apply_while_processing() {
        let store = MemoryJobStore::new();
        let job = record(JobStatus::Queued, OffsetDateTime::now_utc());
        store.insert_job(&job).await.expect("insert");

        let progress = JobProgress::finished("x", 1);
        assert!(!store.update_progress(job.id, &progress).await.expect("update"));
        assert!(!store.request_cancel(job.id).await.expect("cancel"));
    }
}
