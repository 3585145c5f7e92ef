use std::sync::Arc;
use std::time::Instant;

use apalis::prelude::{Data, Error as ApalisError};
use time::OffsetDateTime;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::application::repos::{JobStore, JobTransition, RepoError, TransitionOutcome};
use crate::application::retry::retry_with_backoff;
use crate::application::tracker::StatusTracker;
use crate::domain::entities::{JobFailure, JobProgress, JobRecord};
use crate::domain::types::{FailureKind, JobStatus, PipelineStep};

use super::context::{JobWorkerContext, job_failed};
use super::pipeline::{Pipeline, PipelineState, StepError};
use super::queue::ExecuteJobTask;

pub const CANCELLED_LABEL: &str = "Cancelled by request";
pub const FAILED_LABEL: &str = "Documentation generation failed";

/// Why a delivered task was acknowledged without running the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// No job record exists for the task.
    Missing,
    /// Another delivery already moved the job out of `queued`.
    NotQueued(JobStatus),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionOutcome {
    Completed,
    Failed(StepError),
    /// Cancelled before `PipelineStep` started.
    Cancelled(PipelineStep),
    Skipped(SkipReason),
}

/// Claims documentation jobs and drives them through the pipeline.
pub struct TaskExecutor {
    store: Arc<dyn JobStore>,
    tracker: Arc<StatusTracker>,
    pipeline: Pipeline,
}

impl TaskExecutor {
    pub fn new(store: Arc<dyn JobStore>, tracker: Arc<StatusTracker>, pipeline: Pipeline) -> Self {
        Self {
            store,
            tracker,
            pipeline,
        }
    }

    /// Run one delivered execution request. Store errors surface as `Err` so the queue
    /// can redeliver; step failures are recorded on the job and reported as outcomes.
    pub async fn execute(&self, job_id: Uuid) -> Result<ExecutionOutcome, RepoError> {
        if self.store.find_job(job_id).await?.is_none() {
            warn!(
                target = "specdoc::application::jobs::executor",
                job_id = %job_id,
                "execution requested for unknown job"
            );
            return Ok(ExecutionOutcome::Skipped(SkipReason::Missing));
        }

        let claim = JobTransition::new(job_id, JobStatus::Queued, JobStatus::Processing)
            .with_progress(self.tracker.progress_for(
                PipelineStep::Parse,
                0,
                OffsetDateTime::now_utc(),
            ));
        let job = match self.store.transition(claim).await? {
            TransitionOutcome::Applied(job) => *job,
            TransitionOutcome::Conflict(actual) => {
                info!(
                    target = "specdoc::application::jobs::executor",
                    job_id = %job_id,
                    status = %actual,
                    "job already claimed or finished, acknowledging duplicate delivery"
                );
                return Ok(ExecutionOutcome::Skipped(SkipReason::NotQueued(actual)));
            }
        };

        info!(
            target = "specdoc::application::jobs::executor",
            job_id = %job_id,
            team_id = %job.team_id,
            service_name = %job.service_name,
            spec_format = %job.spec_format,
            "documentation job started"
        );

        self.run_pipeline(&job).await
    }

    async fn run_pipeline(&self, job: &JobRecord) -> Result<ExecutionOutcome, RepoError> {
        let mut state = PipelineState::default();
        let mut completed = 0;

        for step in PipelineStep::ALL {
            match self.cancel_requested(job.id).await {
                Ok(true) => return self.finish_cancelled(job.id, step, completed).await,
                Ok(false) => {}
                Err(err) => return self.finish_failed(job.id, err.at(step), completed).await,
            }

            if step != PipelineStep::Parse
                && let Err(err) = self.record_progress(job.id, step, completed).await
            {
                return self.finish_failed(job.id, err.at(step), completed).await;
            }

            let started = Instant::now();
            let result = self.pipeline.run(step, job, &mut state).await;
            let elapsed = started.elapsed();
            metrics::histogram!("specdoc_pipeline_step_ms", "step" => step.as_str())
                .record(elapsed.as_secs_f64() * 1000.0);

            if let Err(err) = result {
                return self.finish_failed(job.id, err, completed).await;
            }

            info!(
                target = "specdoc::application::jobs::executor",
                job_id = %job.id,
                step = step.as_str(),
                elapsed_ms = elapsed.as_millis() as u64,
                "pipeline step finished"
            );
            completed += 1;
        }

        match state.persisted {
            Some(TransitionOutcome::Applied(_)) => {
                metrics::counter!("specdoc_jobs_completed_total").increment(1);
                info!(
                    target = "specdoc::application::jobs::executor",
                    job_id = %job.id,
                    "documentation job completed"
                );
                Ok(ExecutionOutcome::Completed)
            }
            Some(TransitionOutcome::Conflict(actual)) => {
                warn!(
                    target = "specdoc::application::jobs::executor",
                    job_id = %job.id,
                    status = %actual,
                    "job left processing before results were persisted"
                );
                Ok(ExecutionOutcome::Skipped(SkipReason::NotQueued(actual)))
            }
            None => Err(RepoError::integrity(format!(
                "job `{}` finished the pipeline without persisting",
                job.id
            ))),
        }
    }

    async fn cancel_requested(&self, job_id: Uuid) -> Result<bool, StoreFailure> {
        let retried = retry_with_backoff(
            self.pipeline.retry_policy(),
            "store.cancel_check",
            RepoError::is_transient,
            |_| async move { self.store.find_job(job_id).await },
        )
        .await;
        retried
            .result
            .map(|job| job.is_some_and(|job| job.cancel_requested))
            .map_err(|error| StoreFailure::new(error, retried.attempts))
    }

    async fn record_progress(
        &self,
        job_id: Uuid,
        step: PipelineStep,
        completed: u32,
    ) -> Result<(), StoreFailure> {
        let retried = retry_with_backoff(
            self.pipeline.retry_policy(),
            "store.progress",
            RepoError::is_transient,
            |_| self.tracker.update_progress(job_id, step, completed),
        )
        .await;
        retried
            .result
            .map(|_| ())
            .map_err(|error| StoreFailure::new(error, retried.attempts))
    }

    /// Apply a terminal transition, retrying transient store errors.
    async fn write_terminal(
        &self,
        transition: JobTransition,
    ) -> Result<TransitionOutcome, RepoError> {
        retry_with_backoff(
            self.pipeline.retry_policy(),
            "store.finish",
            RepoError::is_transient,
            |_| {
                let transition = transition.clone();
                async move { self.store.transition(transition).await }
            },
        )
        .await
        .result
    }

    async fn finish_cancelled(
        &self,
        job_id: Uuid,
        before: PipelineStep,
        completed: u32,
    ) -> Result<ExecutionOutcome, RepoError> {
        let transition = JobTransition::new(job_id, JobStatus::Processing, JobStatus::Cancelled)
            .with_progress(JobProgress::finished(CANCELLED_LABEL, completed));
        if let TransitionOutcome::Conflict(actual) = self.write_terminal(transition).await? {
            return Ok(ExecutionOutcome::Skipped(SkipReason::NotQueued(actual)));
        }

        metrics::counter!("specdoc_jobs_cancelled_total").increment(1);
        info!(
            target = "specdoc::application::jobs::executor",
            job_id = %job_id,
            step = before.as_str(),
            "documentation job cancelled between steps"
        );
        Ok(ExecutionOutcome::Cancelled(before))
    }

    async fn finish_failed(
        &self,
        job_id: Uuid,
        err: StepError,
        completed: u32,
    ) -> Result<ExecutionOutcome, RepoError> {
        error!(
            target = "specdoc::application::jobs::executor",
            job_id = %job_id,
            step = err.step.as_str(),
            kind = err.kind.as_str(),
            attempts = err.attempts,
            error = %err.message,
            "documentation job failed"
        );

        let transition = JobTransition::new(job_id, JobStatus::Processing, JobStatus::Failed)
            .with_progress(JobProgress::finished(FAILED_LABEL, completed))
            .with_failure(JobFailure {
                step: err.step,
                kind: err.kind,
                message: err.message.clone(),
                attempts: err.attempts,
            });
        if let TransitionOutcome::Conflict(actual) = self.write_terminal(transition).await? {
            return Ok(ExecutionOutcome::Skipped(SkipReason::NotQueued(actual)));
        }

        metrics::counter!("specdoc_jobs_failed_total", "step" => err.step.as_str()).increment(1);
        Ok(ExecutionOutcome::Failed(err))
    }
}

/// A store call that still failed after retries while a job was processing.
struct StoreFailure {
    error: RepoError,
    attempts: u32,
}

impl StoreFailure {
    fn new(error: RepoError, attempts: u32) -> Self {
        Self { error, attempts }
    }

    fn at(self, step: PipelineStep) -> StepError {
        StepError::new(step, FailureKind::Storage, self.error.to_string())
            .with_attempts(self.attempts)
    }
}

/// apalis entry point for [`ExecuteJobTask`] deliveries.
pub async fn process_documentation_job(
    task: ExecuteJobTask,
    context: Data<JobWorkerContext>,
) -> Result<(), ApalisError> {
    let outcome = context
        .executor
        .execute(task.job_id)
        .await
        .map_err(job_failed)?;

    info!(
        target = "specdoc::application::jobs::process_documentation_job",
        job_id = %task.job_id,
        outcome = ?outcome,
        "execution request handled"
    );
    Ok(())
}
