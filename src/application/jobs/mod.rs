mod cleanup;
mod context;
mod executor;
mod pipeline;
mod queue;

pub use cleanup::{
    PURGE_SCHEDULE, PurgeContext, PurgeExpiredJobs, process_purge_expired_jobs,
    purge_expired_jobs, purge_schedule,
};
pub use context::{JobWorkerContext, job_failed};
pub use executor::{
    CANCELLED_LABEL, ExecutionOutcome, FAILED_LABEL, SkipReason, TaskExecutor,
    process_documentation_job,
};
pub use pipeline::{COMPLETED_LABEL, Pipeline, PipelineState, StepError};
pub use queue::{ExecuteJobTask, enqueue_execute_job, enqueue_task};
