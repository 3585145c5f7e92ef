use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::repos::{NewTaskRecord, RepoError, TaskQueue};
use crate::domain::types::TaskType;

const EXECUTE_JOB_PRIORITY: i32 = 10;

/// Queue payload asking a worker to run the pipeline for one documentation job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecuteJobTask {
    pub job_id: Uuid,
}

/// Enqueue a task with the provided payload, returning the queue-assigned id.
pub async fn enqueue_task<Q, P>(
    queue: &Q,
    task_type: TaskType,
    payload: &P,
    run_at: Option<OffsetDateTime>,
    max_attempts: i32,
    priority: i32,
) -> Result<String, RepoError>
where
    Q: TaskQueue + ?Sized,
    P: Serialize,
{
    let payload = serde_json::to_value(payload)
        .map_err(|err| RepoError::from_persistence(err.to_string()))?;
    let record = NewTaskRecord {
        task_type,
        payload,
        run_at: run_at.unwrap_or_else(OffsetDateTime::now_utc),
        max_attempts,
        priority,
    };

    queue.enqueue(record).await
}

pub async fn enqueue_execute_job<Q: TaskQueue + ?Sized>(
    queue: &Q,
    job_id: Uuid,
    delivery_attempts: u32,
) -> Result<String, RepoError> {
    let attempts = i32::try_from(delivery_attempts.max(1)).unwrap_or(i32::MAX);
    enqueue_task(
        queue,
        TaskType::ExecuteDocumentationJob,
        &ExecuteJobTask { job_id },
        None,
        attempts,
        EXECUTE_JOB_PRIORITY,
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::memory::MemoryTaskQueue;

    #[tokio::test]
    async fn execute_task_payload_carries_job_id() {
        let queue = MemoryTaskQueue::new();
        let job_id = Uuid::new_v4();

        enqueue_execute_job(&queue, job_id, 3).await.expect("enqueue");

        let tasks = queue.drain().await;
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].task_type, TaskType::ExecuteDocumentationJob);
        assert_eq!(tasks[0].max_attempts, 3);
        let payload: ExecuteJobTask =
            serde_json::from_value(tasks[0].payload.clone()).expect("payload");
        assert_eq!(payload.job_id, job_id);
    }
}
