use async_trait::async_trait;

use crate::application::repos::{NewTaskRecord, RepoError, TaskQueue};

use super::{PostgresRepositories, map_sqlx_error};

#[async_trait]
impl TaskQueue for PostgresRepositories {
    async fn enqueue(&self, task: NewTaskRecord) -> Result<String, RepoError> {
        // `push_job` is installed by the apalis schema; the job type selects the worker.
        let id: String =
            sqlx::query_scalar("SELECT (apalis.push_job($1, $2::json, $3, $4, $5, $6)).id")
                .bind(task.task_type.as_str())
                .bind(&task.payload)
                .bind("Pending")
                .bind(task.run_at)
                .bind(task.max_attempts)
                .bind(task.priority)
                .fetch_one(self.pool())
                .await
                .map_err(map_sqlx_error)?;

        Ok(id)
    }
}
