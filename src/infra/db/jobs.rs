use std::collections::BTreeMap;
use std::convert::TryFrom;

use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder, types::Json};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    application::repos::{
        JobHistoryFilter, JobStore, JobTransition, RepoError, TransitionOutcome,
    },
    domain::{
        entities::{Artifact, JobFailure, JobProgress, JobRecord, QualityMetrics},
        error::DomainError,
        types::{JobStatus, OutputFormat, SpecFormat},
    },
};

use super::{PostgresRepositories, map_sqlx_error};

const JOB_COLUMNS: &str = "id, team_id, service_name, spec_format, specification, \
    specification_hash, source_url, output_formats, status, progress, cancel_requested, \
    results, quality, failure, created_at, started_at, completed_at, updated_at";

#[derive(sqlx::FromRow)]
struct JobRow {
    id: Uuid,
    team_id: String,
    service_name: String,
    spec_format: String,
    specification: serde_json::Value,
    specification_hash: String,
    source_url: Option<String>,
    output_formats: Json<Vec<OutputFormat>>,
    status: JobStatus,
    progress: Json<JobProgress>,
    cancel_requested: bool,
    results: Json<BTreeMap<OutputFormat, Artifact>>,
    quality: Option<Json<QualityMetrics>>,
    failure: Option<Json<JobFailure>>,
    created_at: OffsetDateTime,
    started_at: Option<OffsetDateTime>,
    completed_at: Option<OffsetDateTime>,
    updated_at: OffsetDateTime,
}

impl TryFrom<JobRow> for JobRecord {
    type Error = RepoError;

    fn try_from(row: JobRow) -> Result<Self, Self::Error> {
        let spec_format = SpecFormat::try_from(row.spec_format.as_str()).map_err(|_| {
            RepoError::from_persistence(format!("unknown spec format `{}`", row.spec_format))
        })?;

        Ok(Self {
            id: row.id,
            team_id: row.team_id,
            service_name: row.service_name,
            spec_format,
            specification: row.specification,
            specification_hash: row.specification_hash,
            source_url: row.source_url,
            output_formats: row.output_formats.0,
            status: row.status,
            progress: row.progress.0,
            cancel_requested: row.cancel_requested,
            results: row.results.0,
            quality: row.quality.map(|json| json.0),
            failure: row.failure.map(|json| json.0),
            created_at: row.created_at,
            started_at: row.started_at,
            completed_at: row.completed_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct StatusRow {
    status: JobStatus,
}

impl PostgresRepositories {
    fn select_jobs() -> QueryBuilder<'static, Postgres> {
        let mut qb = QueryBuilder::new("SELECT ");
        qb.push(JOB_COLUMNS);
        qb.push(" FROM documentation_jobs WHERE TRUE");
        qb
    }

    async fn fetch_jobs(
        &self,
        mut qb: QueryBuilder<'_, Postgres>,
    ) -> Result<Vec<JobRecord>, RepoError> {
        let rows = qb
            .build_query_as::<JobRow>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        rows.into_iter().map(JobRecord::try_from).collect()
    }

    async fn current_status(&self, id: Uuid) -> Result<JobStatus, RepoError> {
        let row = sqlx::query_as::<_, StatusRow>(
            "SELECT status FROM documentation_jobs WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;
        row.map(|row| row.status).ok_or(RepoError::NotFound)
    }
}

#[async_trait]
impl JobStore for PostgresRepositories {
    async fn insert_job(&self, job: &JobRecord) -> Result<(), RepoError> {
        sqlx::query(
            r#"
            INSERT INTO documentation_jobs (
                id, team_id, service_name, spec_format, specification, specification_hash,
                source_url, output_formats, status, progress, cancel_requested, results,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, FALSE, '{}'::jsonb, $11, $11)
            "#,
        )
        .bind(job.id)
        .bind(&job.team_id)
        .bind(&job.service_name)
        .bind(job.spec_format.as_str())
        .bind(&job.specification)
        .bind(&job.specification_hash)
        .bind(job.source_url.as_deref())
        .bind(Json(&job.output_formats))
        .bind(job.status)
        .bind(Json(&job.progress))
        .bind(job.created_at)
        .execute(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn find_job(&self, id: Uuid) -> Result<Option<JobRecord>, RepoError> {
        let mut qb = Self::select_jobs();
        qb.push(" AND id = ");
        qb.push_bind(id);
        Ok(self.fetch_jobs(qb).await?.into_iter().next())
    }

    async fn transition(&self, transition: JobTransition) -> Result<TransitionOutcome, RepoError> {
        DomainError::check_transition(transition.from, transition.to)?;

        // `WHERE status = from` is the compare half of the compare-and-set.
        let mut qb: QueryBuilder<'_, Postgres> =
            QueryBuilder::new("UPDATE documentation_jobs SET status = ");
        qb.push_bind(transition.to);
        qb.push(", updated_at = ");
        qb.push_bind(transition.at);
        if transition.to == JobStatus::Processing {
            qb.push(", started_at = COALESCE(started_at, ");
            qb.push_bind(transition.at);
            qb.push(")");
        }
        if transition.to.is_terminal() {
            qb.push(", completed_at = ");
            qb.push_bind(transition.at);
        }
        if let Some(progress) = transition.progress.as_ref() {
            qb.push(", progress = ");
            qb.push_bind(Json(progress.clone()));
        }
        if let Some(results) = transition.results.as_ref() {
            qb.push(", results = ");
            qb.push_bind(Json(results.clone()));
        }
        if let Some(quality) = transition.quality.as_ref() {
            qb.push(", quality = ");
            qb.push_bind(Json(quality.clone()));
        }
        if let Some(failure) = transition.failure.as_ref() {
            qb.push(", failure = ");
            qb.push_bind(Json(failure.clone()));
        }
        qb.push(" WHERE id = ");
        qb.push_bind(transition.id);
        qb.push(" AND status = ");
        qb.push_bind(transition.from);
        qb.push(" RETURNING ");
        qb.push(JOB_COLUMNS);

        let row = qb
            .build_query_as::<JobRow>()
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        match row {
            Some(row) => Ok(TransitionOutcome::Applied(Box::new(JobRecord::try_from(
                row,
            )?))),
            None => Ok(TransitionOutcome::Conflict(
                self.current_status(transition.id).await?,
            )),
        }
    }

    async fn update_progress(&self, id: Uuid, progress: &JobProgress) -> Result<bool, RepoError> {
        let result = sqlx::query(
            r#"
            UPDATE documentation_jobs
               SET progress = $2,
                   updated_at = now()
             WHERE id = $1 AND status = 'processing'
            "#,
        )
        .bind(id)
        .bind(Json(progress))
        .execute(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() == 1)
    }

    async fn request_cancel(&self, id: Uuid) -> Result<bool, RepoError> {
        let result = sqlx::query(
            r#"
            UPDATE documentation_jobs
               SET cancel_requested = TRUE,
                   updated_at = now()
             WHERE id = $1 AND status = 'processing'
            "#,
        )
        .bind(id)
        .execute(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() == 1)
    }

    async fn list_jobs(&self, filter: &JobHistoryFilter) -> Result<Vec<JobRecord>, RepoError> {
        let mut qb = Self::select_jobs();
        if let Some(team_id) = filter.team_id.as_ref() {
            qb.push(" AND team_id = ");
            qb.push_bind(team_id.clone());
        }
        if let Some(service_name) = filter.service_name.as_ref() {
            qb.push(" AND service_name = ");
            qb.push_bind(service_name.clone());
        }
        if let Some(status) = filter.status {
            qb.push(" AND status = ");
            qb.push_bind(status);
        }
        if let Some(after) = filter.created_after {
            qb.push(" AND created_at >= ");
            qb.push_bind(after);
        }
        if let Some(before) = filter.created_before {
            qb.push(" AND created_at <= ");
            qb.push_bind(before);
        }
        qb.push(" ORDER BY created_at DESC, id DESC LIMIT ");
        qb.push_bind(i64::from(filter.limit));

        self.fetch_jobs(qb).await
    }

    async fn list_active(&self) -> Result<Vec<JobRecord>, RepoError> {
        let mut qb = Self::select_jobs();
        qb.push(" AND status IN ('queued', 'processing') ORDER BY created_at ASC, id ASC");
        self.fetch_jobs(qb).await
    }

    async fn list_created_since(
        &self,
        team_id: Option<&str>,
        since: OffsetDateTime,
    ) -> Result<Vec<JobRecord>, RepoError> {
        let mut qb = Self::select_jobs();
        qb.push(" AND created_at >= ");
        qb.push_bind(since);
        if let Some(team_id) = team_id {
            qb.push(" AND team_id = ");
            qb.push_bind(team_id.to_string());
        }
        qb.push(" ORDER BY created_at DESC");
        self.fetch_jobs(qb).await
    }

    async fn count_by_status(&self, status: JobStatus) -> Result<u64, RepoError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM documentation_jobs WHERE status = $1")
                .bind(status)
                .fetch_one(self.pool())
                .await
                .map_err(map_sqlx_error)?;
        Self::convert_count(count)
    }

    async fn count_active_before(&self, created_at: OffsetDateTime) -> Result<u64, RepoError> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
              FROM documentation_jobs
             WHERE status IN ('queued', 'processing')
               AND created_at < $1
            "#,
        )
        .bind(created_at)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;
        Self::convert_count(count)
    }

    async fn recent_processing_seconds(
        &self,
        since: OffsetDateTime,
        limit: u32,
    ) -> Result<Vec<f64>, RepoError> {
        sqlx::query_scalar(
            r#"
            SELECT EXTRACT(EPOCH FROM (completed_at - started_at))::float8
              FROM documentation_jobs
             WHERE status = 'completed'
               AND started_at IS NOT NULL
               AND completed_at >= $1
             ORDER BY completed_at DESC
             LIMIT $2
            "#,
        )
        .bind(since)
        .bind(i64::from(limit))
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)
    }

    async fn oldest_queued_at(&self) -> Result<Option<OffsetDateTime>, RepoError> {
        sqlx::query_scalar(
            "SELECT MIN(created_at) FROM documentation_jobs WHERE status = 'queued'",
        )
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)
    }

    async fn purge_finished_before(&self, cutoff: OffsetDateTime) -> Result<u64, RepoError> {
        let result = sqlx::query(
            r#"
            DELETE FROM documentation_jobs
             WHERE status IN ('completed', 'failed', 'cancelled')
               AND completed_at < $1
            "#,
        )
        .bind(cutoff)
        .execute(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(result.rows_affected())
    }

    async fn health_check(&self) -> Result<(), RepoError> {
        self.ping().await.map_err(map_sqlx_error)
    }
}
