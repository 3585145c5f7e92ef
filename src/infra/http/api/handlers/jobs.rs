//! Documentation job handlers

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::application::repos::JobHistoryFilter;
use crate::application::service::{ArtifactLookup, SubmitFromUrlCommand, SubmitJobCommand};
use crate::application::tracker::DEFAULT_HISTORY_LIMIT;
use crate::domain::entities::JobRecord;
use crate::domain::types::OutputFormat;

use super::{
    JobHistoryQuery, JobStatsQuery, json_rejection_to_api, non_blank, parse_job_id, period_days,
    query_rejection_to_api, service_to_api,
};
use crate::infra::http::api::error::{ApiError, codes};
use crate::infra::http::api::models::{
    CancelJobResponse, JobLinks, JobListResponse, JobStatusResponse, SubmitFromUrlRequest,
    SubmitJobRequest, SubmitJobResponse,
};
use crate::infra::http::api::state::ApiState;

const DEFAULT_STATS_DAYS: u32 = 7;

pub async fn submit_job(
    State(state): State<ApiState>,
    payload: Result<Json<SubmitJobRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(payload) = payload.map_err(json_rejection_to_api)?;

    let job = state
        .jobs
        .submit(SubmitJobCommand {
            specification: payload.specification,
            spec_format: payload.spec_format,
            output_formats: payload.output_formats,
            team_id: payload.team_id,
            service_name: payload.service_name,
        })
        .await
        .map_err(service_to_api)?;

    Ok(accepted(&state, job))
}

pub async fn submit_job_from_url(
    State(state): State<ApiState>,
    payload: Result<Json<SubmitFromUrlRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(payload) = payload.map_err(json_rejection_to_api)?;

    let job = state
        .jobs
        .submit_from_url(SubmitFromUrlCommand {
            specification_url: payload.specification_url,
            spec_format: payload.spec_format,
            output_formats: payload.output_formats,
            team_id: payload.team_id,
            service_name: payload.service_name,
        })
        .await
        .map_err(service_to_api)?;

    Ok(accepted(&state, job))
}

fn accepted(state: &ApiState, job: JobRecord) -> Response {
    let links = JobLinks::for_job(&state.public_base_url, &job);
    let body = SubmitJobResponse {
        job_id: job.id,
        status: job.status,
        progress: job.progress,
        links,
    };
    (StatusCode::ACCEPTED, Json(body)).into_response()
}

pub async fn list_jobs(
    State(state): State<ApiState>,
    query: Result<Query<JobHistoryQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(query) = query.map_err(query_rejection_to_api)?;

    let filter = JobHistoryFilter {
        team_id: non_blank(query.team_id),
        service_name: non_blank(query.service_name),
        status: query.status,
        created_after: parse_timestamp("created_after", query.created_after.as_deref())?,
        created_before: parse_timestamp("created_before", query.created_before.as_deref())?,
        limit: query.limit.unwrap_or(DEFAULT_HISTORY_LIMIT),
    };

    let jobs = state.jobs.history(filter).await.map_err(service_to_api)?;
    Ok(Json(JobListResponse::from(jobs)))
}

pub async fn list_active_jobs(
    State(state): State<ApiState>,
) -> Result<impl IntoResponse, ApiError> {
    let jobs = state.jobs.active().await.map_err(service_to_api)?;
    Ok(Json(JobListResponse::from(jobs)))
}

pub async fn job_statistics(
    State(state): State<ApiState>,
    query: Result<Query<JobStatsQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(query) = query.map_err(query_rejection_to_api)?;

    let days = period_days(query.days, DEFAULT_STATS_DAYS)?;

    let team_id = non_blank(query.team_id);
    let stats = state
        .jobs
        .statistics(team_id.as_deref(), days)
        .await
        .map_err(service_to_api)?;
    Ok(Json(stats))
}

pub async fn get_job_status(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_job_id(&id)?;
    let view = state.jobs.get_status(id).await.map_err(service_to_api)?;
    Ok(Json(JobStatusResponse::from(view)))
}

pub async fn cancel_job(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_job_id(&id)?;
    let outcome = state.jobs.cancel(id).await.map_err(service_to_api)?;
    Ok(Json(CancelJobResponse::from(outcome)))
}

pub async fn get_job_quality(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_job_id(&id)?;
    match state.jobs.quality(id).await.map_err(service_to_api)? {
        Some(quality) => Ok(Json(quality)),
        None => Err(ApiError::new(
            StatusCode::NOT_FOUND,
            codes::NOT_FOUND,
            "Quality metrics not available",
            Some("the job has not been scored yet".to_string()),
        )),
    }
}

pub async fn download_artifact(
    State(state): State<ApiState>,
    Path((id, format)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    let id = parse_job_id(&id)?;
    let format = OutputFormat::try_from(format.as_str()).map_err(|_| {
        ApiError::new(
            StatusCode::BAD_REQUEST,
            codes::UNSUPPORTED_FORMAT,
            "Unsupported output format",
            Some(format!("`{format}` is not one of markdown, html")),
        )
    })?;

    let artifact = match state
        .jobs
        .artifact(id, format)
        .await
        .map_err(service_to_api)?
    {
        ArtifactLookup::Ready(artifact) => artifact,
        ArtifactLookup::NotCompleted(status) => {
            return Err(ApiError::new(
                StatusCode::BAD_REQUEST,
                codes::INVALID_STATE,
                "Job is not completed",
                Some(format!("job is {status}")),
            ));
        }
        ArtifactLookup::NotRequested => {
            return Err(ApiError::new(
                StatusCode::NOT_FOUND,
                codes::NOT_FOUND,
                "Format was not requested for this job",
                Some(format.as_str().to_string()),
            ));
        }
    };

    let content_type = HeaderValue::from_str(&artifact.media_type).map_err(|_| {
        ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            codes::INTERNAL,
            "Stored artifact has an invalid media type",
            None,
        )
    })?;
    let disposition =
        HeaderValue::from_str(&format!("attachment; filename=\"{}\"", artifact.file_name))
            .map_err(|_| {
                ApiError::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    codes::INTERNAL,
                    "Stored artifact has an invalid file name",
                    None,
                )
            })?;

    Ok((
        [
            (header::CONTENT_TYPE, content_type),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        artifact.content,
    )
        .into_response())
}

fn parse_timestamp(
    field: &'static str,
    raw: Option<&str>,
) -> Result<Option<OffsetDateTime>, ApiError> {
    raw.filter(|value| !value.trim().is_empty())
        .map(|value| {
            OffsetDateTime::parse(value.trim(), &Rfc3339).map_err(|err| {
                ApiError::validation(format!("`{field}` must be an RFC 3339 timestamp: {err}"))
            })
        })
        .transpose()
}
