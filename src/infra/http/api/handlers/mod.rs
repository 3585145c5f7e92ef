//! API handlers.
//!
//! Query structs and the error conversions shared by the handler modules live here.

mod jobs;
mod quality;
mod system;

pub use jobs::*;
pub use quality::*;
pub use system::*;

// ----- Shared query structs -----

use serde::Deserialize;

use crate::application::quality_report::{AlertSeverity, TimePeriod};
use crate::domain::types::{JobStatus, SpecFormat};

#[derive(Debug, Deserialize)]
pub struct JobHistoryQuery {
    pub team_id: Option<String>,
    pub service_name: Option<String>,
    pub status: Option<JobStatus>,
    pub created_after: Option<String>,
    pub created_before: Option<String>,
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct JobStatsQuery {
    pub team_id: Option<String>,
    pub days: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct LeaderboardQuery {
    pub time_period: Option<TimePeriod>,
    pub team_id: Option<String>,
    pub spec_format: Option<SpecFormat>,
    pub poor_quality_threshold: Option<u8>,
}

#[derive(Debug, Deserialize)]
pub struct TeamLeaderboardQuery {
    pub time_period: Option<TimePeriod>,
}

#[derive(Debug, Deserialize)]
pub struct QualityAlertsQuery {
    pub days: Option<u32>,
    pub team_id: Option<String>,
    pub severity: Option<AlertSeverity>,
}

#[derive(Debug, Deserialize)]
pub struct QualityMonitoringQuery {
    pub days: Option<u32>,
}

// ----- Shared error conversions -----

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use uuid::Uuid;

use crate::application::repos::RepoError;
use crate::application::service::JobServiceError;

use super::error::{ApiError, codes};

pub(crate) fn repo_to_api(err: RepoError) -> ApiError {
    match err {
        RepoError::NotFound => ApiError::not_found("Resource not found"),
        RepoError::Timeout => ApiError::new(
            StatusCode::SERVICE_UNAVAILABLE,
            codes::DB_TIMEOUT,
            "Database timeout",
            None,
        ),
        RepoError::Unavailable { message } => ApiError::new(
            StatusCode::SERVICE_UNAVAILABLE,
            codes::STORAGE,
            "Job store unavailable",
            Some(message),
        ),
        RepoError::Persistence(message) => ApiError::new(
            StatusCode::SERVICE_UNAVAILABLE,
            codes::STORAGE,
            "Persistence error",
            Some(message),
        ),
        RepoError::Integrity { message } => ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            codes::INTEGRITY,
            "Integrity check failed",
            Some(message),
        ),
    }
}

pub(crate) fn service_to_api(err: JobServiceError) -> ApiError {
    match err {
        JobServiceError::Validation(message) => ApiError::validation(message),
        JobServiceError::NotFound(id) => ApiError::new(
            StatusCode::NOT_FOUND,
            codes::NOT_FOUND,
            "Job not found",
            Some(id.to_string()),
        ),
        err @ JobServiceError::Fetch { .. } => ApiError::new(
            StatusCode::BAD_REQUEST,
            codes::FETCH,
            "Specification could not be fetched",
            Some(err.to_string()),
        ),
        JobServiceError::Storage(repo) => repo_to_api(repo),
    }
}

pub(crate) fn json_rejection_to_api(rejection: JsonRejection) -> ApiError {
    if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return ApiError::new(
            StatusCode::PAYLOAD_TOO_LARGE,
            codes::PAYLOAD_TOO_LARGE,
            "Request body too large",
            Some(rejection.body_text()),
        );
    }
    ApiError::bad_request("Invalid request body", Some(rejection.body_text()))
}

pub(crate) fn query_rejection_to_api(rejection: QueryRejection) -> ApiError {
    ApiError::bad_request("Invalid query parameters", Some(rejection.body_text()))
}

pub(crate) fn parse_job_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| {
        ApiError::bad_request("Invalid job id", Some(format!("`{raw}` is not a UUID")))
    })
}

pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

const MAX_PERIOD_DAYS: u32 = 365;

pub(crate) fn period_days(days: Option<u32>, default: u32) -> Result<u32, ApiError> {
    let days = days.unwrap_or(default);
    if !(1..=MAX_PERIOD_DAYS).contains(&days) {
        return Err(ApiError::validation(format!(
            "`days` must be between 1 and {MAX_PERIOD_DAYS}"
        )));
    }
    Ok(days)
}
