//! Leaderboard, quality alert and rate limit handlers

use axum::Json;
use axum::body::Body;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::http::Request;
use axum::response::IntoResponse;

use super::{
    LeaderboardQuery, QualityAlertsQuery, QualityMonitoringQuery, TeamLeaderboardQuery, non_blank,
    period_days, query_rejection_to_api, service_to_api,
};
use crate::application::quality_report::{DEFAULT_POOR_QUALITY_THRESHOLD, LeaderboardFilters};
use crate::infra::http::api::error::ApiError;
use crate::infra::http::api::middleware::client_key;
use crate::infra::http::api::state::ApiState;

const DEFAULT_ALERT_DAYS: u32 = 7;
const DEFAULT_MONITORING_DAYS: u32 = 1;

pub async fn leaderboard(
    State(state): State<ApiState>,
    query: Result<Query<LeaderboardQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(query) = query.map_err(query_rejection_to_api)?;

    let poor_quality_threshold = query
        .poor_quality_threshold
        .unwrap_or(DEFAULT_POOR_QUALITY_THRESHOLD);
    if poor_quality_threshold > 100 {
        return Err(ApiError::validation(
            "`poor_quality_threshold` must be between 0 and 100",
        ));
    }

    let board = state
        .jobs
        .leaderboard(LeaderboardFilters {
            time_period: query.time_period.unwrap_or_default(),
            team_id: non_blank(query.team_id),
            spec_format: query.spec_format,
            poor_quality_threshold,
        })
        .await
        .map_err(service_to_api)?;
    Ok(Json(board))
}

pub async fn team_leaderboard(
    State(state): State<ApiState>,
    Path(team_id): Path<String>,
    query: Result<Query<TeamLeaderboardQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(query) = query.map_err(query_rejection_to_api)?;

    let standing = state
        .jobs
        .team_standing(team_id.trim(), query.time_period.unwrap_or_default())
        .await
        .map_err(service_to_api)?
        .ok_or_else(|| ApiError::not_found("Team not found or no scored documentation"))?;
    Ok(Json(standing))
}

pub async fn quality_alerts(
    State(state): State<ApiState>,
    query: Result<Query<QualityAlertsQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(query) = query.map_err(query_rejection_to_api)?;
    let days = period_days(query.days, DEFAULT_ALERT_DAYS)?;
    let team_id = non_blank(query.team_id);

    let alerts = state
        .jobs
        .quality_alerts(days, team_id.as_deref(), query.severity)
        .await
        .map_err(service_to_api)?;
    Ok(Json(alerts))
}

pub async fn quality_monitoring(
    State(state): State<ApiState>,
    query: Result<Query<QualityMonitoringQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(query) = query.map_err(query_rejection_to_api)?;
    let days = period_days(query.days, DEFAULT_MONITORING_DAYS)?;

    let report = state
        .jobs
        .quality_monitoring(days)
        .await
        .map_err(service_to_api)?;
    Ok(Json(report))
}

/// The caller's window as seen after this request was counted.
pub async fn rate_limit_status(
    State(state): State<ApiState>,
    request: Request<Body>,
) -> impl IntoResponse {
    let client = client_key(&request);
    Json(state.rate_limiter.status(&client))
}
