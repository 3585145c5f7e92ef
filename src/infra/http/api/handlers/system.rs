//! Queue and health handlers

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use super::service_to_api;
use crate::application::error::ErrorReport;
use crate::infra::http::api::error::ApiError;
use crate::infra::http::api::state::ApiState;

pub async fn queue_status(State(state): State<ApiState>) -> Result<impl IntoResponse, ApiError> {
    let status = state.jobs.queue_status().await.map_err(service_to_api)?;
    Ok(Json(status))
}

pub async fn health_report(State(state): State<ApiState>) -> Response {
    let report = state.jobs.health().await;
    if report.healthy {
        return Json(report).into_response();
    }

    let mut response = (StatusCode::SERVICE_UNAVAILABLE, Json(report)).into_response();
    ErrorReport::from_message(
        "infra::http::api::health",
        StatusCode::SERVICE_UNAVAILABLE,
        "job store did not answer the health check",
    )
    .attach(&mut response);
    response
}

/// Liveness check: 204 when the job store answers.
pub async fn liveness(State(state): State<ApiState>) -> Response {
    match state.jobs.store_health().await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => {
            let mut response = StatusCode::SERVICE_UNAVAILABLE.into_response();
            ErrorReport::from_error(
                "infra::http::db_health",
                StatusCode::SERVICE_UNAVAILABLE,
                &err,
            )
            .attach(&mut response);
            response
        }
    }
}
