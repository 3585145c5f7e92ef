pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod rate_limit;
pub mod state;

pub use state::ApiState;

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post},
};

pub fn build_api_router(state: ApiState) -> Router<ApiState> {
    let rate_state = state.clone();

    Router::new()
        .route(
            "/api/v1/jobs",
            get(handlers::list_jobs).post(handlers::submit_job),
        )
        .route("/api/v1/jobs/from-url", post(handlers::submit_job_from_url))
        .route("/api/v1/jobs/active", get(handlers::list_active_jobs))
        .route("/api/v1/jobs/stats", get(handlers::job_statistics))
        .route(
            "/api/v1/jobs/{id}",
            get(handlers::get_job_status).delete(handlers::cancel_job),
        )
        .route("/api/v1/jobs/{id}/quality", get(handlers::get_job_quality))
        .route(
            "/api/v1/jobs/{id}/download/{format}",
            get(handlers::download_artifact),
        )
        .route("/api/v1/leaderboard", get(handlers::leaderboard))
        .route(
            "/api/v1/leaderboard/teams/{team_id}",
            get(handlers::team_leaderboard),
        )
        .route("/api/v1/quality/alerts", get(handlers::quality_alerts))
        .route("/api/v1/quality/monitoring", get(handlers::quality_monitoring))
        .route("/api/v1/rate-limit/status", get(handlers::rate_limit_status))
        .route("/api/v1/queue", get(handlers::queue_status))
        .route("/api/v1/health", get(handlers::health_report))
        .layer(axum_middleware::from_fn_with_state(
            rate_state,
            middleware::api_rate_limit,
        ))
}
