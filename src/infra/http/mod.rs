pub mod api;
mod middleware;

pub use api::rate_limit::ApiRateLimiter;
pub use api::{ApiState, build_api_router};
pub use middleware::{REQUEST_ID_HEADER, RequestContext};

use axum::{Router, extract::DefaultBodyLimit, middleware as axum_middleware, routing::get};

/// Full HTTP surface: the liveness check plus the versioned API.
pub fn build_router(state: ApiState, body_limit: usize) -> Router {
    Router::new()
        .route("/health", get(api::handlers::liveness))
        .merge(build_api_router(state.clone()))
        .with_state(state)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(axum_middleware::from_fn(middleware::log_responses))
        .layer(axum_middleware::from_fn(middleware::set_request_context))
}
