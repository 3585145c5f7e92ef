use std::sync::Arc;

use crate::application::service::JobService;

use super::rate_limit::ApiRateLimiter;

#[derive(Clone)]
pub struct ApiState {
    pub jobs: Arc<JobService>,
    pub rate_limiter: Arc<ApiRateLimiter>,
    /// Prefix for links in submission answers; empty for relative links.
    pub public_base_url: Arc<str>,
}

impl ApiState {
    pub fn new(
        jobs: Arc<JobService>,
        rate_limiter: Arc<ApiRateLimiter>,
        public_base_url: Option<&str>,
    ) -> Self {
        Self {
            jobs,
            rate_limiter,
            public_base_url: Arc::from(public_base_url.unwrap_or_default().trim_end_matches('/')),
        }
    }
}
