use dashmap::DashMap;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RateLimitStatus {
    pub client: String,
    pub limit: u32,
    pub remaining: u32,
    pub window_seconds: u64,
    /// Seconds until the oldest counted request leaves the window.
    pub reset_after_seconds: u64,
}

/// Sliding-window request counter keyed by client.
#[derive(Debug, Clone)]
pub struct ApiRateLimiter {
    window: Duration,
    max_requests: u32,
    buckets: Arc<DashMap<String, Vec<Instant>>>,
}

impl ApiRateLimiter {
    pub fn new(window: Duration, max_requests: u32) -> Self {
        Self {
            window,
            max_requests,
            buckets: Arc::new(DashMap::new()),
        }
    }

    /// Record a request from `client`, returning whether it is allowed and how many
    /// requests remain in the current window.
    pub fn allow(&self, client: &str) -> (bool, u32) {
        self.allow_at(client, Instant::now())
    }

    fn allow_at(&self, client: &str, now: Instant) -> (bool, u32) {
        let window = self.window;
        let mut entry = self.buckets.entry(client.to_string()).or_default();
        entry.retain(|instant| now.duration_since(*instant) < window);

        let remaining = self
            .max_requests
            .saturating_sub(u32::try_from(entry.len()).unwrap_or(u32::MAX));
        if remaining == 0 {
            return (false, 0);
        }

        entry.push(now);
        (true, remaining - 1)
    }

    /// Current window for `client` without counting a request.
    pub fn status(&self, client: &str) -> RateLimitStatus {
        self.status_at(client, Instant::now())
    }

    fn status_at(&self, client: &str, now: Instant) -> RateLimitStatus {
        let window = self.window;
        let (used, oldest) = self
            .buckets
            .get(client)
            .map(|entry| {
                let live: Vec<Instant> = entry
                    .iter()
                    .copied()
                    .filter(|instant| now.duration_since(*instant) < window)
                    .collect();
                (live.len(), live.into_iter().min())
            })
            .unwrap_or((0, None));

        RateLimitStatus {
            client: client.to_string(),
            limit: self.max_requests,
            remaining: self
                .max_requests
                .saturating_sub(u32::try_from(used).unwrap_or(u32::MAX)),
            window_seconds: window.as_secs(),
            reset_after_seconds: oldest
                .map(|oldest| window.saturating_sub(now.duration_since(oldest)).as_secs())
                .unwrap_or_default(),
        }
    }

    pub fn retry_after_secs(&self) -> u64 {
        self.window.as_secs().max(1)
    }

    pub fn limit(&self) -> u32 {
        self.max_requests
    }
}
