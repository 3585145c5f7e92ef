//! Port for retrieving specifications submitted by URL.

use async_trait::async_trait;
use thiserror::Error;
use url::Url;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum FetchError {
    #[error("only http and https URLs are supported")]
    UnsupportedScheme,
    #[error("specification exceeds the {limit} byte limit")]
    TooLarge { limit: u64 },
    #[error("server answered with status {0}")]
    Status(u16),
    #[error("request timed out")]
    Timeout,
    #[error("request failed: {0}")]
    Transport(String),
    #[error("response is not valid UTF-8 text")]
    NotText,
}

#[async_trait]
pub trait SpecFetcher: Send + Sync {
    /// Download the specification body as text.
    async fn fetch(&self, url: &Url) -> Result<String, FetchError>;
}

/// Reject anything other than absolute http(s) URLs before any network access.
pub fn parse_spec_url(raw: &str) -> Result<Url, FetchError> {
    let url = Url::parse(raw.trim()).map_err(|err| FetchError::Transport(err.to_string()))?;
    match url.scheme() {
        "http" | "https" if url.host().is_some() => Ok(url),
        _ => Err(FetchError::UnsupportedScheme),
    }
}
