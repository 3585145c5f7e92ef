//! Port for the external text generation service.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationRequest {
    pub prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub model: String,
    /// Free-form hints forwarded to the service (section, service name, spec type).
    pub context: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GenerationResponse {
    pub content: String,
    #[serde(default)]
    pub tokens_used: u32,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub request_id: Option<String>,
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum GenAiError {
    #[error("generation request timed out")]
    Timeout,
    #[error("generation service unavailable: {0}")]
    Unavailable(String),
    #[error("generation service rate limited the request")]
    RateLimited,
    #[error("generation service rejected the request with status {status}: {message}")]
    Rejected { status: u16, message: String },
    #[error("generation service returned an invalid response: {0}")]
    InvalidResponse(String),
}

impl GenAiError {
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            GenAiError::Timeout | GenAiError::Unavailable(_) | GenAiError::RateLimited
        )
    }

    /// Classify a non-success HTTP status from the service.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        match status {
            429 => GenAiError::RateLimited,
            502..=504 => GenAiError::Unavailable(message.into()),
            _ => GenAiError::Rejected {
                status,
                message: message.into(),
            },
        }
    }
}

#[async_trait]
pub trait GenAiClient: Send + Sync {
    async fn generate(&self, request: GenerationRequest)
    -> Result<GenerationResponse, GenAiError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_classification() {
        assert_eq!(GenAiError::from_status(429, "slow down"), GenAiError::RateLimited);
        assert!(GenAiError::from_status(503, "down").is_transient());
        assert!(GenAiError::from_status(504, "gateway").is_transient());
        let rejected = GenAiError::from_status(400, "bad prompt");
        assert!(!rejected.is_transient());
        assert!(matches!(rejected, GenAiError::Rejected { status: 400, .. }));
        assert!(!GenAiError::InvalidResponse("no content".into()).is_transient());
    }
}
