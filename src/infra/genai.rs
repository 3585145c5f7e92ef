//! HTTP client for the external text generation service.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use tracing::debug;

use crate::application::genai::{GenAiClient, GenAiError, GenerationRequest, GenerationResponse};
use crate::infra::error::InfraError;

/// Longest slice of an error body kept in a [`GenAiError`].
const ERROR_BODY_LIMIT: usize = 512;

#[derive(Debug, Clone)]
pub struct HttpGenAiClient {
    client: Client,
    endpoint: Url,
    api_key: Option<String>,
}

impl HttpGenAiClient {
    pub fn new(endpoint: Url, api_key: Option<String>, timeout: Duration) -> Result<Self, InfraError> {
        let client = Client::builder()
            .user_agent(concat!("specdoc/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|err| InfraError::http_client("genai", err))?;
        Ok(Self {
            client,
            endpoint,
            api_key,
        })
    }
}

#[async_trait]
impl GenAiClient for HttpGenAiClient {
    async fn generate(
        &self,
        request: GenerationRequest,
    ) -> Result<GenerationResponse, GenAiError> {
        let mut builder = self.client.post(self.endpoint.clone()).json(&request);
        if let Some(key) = self.api_key.as_deref() {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await.map_err(transport_error)?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message: String = body.chars().take(ERROR_BODY_LIMIT).collect();
            return Err(GenAiError::from_status(status.as_u16(), message));
        }

        let generated: GenerationResponse = response
            .json()
            .await
            .map_err(|err| GenAiError::InvalidResponse(err.to_string()))?;
        debug!(
            target = "specdoc::infra::genai",
            tokens_used = generated.tokens_used,
            request_id = generated.request_id.as_deref().unwrap_or(""),
            "generation response received"
        );
        Ok(generated)
    }
}

fn transport_error(err: reqwest::Error) -> GenAiError {
    if err.is_timeout() {
        GenAiError::Timeout
    } else {
        GenAiError::Unavailable(err.to_string())
    }
}
