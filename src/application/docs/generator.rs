use std::sync::Arc;

use futures::{StreamExt, TryStreamExt, stream};
use serde_json::json;
use tracing::{debug, info};

use crate::application::genai::{GenAiClient, GenAiError, GenerationRequest};
use crate::application::retry::{RetryPolicy, retry_with_backoff};
use crate::application::spec::ParsedSpecification;

use super::sections::{DocSection, PromptContext, build_prompt, select_sections};

/// Sections requested from the GenAI service at the same time.
pub const SECTION_CONCURRENCY: usize = 3;

#[derive(Debug, Clone, PartialEq)]
pub struct GenerationSettings {
    pub max_tokens: u32,
    pub temperature: f32,
    pub model: String,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            max_tokens: 3000,
            temperature: 0.2,
            model: "default".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedSection {
    pub section: DocSection,
    pub content: String,
    pub tokens_used: u32,
}

/// A section that could not be generated, with the attempts spent on it.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationFailure {
    pub section: DocSection,
    pub error: GenAiError,
    pub attempts: u32,
}

pub struct DocumentationGenerator {
    client: Arc<dyn GenAiClient>,
    settings: GenerationSettings,
    retry: RetryPolicy,
}

impl DocumentationGenerator {
    pub fn new(
        client: Arc<dyn GenAiClient>,
        settings: GenerationSettings,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            client,
            settings,
            retry,
        }
    }

    /// Generate every relevant section, preserving section order. The first section that
    /// still fails after retries aborts the whole generation.
    pub async fn generate(
        &self,
        parsed: &ParsedSpecification,
        context: &PromptContext<'_>,
    ) -> Result<Vec<GeneratedSection>, GenerationFailure> {
        let sections = select_sections(parsed);
        debug!(
            target = "specdoc::application::docs::generator",
            service_name = context.service_name,
            sections = ?sections,
            "selected documentation sections"
        );

        let generated: Vec<GeneratedSection> = stream::iter(sections)
            .map(|section| self.generate_section(section, context))
            .buffered(SECTION_CONCURRENCY)
            .try_collect()
            .await?;

        info!(
            target = "specdoc::application::docs::generator",
            service_name = context.service_name,
            sections = generated.len(),
            tokens = generated.iter().map(|s| u64::from(s.tokens_used)).sum::<u64>(),
            "documentation sections generated"
        );

        Ok(generated)
    }

    async fn generate_section(
        &self,
        section: DocSection,
        context: &PromptContext<'_>,
    ) -> Result<GeneratedSection, GenerationFailure> {
        let request = GenerationRequest {
            prompt: build_prompt(section, context),
            max_tokens: self.settings.max_tokens,
            temperature: self.settings.temperature,
            model: self.settings.model.clone(),
            context: json!({
                "section": section.as_str(),
                "service_name": context.service_name,
                "spec_type": context.format.as_str(),
            }),
        };

        let retried = retry_with_backoff(
            &self.retry,
            "genai.generate",
            GenAiError::is_transient,
            |_| {
                let request = request.clone();
                async move {
                    let response = self.client.generate(request).await?;
                    if response.content.trim().is_empty() {
                        return Err(GenAiError::InvalidResponse(
                            "response content is empty".to_string(),
                        ));
                    }
                    Ok(response)
                }
            },
        )
        .await;

        match retried.result {
            Ok(response) => Ok(GeneratedSection {
                section,
                content: response.content,
                tokens_used: response.tokens_used,
            }),
            Err(error) => Err(GenerationFailure {
                section,
                error,
                attempts: retried.attempts,
            }),
        }
    }
}
