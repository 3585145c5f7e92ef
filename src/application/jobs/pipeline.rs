use std::collections::BTreeMap;
use std::sync::Arc;

use thiserror::Error;
use time::OffsetDateTime;
use tracing::debug;

use crate::application::docs::{
    DocumentFormatter, DocumentationGenerator, GeneratedSection, PromptContext,
    score_documentation,
};
use crate::application::repos::{JobStore, JobTransition, RepoError, TransitionOutcome};
use crate::application::retry::{RetryPolicy, retry_with_backoff};
use crate::application::spec::{ParsedSpecification, parse_specification};
use crate::domain::entities::{Artifact, JobProgress, JobRecord, QualityMetrics};
use crate::domain::types::{FailureKind, JobStatus, OutputFormat, PipelineStep};

pub const COMPLETED_LABEL: &str = "Documentation generation completed";

#[derive(Debug, Clone, Error, PartialEq)]
#[error("{step} step failed ({kind}): {message}")]
pub struct StepError {
    pub step: PipelineStep,
    pub kind: FailureKind,
    pub message: String,
    pub attempts: u32,
}

impl StepError {
    pub fn new(step: PipelineStep, kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            step,
            kind,
            message: message.into(),
            attempts: 1,
        }
    }

    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts;
        self
    }
}

/// Intermediate results handed from one step to the next.
#[derive(Debug, Default)]
pub struct PipelineState {
    pub parsed: Option<ParsedSpecification>,
    pub sections: Vec<GeneratedSection>,
    pub results: BTreeMap<OutputFormat, Artifact>,
    pub quality: Option<QualityMetrics>,
    pub persisted: Option<TransitionOutcome>,
}

/// The work behind each [`PipelineStep`].
pub struct Pipeline {
    store: Arc<dyn JobStore>,
    generator: Arc<DocumentationGenerator>,
    formatter: Arc<DocumentFormatter>,
    retry: RetryPolicy,
}

impl Pipeline {
    pub fn new(
        store: Arc<dyn JobStore>,
        generator: Arc<DocumentationGenerator>,
        formatter: Arc<DocumentFormatter>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            store,
            generator,
            formatter,
            retry,
        }
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    pub async fn run(
        &self,
        step: PipelineStep,
        job: &JobRecord,
        state: &mut PipelineState,
    ) -> Result<(), StepError> {
        match step {
            PipelineStep::Parse => self.parse(job, state),
            PipelineStep::Generate => self.generate(job, state).await,
            PipelineStep::Format => self.format(job, state),
            PipelineStep::Score => self.score(state),
            PipelineStep::Persist => self.persist(job, state).await,
        }
    }

    fn parse(&self, job: &JobRecord, state: &mut PipelineState) -> Result<(), StepError> {
        let parsed = parse_specification(job.spec_format, &job.specification).map_err(|err| {
            StepError::new(PipelineStep::Parse, FailureKind::Validation, err.to_string())
        })?;
        debug!(
            target = "specdoc::application::jobs::pipeline",
            job_id = %job.id,
            endpoints = parsed.endpoints.len(),
            schemas = parsed.schemas.len(),
            "specification parsed"
        );
        state.parsed = Some(parsed);
        Ok(())
    }

    async fn generate(&self, job: &JobRecord, state: &mut PipelineState) -> Result<(), StepError> {
        let parsed = state
            .parsed
            .as_ref()
            .ok_or_else(|| missing_input(PipelineStep::Generate, "parsed specification"))?;
        let context = PromptContext {
            service_name: &job.service_name,
            team_id: &job.team_id,
            format: job.spec_format,
            document: &job.specification,
        };

        state.sections = self
            .generator
            .generate(parsed, &context)
            .await
            .map_err(|failure| {
                StepError::new(
                    PipelineStep::Generate,
                    FailureKind::Upstream,
                    format!("{} section: {}", failure.section.as_str(), failure.error),
                )
                .with_attempts(failure.attempts)
            })?;
        Ok(())
    }

    fn format(&self, job: &JobRecord, state: &mut PipelineState) -> Result<(), StepError> {
        if state.sections.is_empty() {
            return Err(missing_input(PipelineStep::Format, "generated sections"));
        }
        state.results = self.formatter.render_all(
            job.id,
            &job.service_name,
            &job.output_formats,
            &state.sections,
            OffsetDateTime::now_utc(),
        );
        Ok(())
    }

    fn score(&self, state: &mut PipelineState) -> Result<(), StepError> {
        let parsed = state
            .parsed
            .as_ref()
            .ok_or_else(|| missing_input(PipelineStep::Score, "parsed specification"))?;
        let text = state
            .results
            .get(&OutputFormat::Markdown)
            .or_else(|| state.results.values().next())
            .map(|artifact| artifact.content.as_str())
            .ok_or_else(|| missing_input(PipelineStep::Score, "rendered artifacts"))?;

        state.quality = Some(score_documentation(text, parsed));
        Ok(())
    }

    async fn persist(&self, job: &JobRecord, state: &mut PipelineState) -> Result<(), StepError> {
        let quality = state
            .quality
            .clone()
            .ok_or_else(|| missing_input(PipelineStep::Persist, "quality metrics"))?;
        let transition = JobTransition::new(job.id, JobStatus::Processing, JobStatus::Completed)
            .with_progress(JobProgress::finished(COMPLETED_LABEL, PipelineStep::TOTAL))
            .with_results(state.results.clone())
            .with_quality(quality);

        let retried = retry_with_backoff(
            &self.retry,
            "store.persist",
            RepoError::is_transient,
            |_| {
                let transition = transition.clone();
                async move { self.store.transition(transition).await }
            },
        )
        .await;

        let outcome = retried.result.map_err(|err| {
            StepError::new(PipelineStep::Persist, FailureKind::Storage, err.to_string())
                .with_attempts(retried.attempts)
        })?;
        state.persisted = Some(outcome);
        Ok(())
    }
}

fn missing_input(step: PipelineStep, what: &str) -> StepError {
    StepError::new(
        step,
        FailureKind::Internal,
        format!("{what} unavailable when the {} step started", step.as_str()),
    )
}
