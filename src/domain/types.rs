//! Shared domain enumerations aligned with persisted database enums.

use serde::{Deserialize, Serialize};

/// Lifecycle state of a documentation job (mirrors Postgres enum `documentation_job_status`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "documentation_job_status", rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Processing,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    pub const ALL: [JobStatus; 5] = [
        JobStatus::Queued,
        JobStatus::Processing,
        JobStatus::Completed,
        JobStatus::Failed,
        JobStatus::Cancelled,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled
        )
    }

    pub fn is_active(self) -> bool {
        matches!(self, JobStatus::Queued | JobStatus::Processing)
    }

    /// Edges of the lifecycle graph. Terminal states have no outgoing edges.
    pub fn can_transition_to(self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::Queued, JobStatus::Processing)
                | (JobStatus::Queued, JobStatus::Cancelled)
                | (JobStatus::Processing, JobStatus::Completed)
                | (JobStatus::Processing, JobStatus::Failed)
                | (JobStatus::Processing, JobStatus::Cancelled)
        )
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpecFormat {
    #[serde(rename = "openapi")]
    OpenApi,
    Graphql,
    JsonSchema,
}

impl SpecFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            SpecFormat::OpenApi => "openapi",
            SpecFormat::Graphql => "graphql",
            SpecFormat::JsonSchema => "json_schema",
        }
    }
}

impl TryFrom<&str> for SpecFormat {
    type Error = ();

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "openapi" => Ok(SpecFormat::OpenApi),
            "graphql" => Ok(SpecFormat::Graphql),
            "json_schema" => Ok(SpecFormat::JsonSchema),
            _ => Err(()),
        }
    }
}

impl std::fmt::Display for SpecFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    Markdown,
    Html,
}

impl OutputFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            OutputFormat::Markdown => "markdown",
            OutputFormat::Html => "html",
        }
    }

    pub fn media_type(self) -> &'static str {
        match self {
            OutputFormat::Markdown => "text/markdown; charset=utf-8",
            OutputFormat::Html => "text/html; charset=utf-8",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Markdown => "md",
            OutputFormat::Html => "html",
        }
    }
}

impl TryFrom<&str> for OutputFormat {
    type Error = ();

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            "html" => Ok(OutputFormat::Html),
            _ => Err(()),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The fixed sequence of work a documentation job goes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStep {
    Parse,
    Generate,
    Format,
    Score,
    Persist,
}

impl PipelineStep {
    pub const ALL: [PipelineStep; 5] = [
        PipelineStep::Parse,
        PipelineStep::Generate,
        PipelineStep::Format,
        PipelineStep::Score,
        PipelineStep::Persist,
    ];

    pub const TOTAL: u32 = Self::ALL.len() as u32;

    pub fn as_str(self) -> &'static str {
        match self {
            PipelineStep::Parse => "parse",
            PipelineStep::Generate => "generate",
            PipelineStep::Format => "format",
            PipelineStep::Score => "score",
            PipelineStep::Persist => "persist",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            PipelineStep::Parse => "Parsing specification",
            PipelineStep::Generate => "Generating documentation content",
            PipelineStep::Format => "Formatting and storing documentation",
            PipelineStep::Score => "Calculating quality score",
            PipelineStep::Persist => "Finalizing documentation",
        }
    }

    /// One-based position in the pipeline.
    pub fn ordinal(self) -> u32 {
        match self {
            PipelineStep::Parse => 1,
            PipelineStep::Generate => 2,
            PipelineStep::Format => 3,
            PipelineStep::Score => 4,
            PipelineStep::Persist => 5,
        }
    }
}

impl std::fmt::Display for PipelineStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Background task kinds delivered through the apalis queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    ExecuteDocumentationJob,
}

impl TaskType {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskType::ExecuteDocumentationJob => "execute_documentation_job",
        }
    }
}

/// Classification of a step failure recorded on a failed job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Validation,
    Upstream,
    Storage,
    Internal,
}

impl FailureKind {
    pub fn as_str(self) -> &'static str {
        match self {
            FailureKind::Validation => "validation",
            FailureKind::Upstream => "upstream",
            FailureKind::Storage => "storage",
            FailureKind::Internal => "internal",
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle_edges_are_forward_only() {
        for status in JobStatus::ALL {
            assert!(!status.can_transition_to(status), "{status} self-loop");
            if status.is_terminal() {
                for next in JobStatus::ALL {
                    assert!(!status.can_transition_to(next), "{status} -> {next}");
                }
            }
        }

        assert!(JobStatus::Queued.can_transition_to(JobStatus::Processing));
        assert!(JobStatus::Queued.can_transition_to(JobStatus::Cancelled));
        assert!(!JobStatus::Queued.can_transition_to(JobStatus::Completed));
        assert!(!JobStatus::Processing.can_transition_to(JobStatus::Queued));
    }

    #[test]
    fn status_wire_names_match_stored_names() {
        for status in JobStatus::ALL {
            let encoded = serde_json::to_value(status).expect("serialize");
            assert_eq!(encoded, serde_json::Value::from(status.as_str()));
        }
        assert!(serde_json::from_str::<JobStatus>("\"running\"").is_err());
    }

    #[test]
    fn spec_format_serializes_with_wire_names() {
        let encoded = serde_json::to_string(&SpecFormat::OpenApi).expect("serialize");
        assert_eq!(encoded, "\"openapi\"");
        let decoded: SpecFormat = serde_json::from_str("\"json_schema\"").expect("deserialize");
        assert_eq!(decoded, SpecFormat::JsonSchema);
    }

    #[test]
    fn pipeline_ordinals_follow_declaration_order() {
        let ordinals: Vec<u32> = PipelineStep::ALL.iter().map(|s| s.ordinal()).collect();
        assert_eq!(ordinals, vec![1, 2, 3, 4, 5]);
        assert_eq!(PipelineStep::TOTAL, 5);
    }
}
