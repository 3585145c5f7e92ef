//! Command-line surface for `specdoc-cli`.

#![deny(clippy::all, clippy::pedantic)]

use std::fmt;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(
    name = "specdoc-cli",
    version,
    about = "Documentation job service CLI",
    long_about = None
)]
pub struct Cli {
    /// API base URL, e.g. <http://localhost:8000>
    #[arg(long = "api-url", env = "SPECDOC_API_URL", global = true)]
    pub api_url: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(flatten)]
    Jobs(JobsCmd),
    #[command(flatten)]
    Reports(ReportsCmd),
    #[command(flatten)]
    System(SystemCmd),
}

#[derive(Subcommand, Debug)]
pub enum JobsCmd {
    /// Submit a specification file for documentation generation
    Submit(SubmitArgs),
    /// Submit a specification published at a URL
    SubmitUrl(SubmitUrlArgs),
    /// List job history, newest first
    List {
        #[arg(long)]
        team_id: Option<String>,
        #[arg(long)]
        service_name: Option<String>,
        #[arg(long)]
        status: Option<JobStatusArg>,
        /// Only jobs created at or after this RFC 3339 timestamp
        #[arg(long)]
        since: Option<String>,
        /// Only jobs created at or before this RFC 3339 timestamp
        #[arg(long)]
        until: Option<String>,
        #[arg(long, default_value_t = 20)]
        limit: u32,
    },
    /// List queued and processing jobs
    Active,
    /// Show a job's status and completion estimate
    Status { id: Uuid },
    /// Cancel a queued or processing job
    Cancel { id: Uuid },
    /// Show a completed job's quality metrics
    Quality { id: Uuid },
    /// Download a generated artifact
    Download {
        id: Uuid,
        #[arg(value_enum)]
        format: OutputFormatArg,
        /// Write to this file instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Aggregate statistics over recent jobs
    Stats {
        #[arg(long)]
        team_id: Option<String>,
        #[arg(long, default_value_t = 7)]
        days: u32,
    },
}

#[derive(Subcommand, Debug)]
pub enum ReportsCmd {
    /// Rank teams by documentation quality
    Leaderboard {
        #[arg(long, value_enum, default_value_t = PeriodArg::Month)]
        period: PeriodArg,
        #[arg(long)]
        team_id: Option<String>,
        #[arg(long, value_enum)]
        spec_format: Option<SpecFormatArg>,
        /// Services scoring below this are listed as poor quality
        #[arg(long)]
        threshold: Option<u8>,
    },
    /// Show one team's leaderboard standing
    TeamStanding {
        team_id: String,
        #[arg(long, value_enum, default_value_t = PeriodArg::Month)]
        period: PeriodArg,
    },
    /// List quality alerts for poorly documented services
    Alerts {
        #[arg(long, default_value_t = 7)]
        days: u32,
        #[arg(long)]
        team_id: Option<String>,
        #[arg(long, value_enum)]
        severity: Option<SeverityArg>,
    },
    /// Quality monitoring report with trend and advice
    Monitoring {
        #[arg(long, default_value_t = 1)]
        days: u32,
    },
}

#[derive(Subcommand, Debug)]
pub enum SystemCmd {
    /// Show queue depth and load
    Queue,
    /// Show the detailed health report
    Health,
    /// Show this client's API rate limit window
    RateLimit,
}

#[derive(Args, Debug)]
pub struct SubmitArgs {
    /// Specification file (JSON, YAML or GraphQL SDL)
    #[arg(long)]
    pub file: PathBuf,
    #[command(flatten)]
    pub target: SubmitTarget,
}

#[derive(Args, Debug)]
pub struct SubmitUrlArgs {
    /// http(s) URL of the specification
    #[arg(long)]
    pub url: String,
    #[command(flatten)]
    pub target: SubmitTarget,
}

#[derive(Args, Debug)]
pub struct SubmitTarget {
    #[arg(long)]
    pub team_id: String,
    #[arg(long)]
    pub service_name: String,
    /// Declared specification format; detected from content when omitted
    #[arg(long, value_enum)]
    pub spec_format: Option<SpecFormatArg>,
    /// Output formats to produce (repeatable); defaults to markdown
    #[arg(long = "output", value_enum)]
    pub output_formats: Vec<OutputFormatArg>,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum JobStatusArg {
    Queued,
    Processing,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatusArg {
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatusArg::Queued => "queued",
            JobStatusArg::Processing => "processing",
            JobStatusArg::Completed => "completed",
            JobStatusArg::Failed => "failed",
            JobStatusArg::Cancelled => "cancelled",
        }
    }
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum SpecFormatArg {
    Openapi,
    Graphql,
    JsonSchema,
}

impl SpecFormatArg {
    pub fn as_str(self) -> &'static str {
        match self {
            SpecFormatArg::Openapi => "openapi",
            SpecFormatArg::Graphql => "graphql",
            SpecFormatArg::JsonSchema => "json_schema",
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum PeriodArg {
    Week,
    Month,
    Quarter,
}

impl PeriodArg {
    pub fn as_str(self) -> &'static str {
        match self {
            PeriodArg::Week => "week",
            PeriodArg::Month => "month",
            PeriodArg::Quarter => "quarter",
        }
    }
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum SeverityArg {
    Critical,
    High,
    Medium,
    Low,
}

impl SeverityArg {
    pub fn as_str(self) -> &'static str {
        match self {
            SeverityArg::Critical => "critical",
            SeverityArg::High => "high",
            SeverityArg::Medium => "medium",
            SeverityArg::Low => "low",
        }
    }
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum OutputFormatArg {
    Markdown,
    Html,
}

impl OutputFormatArg {
    pub fn as_str(self) -> &'static str {
        match self {
            OutputFormatArg::Markdown => "markdown",
            OutputFormatArg::Html => "html",
        }
    }
}

impl fmt::Display for OutputFormatArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
