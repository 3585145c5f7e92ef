#![deny(clippy::all, clippy::pedantic)]

use reqwest::Method;
use serde_json::Value;

use crate::args::ReportsCmd;
use crate::client::{CliError, Ctx};
use crate::print::print_json;

pub async fn handle(ctx: &Ctx, cmd: ReportsCmd) -> Result<(), CliError> {
    let (path, query) = match cmd {
        ReportsCmd::Leaderboard {
            period,
            team_id,
            spec_format,
            threshold,
        } => {
            let mut q = vec![("time_period", period.as_str().to_string())];
            if let Some(team) = team_id {
                q.push(("team_id", team));
            }
            if let Some(format) = spec_format {
                q.push(("spec_format", format.as_str().to_string()));
            }
            if let Some(threshold) = threshold {
                q.push(("poor_quality_threshold", threshold.to_string()));
            }
            ("api/v1/leaderboard".to_string(), q)
        }
        ReportsCmd::TeamStanding { team_id, period } => (
            format!("api/v1/leaderboard/teams/{team_id}"),
            vec![("time_period", period.as_str().to_string())],
        ),
        ReportsCmd::Alerts {
            days,
            team_id,
            severity,
        } => {
            let mut q = vec![("days", days.to_string())];
            if let Some(team) = team_id {
                q.push(("team_id", team));
            }
            if let Some(severity) = severity {
                q.push(("severity", severity.as_str().to_string()));
            }
            ("api/v1/quality/alerts".to_string(), q)
        }
        ReportsCmd::Monitoring { days } => (
            "api/v1/quality/monitoring".to_string(),
            vec![("days", days.to_string())],
        ),
    };

    let res: Value = ctx
        .request(Method::GET, &path, Some(&query), None)
        .await?;
    print_json(&res)
}
