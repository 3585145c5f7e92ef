#![deny(clippy::all, clippy::pedantic)]

use std::path::PathBuf;

use reqwest::Method;
use serde_json::{Value, json};
use uuid::Uuid;

use crate::args::{JobStatusArg, JobsCmd, OutputFormatArg, SubmitTarget};
use crate::client::{CliError, Ctx};
use crate::io::{check_time_opt, read_file, write_file};
use crate::print::print_json;

pub async fn handle(ctx: &Ctx, cmd: JobsCmd) -> Result<(), CliError> {
    match cmd {
        JobsCmd::Submit(args) => {
            let specification = read_file(&args.file)?;
            submit(ctx, "api/v1/jobs", "specification", specification, args.target).await
        }
        JobsCmd::SubmitUrl(args) => {
            submit(ctx, "api/v1/jobs/from-url", "specification_url", args.url, args.target).await
        }
        JobsCmd::List {
            team_id,
            service_name,
            status,
            since,
            until,
            limit,
        } => list(ctx, team_id, service_name, status, since, until, limit).await,
        JobsCmd::Active => get(ctx, "api/v1/jobs/active", None).await,
        JobsCmd::Status { id } => get(ctx, &format!("api/v1/jobs/{id}"), None).await,
        JobsCmd::Cancel { id } => {
            let res: Value = ctx
                .request(Method::DELETE, &format!("api/v1/jobs/{id}"), None, None)
                .await?;
            print_json(&res)
        }
        JobsCmd::Quality { id } => get(ctx, &format!("api/v1/jobs/{id}/quality"), None).await,
        JobsCmd::Download { id, format, out } => download(ctx, id, format, out).await,
        JobsCmd::Stats { team_id, days } => {
            let mut q = vec![("days", days.to_string())];
            if let Some(team) = team_id {
                q.push(("team_id", team));
            }
            get(ctx, "api/v1/jobs/stats", Some(&q)).await
        }
    }
}

async fn get(ctx: &Ctx, path: &str, query: Option<&[(&str, String)]>) -> Result<(), CliError> {
    let res: Value = ctx.request(Method::GET, path, query, None).await?;
    print_json(&res)
}

async fn submit(
    ctx: &Ctx,
    path: &str,
    source_field: &str,
    source: String,
    target: SubmitTarget,
) -> Result<(), CliError> {
    let mut body = serde_json::Map::new();
    body.insert(source_field.to_string(), Value::from(source));
    body.insert("team_id".into(), Value::from(target.team_id));
    body.insert("service_name".into(), Value::from(target.service_name));
    body.insert(
        "output_formats".into(),
        target
            .output_formats
            .iter()
            .map(|format| Value::from(format.as_str()))
            .collect(),
    );
    if let Some(format) = target.spec_format {
        body.insert("spec_format".into(), Value::from(format.as_str()));
    }

    let res: Value = ctx
        .request(Method::POST, path, None, Some(Value::Object(body)))
        .await?;
    print_json(&res)
}

async fn list(
    ctx: &Ctx,
    team_id: Option<String>,
    service_name: Option<String>,
    status: Option<JobStatusArg>,
    since: Option<String>,
    until: Option<String>,
    limit: u32,
) -> Result<(), CliError> {
    let mut q = vec![("limit", limit.to_string())];
    if let Some(t) = team_id {
        q.push(("team_id", t));
    }
    if let Some(s) = service_name {
        q.push(("service_name", s));
    }
    if let Some(s) = status {
        q.push(("status", s.as_str().to_string()));
    }
    if let Some(s) = check_time_opt(since)? {
        q.push(("created_after", s));
    }
    if let Some(u) = check_time_opt(until)? {
        q.push(("created_before", u));
    }
    get(ctx, "api/v1/jobs", Some(&q)).await
}

async fn download(
    ctx: &Ctx,
    id: Uuid,
    format: OutputFormatArg,
    out: Option<PathBuf>,
) -> Result<(), CliError> {
    let content = ctx
        .request_text(&format!("api/v1/jobs/{id}/download/{format}"))
        .await?;
    match out {
        Some(path) => {
            write_file(&path, &content)?;
            print_json(&json!({ "job_id": id, "format": format.as_str(), "written": path }))
        }
        None => {
            print!("{content}");
            Ok(())
        }
    }
}
