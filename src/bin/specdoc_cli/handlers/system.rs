#![deny(clippy::all, clippy::pedantic)]

use reqwest::Method;

use crate::args::SystemCmd;
use crate::client::{CliError, Ctx};
use crate::print::print_json;

pub async fn handle(ctx: &Ctx, cmd: SystemCmd) -> Result<(), CliError> {
    let path = match cmd {
        SystemCmd::Queue => "api/v1/queue",
        SystemCmd::Health => "api/v1/health",
        SystemCmd::RateLimit => "api/v1/rate-limit/status",
    };
    let res: serde_json::Value = ctx.request(Method::GET, path, None, None).await?;
    print_json(&res)
}
