//! specdoc-cli: command-line client for the documentation job API.
#![deny(clippy::all, clippy::pedantic)]

mod args;
mod client;
mod handlers;
mod io;
mod print;


use clap::Parser;

use args::{Cli, Commands};
use client::{CliError, build_ctx_from_cli};
use handlers::{jobs, reports, system};

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let cli = Cli::parse();
    let ctx = build_ctx_from_cli(&cli)?;

    match cli.command {
        Commands::System(cmd) => system::handle(&ctx, cmd).await?,
        Commands::Jobs(cmd) => jobs::handle(&ctx, cmd).await?,
        Commands::Reports(cmd) => reports::handle(&ctx, cmd).await?,
    }

    Ok(())
}
