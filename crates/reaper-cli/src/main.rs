mod args;
mod output;
mod purge;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use reaper_common::{init_tracing, shutdown_tracing, PurgeConfig};
use reaper_engine::RestProcessEngine;

use crate::args::Args;
use crate::output::print_report;
use crate::purge::{run_purge, PurgeOptions};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let provider = init_tracing(
        "reaper",
        args.otlp_endpoint.as_deref(),
        args.otlp_token.as_deref(),
    );

    let result = run(&args).await;
    shutdown_tracing(provider);
    result
}

async fn run(args: &Args) -> Result<()> {
    let config = PurgeConfig::load(&args.config)?;
    info!(
        config=%args.config.display(),
        target_url=%config.base_url(),
        dry_run = args.dry_run,
        exclusions = config.has_exclusions(),
        "reaper starting"
    );

    let engine = RestProcessEngine::new(&config).context("failed to build HTTP client")?;
    let report = run_purge(
        &engine,
        &config,
        PurgeOptions {
            dry_run: args.dry_run,
        },
    )
    .await;

    print_report(&report);
    Ok(())
}
