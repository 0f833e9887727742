use std::path::PathBuf;

use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "reaper")]
#[command(
    version,
    about = "Bulk-delete workflow engine process instances matching a history query",
    long_about = None
)]
pub struct Args {
    /// JSON config with host, port, baseUri, includedCondition and excludedCondition
    #[arg(long, env = "REAPER_CONFIG", default_value = "config.json")]
    pub config: PathBuf,

    /// Resolve and log the instances that would be deleted without deleting them
    #[arg(long)]
    pub dry_run: bool,

    /// OTLP endpoint for exporting traces (e.g. "http://127.0.0.1:4318").
    #[arg(long, env = "REAPER_OTLP_ENDPOINT")]
    pub otlp_endpoint: Option<String>,

    /// Bearer token for the OTLP endpoint.
    #[arg(long, env = "REAPER_OTLP_TOKEN")]
    pub otlp_token: Option<String>,
}
