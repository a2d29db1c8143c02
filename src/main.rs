//! dataculpa-load-csv entry point.
//!
//! Initializes logging and delegates to the CLI module for the load.

use std::process::ExitCode;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// HTTP stack crates are kept quiet below `warn`.
const QUIET_HTTP_DIRECTIVES: &str = "reqwest=warn,hyper=warn,hyper_util=warn";

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<ExitCode> {
    // Parse CLI arguments first to get log_level
    let cli = dataculpa_load_csv::cli::parse_cli();

    // Priority: RUST_LOG env var > --log-level CLI arg > default "info"
    let log_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| format!("{},{}", cli.log_level, QUIET_HTTP_DIRECTIVES));

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_new(&log_filter).unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    dataculpa_load_csv::cli::run_with_cli(cli).await
}
