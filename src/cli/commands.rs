//! CLI definition for dataculpa-load-csv.
//!
//! A single command: load the env file, submit one CSV file to the
//! configured Data Culpa pipeline, and exit with a code describing the
//! outcome.

use anyhow::Context;
use clap::Parser;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::error;

use crate::config::{DataCulpaConfig, EnvSource, ProcessEnv};
use crate::error::ValidatorError;
use crate::loader::{run_load, LoadRequest, DEFAULT_ENV_PATH};
use crate::validator::{DataCulpaClient, Validator};

/// Process exit code of a load that committed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// Load a CSV file into a Data Culpa validation pipeline.
#[derive(Parser, Debug)]
#[command(name = "dataculpa-load-csv")]
#[command(about = "Load a CSV file into a Data Culpa validation pipeline")]
#[command(version)]
#[command(
    long_about = "dataculpa-load-csv reads DC_* settings from an env file and submits a CSV file to a Data Culpa pipeline.\n\nExit codes: 0 success, 1 missing env file or bad configuration, 2 missing or failed CSV load, 3 validation errors, 4 invalid metadata JSON.\n\nExample usage:\n  dataculpa-load-csv -e prod.env -f orders.csv -m '{\"source\": \"nightly\"}'"
)]
pub struct Cli {
    /// Use provided env file instead of default .env.
    #[arg(short, long, default_value = DEFAULT_ENV_PATH)]
    pub env: PathBuf,

    /// CSV file to load.
    #[arg(short = 'f', long)]
    pub csv: Option<PathBuf>,

    /// Metadata structure in JSON to store with the data.
    #[arg(short, long)]
    pub meta: Option<String>,

    /// Pipeline stage to use instead of DC_PIPELINE_STAGE.
    #[arg(short, long)]
    pub stage: Option<String>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info")]
    pub log_level: String,
}

impl Cli {
    /// Build the load request described by these arguments.
    pub fn load_request(&self) -> LoadRequest {
        LoadRequest {
            env_path: self.env.clone(),
            csv_path: self.csv.clone(),
            metadata: self.meta.clone(),
            stage: self.stage.clone(),
        }
    }
}

/// Parse CLI arguments from the process command line.
pub fn parse_cli() -> Cli {
    Cli::parse()
}

/// Run the CLI with the parsed arguments.
///
/// Failures of the load are reported on stderr and turned into the matching
/// exit code.
///
/// # Errors
///
/// Returns an error only if stdout or stderr cannot be written.
pub async fn run_with_cli(cli: Cli) -> anyhow::Result<ExitCode> {
    let code = run_with_io(
        &cli,
        &mut ProcessEnv,
        DataCulpaClient::new,
        &mut io::stdout(),
        &mut io::stderr(),
    )
    .await?;
    Ok(ExitCode::from(code))
}

/// Run the load with an explicit environment, client constructor and output
/// streams, returning the process exit code.
///
/// The fmt logging layer writes to stdout from blocking threads while the
/// load is awaiting, so `out` must lock per write (as `io::Stdout` does),
/// never for the whole run.
///
/// # Errors
///
/// Returns an error only if `out` or `err_out` cannot be written.
pub async fn run_with_io<E, F, V, O, R>(
    cli: &Cli,
    env: &mut E,
    connect: F,
    out: &mut O,
    err_out: &mut R,
) -> anyhow::Result<u8>
where
    E: EnvSource,
    F: FnOnce(&DataCulpaConfig) -> Result<V, ValidatorError>,
    V: Validator,
    O: Write,
    R: Write,
{
    let request = cli.load_request();
    let result = run_load(&request, env, connect, out).await;
    out.flush().context("failed to flush stdout")?;

    match result {
        Ok(()) => Ok(EXIT_SUCCESS),
        Err(err) => {
            error!(error = %err, exit_code = err.exit_code(), "CSV load failed");
            err.report(err_out)
                .context("failed to write diagnostics to stderr")?;
            err_out.flush().context("failed to flush stderr")?;
            Ok(err.exit_code())
        }
    }
}
