//! Error types for dataculpa-load-csv.
//!
//! Defines error types for each stage of a load:
//! - Environment file loading and configuration
//! - Validator client construction
//! - The load workflow itself, including exit-code mapping

use std::io::{self, Write};
use std::path::PathBuf;
use thiserror::Error;

/// Process exit code for a missing environment file or unusable configuration.
pub const EXIT_CONFIG: u8 = 1;
/// Process exit code for a missing CSV argument or a failed load.
pub const EXIT_LOAD: u8 = 2;
/// Process exit code when the validator reported errors after commit.
pub const EXIT_VALIDATION: u8 = 3;
/// Process exit code for metadata that is not valid JSON.
pub const EXIT_METADATA: u8 = 4;

/// Errors that can occur while reading the environment file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing env file at {}", .0.display())]
    MissingEnvFile(PathBuf),

    #[error("failed to parse env file {}: {source}", path.display())]
    EnvFile {
        path: PathBuf,
        #[source]
        source: dotenvy::Error,
    },
}

/// Errors that can occur while constructing a validator client.
#[derive(Debug, Error)]
pub enum ValidatorError {
    #[error("DC_PIPELINE_NAME is not set")]
    MissingPipelineName,

    #[error("DC_HOST is not set")]
    MissingHost,

    #[error("invalid DC_PORT '{0}': expected a port number")]
    InvalidPort(String),

    #[error("unsupported DC_PROTOCOL '{0}': expected 'http' or 'https'")]
    UnsupportedProtocol(String),

    #[error("failed to build HTTP client: {0}")]
    Http(#[from] reqwest::Error),
}

/// Terminal outcome of a failed load, one variant per gate.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("missing env file at {}", .0.display())]
    MissingEnvFile(PathBuf),

    #[error("no csv file specified to load.")]
    MissingCsvPath,

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("metadata is not valid JSON: {0}")]
    InvalidMetadata(#[source] serde_json::Error),

    #[error("cannot create validator client: {0}")]
    Client(#[from] ValidatorError),

    #[error("failed to load csv file {}", path.display())]
    LoadFailed { path: PathBuf, errors: Vec<String> },

    #[error("validator reported {} error(s) while processing data", .0.len())]
    Validation(Vec<String>),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl LoadError {
    /// Exit code the process terminates with for this failure.
    pub fn exit_code(&self) -> u8 {
        match self {
            LoadError::MissingEnvFile(_)
            | LoadError::Config(_)
            | LoadError::Client(_)
            | LoadError::Io(_) => EXIT_CONFIG,
            LoadError::MissingCsvPath | LoadError::LoadFailed { .. } => EXIT_LOAD,
            LoadError::Validation(_) => EXIT_VALIDATION,
            LoadError::InvalidMetadata(_) => EXIT_METADATA,
        }
    }

    /// Writes the operator-facing diagnostic for this failure.
    ///
    /// Validation failures list every error reported by the validator, one
    /// per line, under a heading.
    pub fn report<W: Write>(&self, out: &mut W) -> io::Result<()> {
        match self {
            LoadError::Validation(errors) => {
                writeln!(out, "Errors while processing data:")?;
                for error in errors {
                    writeln!(out, "{error}")?;
                }
            }
            LoadError::LoadFailed { errors, .. } => {
                writeln!(out, "Error: {self}")?;
                for error in errors {
                    writeln!(out, "{error}")?;
                }
            }
            other => writeln!(out, "Error: {other}")?,
        }
        Ok(())
    }
}
