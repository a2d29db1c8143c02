//! dataculpa-load-csv: load CSV files into Data Culpa validation pipelines.
//!
//! This library provides the configuration resolver, the load workflow and
//! the validator client used by the `dataculpa-load-csv` binary.

pub mod cli;
pub mod config;
pub mod error;
pub mod loader;
pub mod validator;

// Re-export commonly used types
pub use config::DataCulpaConfig;
pub use error::{ConfigError, LoadError, ValidatorError};
pub use loader::{run_load, LoadRequest};
pub use validator::{DataCulpaClient, Validator};
