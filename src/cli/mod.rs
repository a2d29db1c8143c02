//! Command-line interface for dataculpa-load-csv.

mod commands;

pub use commands::{parse_cli, run_with_cli, run_with_io, Cli, EXIT_SUCCESS};
