//! Environment sources and env-file loading.

use std::io::{self, Write};
use std::path::Path;

use crate::error::ConfigError;

/// Prefix shared by every Data Culpa variable.
pub const DC_PREFIX: &str = "DC_";

/// A set of environment variables that an env file can be loaded into.
pub trait EnvSource {
    /// Loads `KEY=value` pairs from `path`.
    ///
    /// Variables that are already present keep their current value.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file is missing or cannot be parsed.
    fn load_file(&mut self, path: &Path) -> Result<(), ConfigError>;

    /// Returns all variables in iteration order.
    fn vars(&self) -> Vec<(String, String)>;
}

/// The real process environment.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn load_file(&mut self, path: &Path) -> Result<(), ConfigError> {
        dotenvy::from_path(path).map_err(|e| env_file_error(path, e))
    }

    fn vars(&self) -> Vec<(String, String)> {
        std::env::vars_os()
            .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
            .collect()
    }
}

/// An in-memory environment that never touches the process.
#[derive(Debug, Default, Clone)]
pub struct MemoryEnv {
    vars: Vec<(String, String)>,
}

impl MemoryEnv {
    /// Creates an environment holding exactly `vars`.
    pub fn new(vars: Vec<(String, String)>) -> Self {
        Self { vars }
    }

    /// Sets `key` unless it is already present.
    pub fn set_default(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        if !self.vars.iter().any(|(k, _)| *k == key) {
            self.vars.push((key, value.into()));
        }
    }
}

impl EnvSource for MemoryEnv {
    fn load_file(&mut self, path: &Path) -> Result<(), ConfigError> {
        let iter = dotenvy::from_path_iter(path).map_err(|e| env_file_error(path, e))?;
        for item in iter {
            let (key, value) = item.map_err(|e| env_file_error(path, e))?;
            self.set_default(key, value);
        }
        Ok(())
    }

    fn vars(&self) -> Vec<(String, String)> {
        self.vars.clone()
    }
}

fn env_file_error(path: &Path, source: dotenvy::Error) -> ConfigError {
    if source.not_found() {
        ConfigError::MissingEnvFile(path.to_path_buf())
    } else {
        ConfigError::EnvFile {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Writes every `DC_` variable as `<key right-aligned to 20> -> <value>`.
///
/// Returns the number of lines written.
pub fn echo_dc_vars<W: Write>(vars: &[(String, String)], out: &mut W) -> io::Result<usize> {
    let mut written = 0;
    for (key, value) in vars.iter().filter(|(k, _)| k.starts_with(DC_PREFIX)) {
        writeln!(out, "{key:>20} -> {value}")?;
        written += 1;
    }
    Ok(written)
}
