//! Data Culpa pipeline configuration.
//!
//! The configuration is resolved once per invocation from `DC_*` environment
//! variables, after the env file has been loaded into an [`EnvSource`].

mod env;

pub use env::{echo_dc_vars, EnvSource, MemoryEnv, ProcessEnv, DC_PREFIX};

use std::fmt;

/// Value used for pipeline environment, stage and version when unset.
pub const DEFAULT_PIPELINE_FIELD: &str = "default";

/// Identity and endpoint settings of one Data Culpa pipeline.
#[derive(Clone, PartialEq, Eq)]
pub struct DataCulpaConfig {
    /// Pipeline name (`DC_PIPELINE_NAME`).
    pub pipeline_name: Option<String>,
    /// Pipeline environment (`DC_PIPELINE_ENV`, default `default`).
    pub pipeline_env: String,
    /// Pipeline stage (`DC_PIPELINE_STAGE`, default `default`).
    pub pipeline_stage: String,
    /// Pipeline version (`DC_PIPELINE_VERSION`, default `default`).
    pub pipeline_version: String,
    /// Validation service host (`DC_HOST`).
    pub host: Option<String>,
    /// Validation service port (`DC_PORT`).
    pub port: Option<String>,
    /// Validation service protocol (`DC_PROTOCOL`).
    pub protocol: Option<String>,
    /// API secret (`DC_SECRET`).
    pub secret: Option<String>,
}

impl DataCulpaConfig {
    /// Creates configuration from a list of `(key, value)` pairs.
    ///
    /// When a key appears more than once the first occurrence wins.
    pub fn from_vars(vars: &[(String, String)]) -> Self {
        Self::from_lookup(|key| {
            vars.iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.clone())
        })
    }

    /// Creates configuration by resolving each variable through `lookup`.
    ///
    /// Only an unset variable falls back to its default; a variable set to
    /// the empty string keeps the empty string.
    ///
    /// # Environment Variables
    ///
    /// - `DC_PIPELINE_NAME`: Pipeline name
    /// - `DC_PIPELINE_ENV`: Pipeline environment (default: default)
    /// - `DC_PIPELINE_STAGE`: Pipeline stage (default: default)
    /// - `DC_PIPELINE_VERSION`: Pipeline version (default: default)
    /// - `DC_HOST`: Validation service host
    /// - `DC_PORT`: Validation service port
    /// - `DC_PROTOCOL`: `http` or `https`
    /// - `DC_SECRET`: API secret
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let or_default =
            |key: &str| lookup(key).unwrap_or_else(|| DEFAULT_PIPELINE_FIELD.to_string());

        Self {
            pipeline_name: lookup("DC_PIPELINE_NAME"),
            pipeline_env: or_default("DC_PIPELINE_ENV"),
            pipeline_stage: or_default("DC_PIPELINE_STAGE"),
            pipeline_version: or_default("DC_PIPELINE_VERSION"),
            host: lookup("DC_HOST"),
            port: lookup("DC_PORT"),
            protocol: lookup("DC_PROTOCOL"),
            secret: lookup("DC_SECRET"),
        }
    }

    /// Returns this configuration with the pipeline stage replaced.
    pub fn with_stage(mut self, stage: impl Into<String>) -> Self {
        self.pipeline_stage = stage.into();
        self
    }
}

impl fmt::Debug for DataCulpaConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataCulpaConfig")
            .field("pipeline_name", &self.pipeline_name)
            .field("pipeline_env", &self.pipeline_env)
            .field("pipeline_stage", &self.pipeline_stage)
            .field("pipeline_version", &self.pipeline_version)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("protocol", &self.protocol)
            .field("secret", &self.secret.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}
