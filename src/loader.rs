//! CSV load workflow.
//!
//! Runs the gates of a single load in order: env file, CSV argument,
//! configuration, metadata, client, load, commit. The first failing gate
//! ends the run with a [`LoadError`] that carries the process exit code.

use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::config::{echo_dc_vars, DataCulpaConfig, EnvSource};
use crate::error::{LoadError, ValidatorError};
use crate::validator::Validator;

/// Default location of the environment file.
pub const DEFAULT_ENV_PATH: &str = ".env";

/// Inputs of one load invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadRequest {
    /// Environment file to load `DC_*` variables from.
    pub env_path: PathBuf,
    /// CSV file to submit.
    pub csv_path: Option<PathBuf>,
    /// Metadata document as a JSON string.
    pub metadata: Option<String>,
    /// Pipeline stage overriding `DC_PIPELINE_STAGE`.
    pub stage: Option<String>,
}

impl LoadRequest {
    /// Create a request for `csv_path` using the default env file.
    pub fn new(csv_path: impl Into<PathBuf>) -> Self {
        Self {
            env_path: PathBuf::from(DEFAULT_ENV_PATH),
            csv_path: Some(csv_path.into()),
            metadata: None,
            stage: None,
        }
    }

    /// Set the environment file.
    pub fn with_env_path(mut self, env_path: impl Into<PathBuf>) -> Self {
        self.env_path = env_path.into();
        self
    }

    /// Set the metadata JSON string.
    pub fn with_metadata(mut self, metadata: impl Into<String>) -> Self {
        self.metadata = Some(metadata.into());
        self
    }

    /// Set the pipeline stage override.
    pub fn with_stage(mut self, stage: impl Into<String>) -> Self {
        self.stage = Some(stage.into());
        self
    }

    fn csv_path(&self) -> Option<&Path> {
        self.csv_path
            .as_deref()
            .filter(|p| !p.as_os_str().is_empty())
    }
}

/// Run one load.
///
/// `connect` builds the validator from the resolved configuration and is
/// only called once every input has been validated. Every `DC_` variable is
/// echoed to `out` after the env file is loaded.
///
/// # Errors
///
/// Returns the `LoadError` of the first gate that fails.
pub async fn run_load<E, F, V, W>(
    request: &LoadRequest,
    env: &mut E,
    connect: F,
    out: &mut W,
) -> Result<(), LoadError>
where
    E: EnvSource,
    F: FnOnce(&DataCulpaConfig) -> Result<V, ValidatorError>,
    V: Validator,
    W: Write,
{
    if !request.env_path.exists() {
        return Err(LoadError::MissingEnvFile(request.env_path.clone()));
    }

    let csv_path = request.csv_path().ok_or(LoadError::MissingCsvPath)?;

    env.load_file(&request.env_path)?;
    let vars = env.vars();
    let echoed = echo_dc_vars(&vars, out)?;
    debug!(env_file = %request.env_path.display(), echoed, "Loaded environment");

    let mut config = DataCulpaConfig::from_vars(&vars);
    if let Some(stage) = &request.stage {
        config = config.with_stage(stage.clone());
    }

    let metadata = request
        .metadata
        .as_deref()
        .map(serde_json::from_str::<serde_json::Value>)
        .transpose()
        .map_err(LoadError::InvalidMetadata)?;

    let mut validator = connect(&config)?;

    if let Some(metadata) = metadata {
        validator.queue_metadata(metadata);
    }

    if !validator.load_csv_file(csv_path).await {
        return Err(LoadError::LoadFailed {
            path: csv_path.to_path_buf(),
            errors: validator.errors().to_vec(),
        });
    }

    validator.queue_commit().await;
    if validator.has_errors() {
        return Err(LoadError::Validation(validator.errors().to_vec()));
    }

    info!(
        csv = %csv_path.display(),
        pipeline = config.pipeline_name.as_deref().unwrap_or_default(),
        stage = %config.pipeline_stage,
        "CSV load committed without errors"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MemoryEnv;

    struct NeverConnect;

    #[async_trait::async_trait]
    impl Validator for NeverConnect {
        fn queue_metadata(&mut self, _metadata: serde_json::Value) {}
        async fn load_csv_file(&mut self, _path: &Path) -> bool {
            false
        }
        async fn queue_commit(&mut self) {}
        fn errors(&self) -> &[String] {
            &[]
        }
    }

    fn refuse(_: &DataCulpaConfig) -> Result<NeverConnect, ValidatorError> {
        panic!("validator must not be constructed");
    }

    #[test]
    fn test_request_builder() {
        let request = LoadRequest::new("data.csv")
            .with_env_path("conf/.env")
            .with_metadata("{}")
            .with_stage("ingest");

        assert_eq!(request.env_path, PathBuf::from("conf/.env"));
        assert_eq!(request.csv_path, Some(PathBuf::from("data.csv")));
        assert_eq!(request.metadata.as_deref(), Some("{}"));
        assert_eq!(request.stage.as_deref(), Some("ingest"));
    }

    #[test]
    fn test_empty_csv_path_counts_as_missing() {
        let request = LoadRequest::new("");
        assert!(request.csv_path().is_none());
    }

    #[tokio::test]
    async fn test_missing_env_file_leaves_env_untouched() {
        let temp = tempfile::TempDir::new().unwrap();
        let request = LoadRequest::new("data.csv").with_env_path(temp.path().join(".env"));
        let mut env = MemoryEnv::default();
        let mut out = Vec::new();

        let err = run_load(&request, &mut env, refuse, &mut out)
            .await
            .unwrap_err();

        assert!(matches!(err, LoadError::MissingEnvFile(_)));
        assert_eq!(err.exit_code(), 1);
        assert!(env.vars().is_empty());
        assert!(out.is_empty());
    }
}
