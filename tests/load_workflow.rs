//! Integration tests for the CSV load workflow.
//!
//! The validator is replaced by a recording stub so each gate of the
//! workflow can be exercised without a Data Culpa server.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::cell::Cell;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use dataculpa_load_csv::config::{EnvSource, MemoryEnv};
use dataculpa_load_csv::{
    run_load, DataCulpaConfig, LoadError, LoadRequest, Validator, ValidatorError,
};

/// Scripted validator that records every call made to it.
#[derive(Default)]
struct StubValidator {
    load_result: bool,
    commit_errors: Vec<String>,
    errors: Vec<String>,
    metadata: Option<Value>,
    loaded: Vec<PathBuf>,
    commits: usize,
}

impl StubValidator {
    fn loading(load_result: bool) -> Self {
        Self {
            load_result,
            ..Self::default()
        }
    }

    fn with_commit_errors(mut self, errors: &[&str]) -> Self {
        self.commit_errors = errors.iter().map(|e| e.to_string()).collect();
        self
    }
}

#[async_trait]
impl Validator for StubValidator {
    fn queue_metadata(&mut self, metadata: Value) {
        self.metadata = Some(metadata);
    }

    async fn load_csv_file(&mut self, path: &Path) -> bool {
        self.loaded.push(path.to_path_buf());
        if !self.load_result {
            self.errors.push("server rejected upload".to_string());
        }
        self.load_result
    }

    async fn queue_commit(&mut self) {
        self.commits += 1;
        self.errors.extend(self.commit_errors.drain(..));
    }

    fn errors(&self) -> &[String] {
        &self.errors
    }
}

struct Fixture {
    dir: TempDir,
}

impl Fixture {
    fn new(env_content: &str) -> Self {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(".env"), env_content).unwrap();
        fs::write(dir.path().join("orders.csv"), "id,total\n1,9.99\n").unwrap();
        Self { dir }
    }

    fn env_path(&self) -> PathBuf {
        self.dir.path().join(".env")
    }

    fn csv_path(&self) -> PathBuf {
        self.dir.path().join("orders.csv")
    }

    fn request(&self) -> LoadRequest {
        LoadRequest::new(self.csv_path()).with_env_path(self.env_path())
    }
}

const ENV: &str = "DC_PIPELINE_NAME=orders\nDC_HOST=dc.local\nDC_PORT=7777\nOTHER=ignored\n";

/// Hands out a borrowed stub so its state can be inspected after the run.
fn lend<'a>(
    stub: &'a mut StubValidator,
) -> impl FnOnce(&DataCulpaConfig) -> Result<&'a mut StubValidator, ValidatorError> + 'a {
    move |_: &DataCulpaConfig| Ok(stub)
}

/// Runs the workflow with `stub` as the validator. Also returns whether the
/// constructor was called and the configuration it was given.
async fn run_with_stub(
    request: &LoadRequest,
    env: &mut MemoryEnv,
    stub: StubValidator,
    out: &mut Vec<u8>,
) -> (Result<(), LoadError>, bool, Option<DataCulpaConfig>) {
    let constructed = Cell::new(false);
    let mut seen_config = None;
    let result = run_load(
        request,
        env,
        |config: &DataCulpaConfig| -> Result<StubValidator, ValidatorError> {
            constructed.set(true);
            seen_config = Some(config.clone());
            Ok(stub)
        },
        out,
    )
    .await;
    (result, constructed.get(), seen_config)
}

#[tokio::test]
async fn test_missing_env_file_exits_1_without_side_effects() {
    let fixture = Fixture::new(ENV);
    let request =
        LoadRequest::new(fixture.csv_path()).with_env_path(fixture.dir.path().join("missing.env"));
    let mut env = MemoryEnv::default();
    let mut out = Vec::new();

    let (result, constructed, _) =
        run_with_stub(&request, &mut env, StubValidator::loading(true), &mut out).await;

    let err = result.unwrap_err();
    assert_eq!(err.exit_code(), 1);
    assert!(!constructed);
    assert!(env.vars().is_empty());
    assert!(out.is_empty());
}

#[tokio::test]
async fn test_missing_csv_path_exits_2_before_client() {
    let fixture = Fixture::new(ENV);
    let mut request = fixture.request();
    request.csv_path = None;
    let mut env = MemoryEnv::default();
    let mut out = Vec::new();

    let (result, constructed, _) =
        run_with_stub(&request, &mut env, StubValidator::loading(true), &mut out).await;

    let err = result.unwrap_err();
    assert!(matches!(err, LoadError::MissingCsvPath));
    assert_eq!(err.exit_code(), 2);
    assert!(!constructed);
    assert!(env.vars().is_empty());
}

#[tokio::test]
async fn test_failed_load_exits_2_with_client_errors() {
    let fixture = Fixture::new(ENV);
    let request = fixture.request();
    let mut env = MemoryEnv::default();
    let mut out = Vec::new();

    let (result, constructed, _) =
        run_with_stub(&request, &mut env, StubValidator::loading(false), &mut out).await;

    assert!(constructed);
    match result.unwrap_err() {
        LoadError::LoadFailed { path, errors } => {
            assert_eq!(path, fixture.csv_path());
            assert_eq!(errors, vec!["server rejected upload".to_string()]);
        }
        other => panic!("expected LoadFailed, got {other:?}"),
    }
}

#[tokio::test]
async fn test_failed_load_never_commits() {
    let fixture = Fixture::new(ENV);
    let mut env = MemoryEnv::default();
    let mut out = Vec::new();
    let mut stub = StubValidator::loading(false);

    let result = run_load(
        &fixture.request(),
        &mut env,
        lend(&mut stub),
        &mut out,
    )
    .await;

    assert_eq!(result.unwrap_err().exit_code(), 2);
    assert_eq!(stub.loaded, vec![fixture.csv_path()]);
    assert_eq!(stub.commits, 0);
}

#[tokio::test]
async fn test_validation_errors_exit_3_after_one_commit() {
    let fixture = Fixture::new(ENV);
    let mut env = MemoryEnv::default();
    let mut out = Vec::new();
    let mut stub = StubValidator::loading(true)
        .with_commit_errors(&["row 1: total below minimum", "row 1: id not unique"]);

    let result = run_load(
        &fixture.request(),
        &mut env,
        lend(&mut stub),
        &mut out,
    )
    .await;

    let err = result.unwrap_err();
    assert_eq!(err.exit_code(), 3);
    assert_eq!(stub.commits, 1);

    let mut stderr = Vec::new();
    err.report(&mut stderr).unwrap();
    assert_eq!(
        String::from_utf8(stderr).unwrap(),
        "Errors while processing data:\nrow 1: total below minimum\nrow 1: id not unique\n"
    );
}

#[tokio::test]
async fn test_clean_load_succeeds() {
    let fixture = Fixture::new(ENV);
    let mut env = MemoryEnv::default();
    let mut out = Vec::new();
    let mut stub = StubValidator::loading(true);

    let result = run_load(
        &fixture.request(),
        &mut env,
        lend(&mut stub),
        &mut out,
    )
    .await;

    assert!(result.is_ok());
    assert_eq!(stub.commits, 1);
    assert!(stub.metadata.is_none());
    assert!(!stub.has_errors());
}

#[tokio::test]
async fn test_dc_vars_echoed_once_in_order() {
    let fixture = Fixture::new(ENV);
    let mut env = MemoryEnv::new(vec![("DC_PIPELINE_ENV".to_string(), "staging".to_string())]);
    let mut out = Vec::new();

    let (result, _, config) =
        run_with_stub(&fixture.request(), &mut env, StubValidator::loading(true), &mut out).await;

    assert!(result.is_ok());
    assert_eq!(
        String::from_utf8(out).unwrap(),
        concat!(
            "     DC_PIPELINE_ENV -> staging\n",
            "    DC_PIPELINE_NAME -> orders\n",
            "             DC_HOST -> dc.local\n",
            "             DC_PORT -> 7777\n",
        )
    );

    let config = config.unwrap();
    assert_eq!(config.pipeline_name.as_deref(), Some("orders"));
    assert_eq!(config.pipeline_env, "staging");
    assert_eq!(config.pipeline_stage, "default");
}

#[tokio::test]
async fn test_metadata_is_queued_before_load() {
    let fixture = Fixture::new(ENV);
    let request = fixture.request().with_metadata(r#"{"source": "nightly", "batch": 7}"#);
    let mut env = MemoryEnv::default();
    let mut out = Vec::new();
    let mut stub = StubValidator::loading(true);

    let result = run_load(
        &request,
        &mut env,
        lend(&mut stub),
        &mut out,
    )
    .await;

    assert!(result.is_ok());
    assert_eq!(stub.metadata, Some(json!({"source": "nightly", "batch": 7})));
}

#[tokio::test]
async fn test_malformed_metadata_exits_4_before_client() {
    let fixture = Fixture::new(ENV);
    let request = fixture.request().with_metadata("{not json");
    let mut env = MemoryEnv::default();
    let mut out = Vec::new();

    let (result, constructed, _) =
        run_with_stub(&request, &mut env, StubValidator::loading(true), &mut out).await;

    let err = result.unwrap_err();
    assert!(matches!(err, LoadError::InvalidMetadata(_)));
    assert_eq!(err.exit_code(), 4);
    assert!(!constructed);
}

#[tokio::test]
async fn test_stage_override_reaches_client() {
    let fixture = Fixture::new("DC_PIPELINE_NAME=orders\nDC_PIPELINE_STAGE=raw\n");
    let request = fixture.request().with_stage("cleaned");
    let mut env = MemoryEnv::default();
    let mut out = Vec::new();

    let (result, _, config) =
        run_with_stub(&request, &mut env, StubValidator::loading(true), &mut out).await;

    assert!(result.is_ok());
    assert_eq!(config.unwrap().pipeline_stage, "cleaned");
}

#[tokio::test]
async fn test_client_construction_failure_exits_1() {
    let fixture = Fixture::new(ENV);
    let mut env = MemoryEnv::default();
    let mut out = Vec::new();

    let result = run_load(
        &fixture.request(),
        &mut env,
        |_: &DataCulpaConfig| -> Result<StubValidator, ValidatorError> {
            Err(ValidatorError::InvalidPort("seven".to_string()))
        },
        &mut out,
    )
    .await;

    let err = result.unwrap_err();
    assert!(matches!(err, LoadError::Client(ValidatorError::InvalidPort(_))));
    assert_eq!(err.exit_code(), 1);
}
