//! HTTP client for the Data Culpa validation service.
//!
//! A submission is a server-side queue: it is opened on the first load,
//! filled with record batches, and committed together with any metadata.
//!
//! - `POST /queue/open` with the pipeline identity, returns `{"queue_id"}`
//! - `POST /queue/<id>/records` with `{"records": [...]}`
//! - `POST /queue/<id>/commit` with `{"metadata"}`, returns `{"errors": [...]}`

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::net::Ipv6Addr;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::records::read_csv_records;
use super::Validator;
use crate::config::DataCulpaConfig;
use crate::error::ValidatorError;

/// Protocol used when `DC_PROTOCOL` is unset.
pub const DEFAULT_PROTOCOL: &str = "http";

/// Port used when `DC_PORT` is unset.
pub const DEFAULT_PORT: u16 = 7777;

/// Maximum number of records sent per request.
pub const RECORD_BATCH_SIZE: usize = 1000;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Pipeline identity sent when opening a queue.
#[derive(Debug, Clone, Serialize)]
struct PipelineIdentity {
    pipeline_name: String,
    pipeline_environment: String,
    pipeline_stage: String,
    pipeline_version: String,
}

#[derive(Debug, Deserialize)]
struct OpenQueueResponse {
    queue_id: String,
}

#[derive(Debug, Serialize)]
struct RecordsRequest<'a> {
    records: &'a [Value],
}

#[derive(Debug, Serialize)]
struct CommitRequest<'a> {
    metadata: Option<&'a Value>,
}

#[derive(Debug, Deserialize)]
struct CommitResponse {
    #[serde(default)]
    errors: Vec<String>,
}

/// Failure of a single request to the validation service.
#[derive(Debug, Error)]
enum RequestError {
    #[error("request to {url} failed: {source}")]
    Send {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("HTTP {code} from {url}: {body}")]
    Status { url: String, code: u16, body: String },

    #[error("invalid response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

/// Validator handle that submits data to a Data Culpa server over HTTP.
pub struct DataCulpaClient {
    /// `<protocol>://<host>:<port>` without a trailing slash.
    base_url: String,
    pipeline: PipelineIdentity,
    http_client: Client,
    /// Server-side queue, opened by the first load.
    queue_id: Option<String>,
    metadata: Option<Value>,
    errors: Vec<String>,
    records_sent: usize,
}

impl DataCulpaClient {
    /// Create a client for the pipeline described by `config`.
    ///
    /// # Errors
    ///
    /// Returns `ValidatorError` if the pipeline name or host is missing, the
    /// port is not a number, or the protocol is neither `http` nor `https`.
    pub fn new(config: &DataCulpaConfig) -> Result<Self, ValidatorError> {
        let pipeline_name = non_empty(config.pipeline_name.as_deref())
            .ok_or(ValidatorError::MissingPipelineName)?;
        let host = non_empty(config.host.as_deref())
            .map(url_host)
            .ok_or(ValidatorError::MissingHost)?;

        let protocol = match non_empty(config.protocol.as_deref()) {
            None => DEFAULT_PROTOCOL.to_string(),
            Some(p) if p.eq_ignore_ascii_case("http") || p.eq_ignore_ascii_case("https") => {
                p.to_ascii_lowercase()
            }
            Some(p) => return Err(ValidatorError::UnsupportedProtocol(p.to_string())),
        };

        let port = match non_empty(config.port.as_deref()) {
            None => DEFAULT_PORT,
            Some(p) => p
                .trim()
                .parse::<u16>()
                .map_err(|_| ValidatorError::InvalidPort(p.to_string()))?,
        };

        let http_client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;

        Ok(Self {
            base_url: format!("{protocol}://{host}:{port}"),
            pipeline: PipelineIdentity {
                pipeline_name: pipeline_name.to_string(),
                pipeline_environment: config.pipeline_env.clone(),
                pipeline_stage: config.pipeline_stage.clone(),
                pipeline_version: config.pipeline_version.clone(),
            },
            http_client,
            queue_id: None,
            metadata: None,
            errors: Vec::new(),
            records_sent: 0,
        })
    }

    /// Get the base URL of the validation service.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Get the id of the open queue, if one has been opened.
    pub fn queue_id(&self) -> Option<&str> {
        self.queue_id.as_deref()
    }

    /// Number of records accepted by the server so far.
    pub fn records_sent(&self) -> usize {
        self.records_sent
    }

    /// POST `body` as JSON and return the response if its status is 2xx.
    async fn send<B>(&self, url: &str, body: &B) -> Result<Response, RequestError>
    where
        B: Serialize + ?Sized,
    {
        let response = self
            .http_client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|source| RequestError::Send {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RequestError::Status {
                url: url.to_string(),
                code: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    async fn post<B, R>(&self, path: &str, body: &B) -> Result<R, RequestError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        self.send(&url, body)
            .await?
            .json::<R>()
            .await
            .map_err(|source| RequestError::Decode { url, source })
    }

    /// Like `post`, for endpoints whose response body is ignored.
    async fn post_unit<B>(&self, path: &str, body: &B) -> Result<(), RequestError>
    where
        B: Serialize + ?Sized,
    {
        let url = format!("{}{}", self.base_url, path);
        self.send(&url, body).await.map(drop)
    }

    async fn ensure_queue(&mut self) -> Result<String, RequestError> {
        if let Some(id) = &self.queue_id {
            return Ok(id.clone());
        }

        let opened: OpenQueueResponse = self.post("/queue/open", &self.pipeline).await?;
        info!(
            queue_id = %opened.queue_id,
            pipeline = %self.pipeline.pipeline_name,
            stage = %self.pipeline.pipeline_stage,
            "Opened Data Culpa queue"
        );
        self.queue_id = Some(opened.queue_id.clone());
        Ok(opened.queue_id)
    }

    async fn send_records(&mut self, records: &[Value]) -> Result<(), RequestError> {
        let queue_id = self.ensure_queue().await?;
        let path = format!("/queue/{queue_id}/records");

        for (batch, chunk) in records.chunks(RECORD_BATCH_SIZE).enumerate() {
            self.post_unit(&path, &RecordsRequest { records: chunk }).await?;
            self.records_sent += chunk.len();
            debug!(batch, rows = chunk.len(), "Sent record batch");
        }
        Ok(())
    }

    fn record_error(&mut self, message: String) {
        warn!(error = %message, "Data Culpa client error");
        self.errors.push(message);
    }
}

#[async_trait]
impl Validator for DataCulpaClient {
    fn queue_metadata(&mut self, metadata: Value) {
        self.metadata = Some(metadata);
    }

    async fn load_csv_file(&mut self, path: &Path) -> bool {
        let records = match read_csv_records(path) {
            Ok(records) => records,
            Err(e) => {
                self.record_error(format!("{}: {e}", path.display()));
                return false;
            }
        };

        info!(path = %path.display(), rows = records.len(), "Loading CSV file");
        match self.send_records(&records).await {
            Ok(()) => true,
            Err(e) => {
                self.record_error(e.to_string());
                false
            }
        }
    }

    async fn queue_commit(&mut self) {
        let Some(queue_id) = self.queue_id.clone() else {
            self.record_error("nothing to commit: no data has been loaded".to_string());
            return;
        };

        let request = CommitRequest {
            metadata: self.metadata.as_ref(),
        };
        let path = format!("/queue/{queue_id}/commit");
        let result: Result<CommitResponse, RequestError> = self.post(&path, &request).await;

        match result {
            Ok(response) => {
                info!(
                    queue_id = %queue_id,
                    records = self.records_sent,
                    errors = response.errors.len(),
                    "Committed Data Culpa queue"
                );
                for error in response.errors {
                    self.record_error(error);
                }
            }
            Err(e) => self.record_error(e.to_string()),
        }
    }

    fn errors(&self) -> &[String] {
        &self.errors
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// Host as it appears in a URL authority: trimmed, IPv6 literals bracketed.
fn url_host(host: &str) -> String {
    let host = host.trim();
    if host.parse::<Ipv6Addr>().is_ok() {
        format!("[{host}]")
    } else {
        host.to_string()
    }
}
