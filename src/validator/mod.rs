//! Validator clients for the Data Culpa validation service.
//!
//! The load workflow only talks to the [`Validator`] trait. The
//! [`DataCulpaClient`] implementation speaks HTTP to a Data Culpa server.

mod client;
mod records;

pub use client::{DataCulpaClient, DEFAULT_PORT, DEFAULT_PROTOCOL, RECORD_BATCH_SIZE};
pub use records::{read_csv_records, CsvRecordsError};

use async_trait::async_trait;
use std::path::Path;

/// Capability interface of a validator handle bound to one pipeline.
///
/// Failures inside the client are recorded and surfaced through
/// [`Validator::has_errors`] and [`Validator::errors`] rather than returned.
#[async_trait]
pub trait Validator: Send {
    /// Attaches a JSON metadata document to the pending submission.
    fn queue_metadata(&mut self, metadata: serde_json::Value);

    /// Submits the contents of a CSV file. Returns `false` if the load failed.
    async fn load_csv_file(&mut self, path: &Path) -> bool;

    /// Finalizes the queued submission for validation.
    async fn queue_commit(&mut self);

    /// Whether any errors have been recorded.
    fn has_errors(&self) -> bool {
        !self.errors().is_empty()
    }

    /// All errors recorded so far, oldest first.
    fn errors(&self) -> &[String];
}

#[async_trait]
impl<V: Validator + ?Sized> Validator for &mut V {
    fn queue_metadata(&mut self, metadata: serde_json::Value) {
        (**self).queue_metadata(metadata);
    }

    async fn load_csv_file(&mut self, path: &Path) -> bool {
        (**self).load_csv_file(path).await
    }

    async fn queue_commit(&mut self) {
        (**self).queue_commit().await;
    }

    fn has_errors(&self) -> bool {
        (**self).has_errors()
    }

    fn errors(&self) -> &[String] {
        (**self).errors()
    }
}
