//! Query engine capability
//!
//! The harness never talks to a concrete client type. Everything it needs from
//! the warehouse is expressed by [`QueryEngine`]:
//!
//! - dataset and table management (`dataset_exists`, `create_dataset`, `create_table`)
//! - bulk insertion (`insert_rows`)
//! - query jobs (`submit_query`, `await_job`, `read_results`)
//!
//! Two implementations are provided: [`bigquery::BigQueryClient`] speaks the
//! BigQuery REST API (real service or emulator) and [`memory::InMemoryEngine`]
//! keeps everything in process.

pub mod bigquery;
pub mod memory;

use crate::test_harness::error::TestHarnessResult;
use crate::test_harness::schema::InferredSchema;
use crate::test_harness::types::{FieldValue, TypedRow};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

pub use bigquery::BigQueryClient;
pub use memory::InMemoryEngine;

/// Fully qualified table name within the engine's project
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableRef {
    pub dataset: String,
    pub table: String,
}

impl TableRef {
    pub fn new(dataset: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            dataset: dataset.into(),
            table: table.into(),
        }
    }

    /// Backquoted reference as it appears in query text
    pub fn quoted(&self) -> String {
        format!("`{}`", self)
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.dataset, self.table)
    }
}

/// Handle to a submitted query job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobHandle {
    pub job_id: String,
    pub location: Option<String>,
}

/// Terminal state of a query job
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    Succeeded,
    /// Failed, with the engine's error text
    Failed(String),
}

impl JobStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, JobStatus::Succeeded)
    }
}

/// Outcome of an idempotent dataset creation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatasetCreation {
    Created,
    AlreadyExisted,
}

/// Cursor over a finished job's result rows
#[async_trait]
pub trait ResultCursor: Send {
    /// Next row, or `None` once exhausted
    async fn next_row(&mut self) -> TestHarnessResult<Option<Vec<FieldValue>>>;
}

/// Warehouse operations the harness depends on
#[async_trait]
pub trait QueryEngine: Send + Sync {
    /// Short engine name for logs
    fn name(&self) -> &str;

    async fn dataset_exists(&self, dataset: &str) -> TestHarnessResult<bool>;

    /// Create a dataset.
    ///
    /// Fails with `DatasetAlreadyExists` if it is already there; callers
    /// wanting idempotent creation use [`ensure_dataset`].
    async fn create_dataset(&self, dataset: &str) -> TestHarnessResult<()>;

    /// Create a table. Fails with `TableAlreadyExists` if it exists.
    async fn create_table(&self, table: &TableRef, schema: &InferredSchema) -> TestHarnessResult<()>;

    /// Insert all rows in one batch
    async fn insert_rows(&self, table: &TableRef, rows: &[TypedRow]) -> TestHarnessResult<()>;

    /// Submit a query as an asynchronous job
    async fn submit_query(&self, query: &str) -> TestHarnessResult<JobHandle>;

    /// Block until the job reaches a terminal state
    async fn await_job(&self, job: &JobHandle) -> TestHarnessResult<JobStatus>;

    /// Open a cursor over a succeeded job's rows
    async fn read_results(&self, job: &JobHandle) -> TestHarnessResult<Box<dyn ResultCursor>>;

    /// Release the connection. Called once, after the last test case.
    async fn close(&self) -> TestHarnessResult<()> {
        Ok(())
    }
}

/// Shared engines, so a caller can keep a handle after giving one to the runner
#[async_trait]
impl<E: QueryEngine + ?Sized> QueryEngine for Arc<E> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn dataset_exists(&self, dataset: &str) -> TestHarnessResult<bool> {
        (**self).dataset_exists(dataset).await
    }

    async fn create_dataset(&self, dataset: &str) -> TestHarnessResult<()> {
        (**self).create_dataset(dataset).await
    }

    async fn create_table(&self, table: &TableRef, schema: &InferredSchema) -> TestHarnessResult<()> {
        (**self).create_table(table, schema).await
    }

    async fn insert_rows(&self, table: &TableRef, rows: &[TypedRow]) -> TestHarnessResult<()> {
        (**self).insert_rows(table, rows).await
    }

    async fn submit_query(&self, query: &str) -> TestHarnessResult<JobHandle> {
        (**self).submit_query(query).await
    }

    async fn await_job(&self, job: &JobHandle) -> TestHarnessResult<JobStatus> {
        (**self).await_job(job).await
    }

    async fn read_results(&self, job: &JobHandle) -> TestHarnessResult<Box<dyn ResultCursor>> {
        (**self).read_results(job).await
    }

    async fn close(&self) -> TestHarnessResult<()> {
        (**self).close().await
    }
}

/// Create a dataset, treating "already exists" as success.
pub async fn ensure_dataset<E: QueryEngine + ?Sized>(
    engine: &E,
    dataset: &str,
) -> TestHarnessResult<DatasetCreation> {
    use crate::test_harness::error::TestHarnessError;

    match engine.create_dataset(dataset).await {
        Ok(()) => {
            log::info!("Created dataset '{}'", dataset);
            Ok(DatasetCreation::Created)
        }
        Err(TestHarnessError::DatasetAlreadyExists { .. }) => {
            log::debug!("Dataset '{}' already exists", dataset);
            Ok(DatasetCreation::AlreadyExisted)
        }
        Err(e) => Err(e),
    }
}
