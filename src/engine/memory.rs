//! In-process query engine
//!
//! Keeps datasets, tables and inserted rows in memory. Query results are
//! scripted: a response registered with [`InMemoryEngine::respond_to`] is
//! returned for any query containing its pattern. Unscripted queries of the
//! form `SELECT * FROM <table>` scan the stored rows; anything else fails the
//! job.

use super::{JobHandle, JobStatus, QueryEngine, ResultCursor, TableRef};
use crate::test_harness::error::{TestHarnessError, TestHarnessResult};
use crate::test_harness::schema::InferredSchema;
use crate::test_harness::types::{FieldValue, TypedRow};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::sync::RwLock;

/// Scripted reply to a query
#[derive(Debug, Clone)]
pub enum QueryResponse {
    /// Job succeeds with these rows
    Rows(Vec<Vec<FieldValue>>),
    /// Job is accepted and ends failed with this message
    JobFailure(String),
    /// Submission itself is rejected with this message
    Rejected(String),
}

#[derive(Debug, Clone)]
struct MemoryTable {
    schema: InferredSchema,
    rows: Vec<TypedRow>,
}

#[derive(Debug, Default)]
struct EngineState {
    datasets: HashSet<String>,
    tables: HashMap<TableRef, MemoryTable>,
    responses: Vec<(String, QueryResponse)>,
    jobs: HashMap<String, (JobStatus, Vec<Vec<FieldValue>>)>,
    submitted: Vec<String>,
    insert_failure: Option<String>,
}

/// Engine that lives entirely in memory
#[derive(Debug, Default)]
pub struct InMemoryEngine {
    state: RwLock<EngineState>,
    next_job: AtomicU64,
    closed: AtomicBool,
}

impl InMemoryEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reply with `response` to any query containing `pattern`.
    /// Earlier registrations win.
    pub async fn respond_to(&self, pattern: &str, response: QueryResponse) {
        self.state
            .write()
            .await
            .responses
            .push((pattern.to_string(), response));
    }

    /// Make every subsequent insert fail with `message`
    pub async fn fail_inserts(&self, message: &str) {
        self.state.write().await.insert_failure = Some(message.to_string());
    }

    /// Rows inserted into a table so far (empty if the table does not exist)
    pub async fn rows(&self, table: &TableRef) -> Vec<TypedRow> {
        self.state
            .read()
            .await
            .tables
            .get(table)
            .map(|t| t.rows.clone())
            .unwrap_or_default()
    }

    /// Schema a table was created with
    pub async fn table_schema(&self, table: &TableRef) -> Option<InferredSchema> {
        self.state
            .read()
            .await
            .tables
            .get(table)
            .map(|t| t.schema.clone())
    }

    pub async fn table_exists(&self, table: &TableRef) -> bool {
        self.state.read().await.tables.contains_key(table)
    }

    /// Query texts in submission order
    pub async fn submitted_queries(&self) -> Vec<String> {
        self.state.read().await.submitted.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn scan(state: &EngineState, query: &str) -> Option<Vec<Vec<FieldValue>>> {
        let body = query.trim().trim_end_matches(';').trim();
        let upper = body.to_ascii_uppercase();
        let target = upper.strip_prefix("SELECT * FROM ")?;
        let start = body.len() - target.len();
        let name = body[start..].trim().trim_matches('`');
        let (dataset, table) = name.split_once('.')?;
        let stored = state.tables.get(&TableRef::new(dataset, table))?;

        Some(
            stored
                .rows
                .iter()
                .map(|row| {
                    stored
                        .schema
                        .fields
                        .iter()
                        .map(|f| row.get(&f.name).cloned().unwrap_or(FieldValue::Null))
                        .collect()
                })
                .collect(),
        )
    }
}

#[async_trait]
impl QueryEngine for InMemoryEngine {
    fn name(&self) -> &str {
        "in-memory"
    }

    async fn dataset_exists(&self, dataset: &str) -> TestHarnessResult<bool> {
        Ok(self.state.read().await.datasets.contains(dataset))
    }

    async fn create_dataset(&self, dataset: &str) -> TestHarnessResult<()> {
        if !self.state.write().await.datasets.insert(dataset.to_string()) {
            return Err(TestHarnessError::DatasetAlreadyExists {
                dataset: dataset.to_string(),
            });
        }
        Ok(())
    }

    async fn create_table(&self, table: &TableRef, schema: &InferredSchema) -> TestHarnessResult<()> {
        let mut state = self.state.write().await;
        if !state.datasets.contains(&table.dataset) {
            return Err(TestHarnessError::EngineError {
                operation: "create_table".to_string(),
                message: format!("Not found: Dataset {}", table.dataset),
            });
        }
        if state.tables.contains_key(table) {
            return Err(TestHarnessError::TableAlreadyExists {
                table: table.to_string(),
            });
        }
        state.tables.insert(
            table.clone(),
            MemoryTable {
                schema: schema.clone(),
                rows: Vec::new(),
            },
        );
        Ok(())
    }

    async fn insert_rows(&self, table: &TableRef, rows: &[TypedRow]) -> TestHarnessResult<()> {
        let mut state = self.state.write().await;
        if let Some(message) = state.insert_failure.clone() {
            return Err(TestHarnessError::InsertFailed {
                table: table.to_string(),
                message,
            });
        }
        let stored = state
            .tables
            .get_mut(table)
            .ok_or_else(|| TestHarnessError::InsertFailed {
                table: table.to_string(),
                message: format!("Not found: Table {}", table),
            })?;
        stored.rows.extend(rows.iter().cloned());
        Ok(())
    }

    async fn submit_query(&self, query: &str) -> TestHarnessResult<JobHandle> {
        let mut state = self.state.write().await;
        state.submitted.push(query.to_string());

        let scripted = state
            .responses
            .iter()
            .find(|(pattern, _)| query.contains(pattern.as_str()))
            .map(|(_, response)| response.clone());

        let outcome = match scripted {
            Some(QueryResponse::Rejected(message)) => {
                return Err(TestHarnessError::EngineError {
                    operation: "submit_query".to_string(),
                    message,
                })
            }
            Some(QueryResponse::JobFailure(message)) => (JobStatus::Failed(message), Vec::new()),
            Some(QueryResponse::Rows(rows)) => (JobStatus::Succeeded, rows),
            None => match Self::scan(&state, query) {
                Some(rows) => (JobStatus::Succeeded, rows),
                None => (
                    JobStatus::Failed(format!("in-memory engine cannot execute: {}", query)),
                    Vec::new(),
                ),
            },
        };

        let job_id = format!("job_{}", self.next_job.fetch_add(1, Ordering::SeqCst) + 1);
        state.jobs.insert(job_id.clone(), outcome);
        Ok(JobHandle {
            job_id,
            location: None,
        })
    }

    async fn await_job(&self, job: &JobHandle) -> TestHarnessResult<JobStatus> {
        self.state
            .read()
            .await
            .jobs
            .get(&job.job_id)
            .map(|(status, _)| status.clone())
            .ok_or_else(|| TestHarnessError::EngineError {
                operation: "await_job".to_string(),
                message: format!("Unknown job {}", job.job_id),
            })
    }

    async fn read_results(&self, job: &JobHandle) -> TestHarnessResult<Box<dyn ResultCursor>> {
        let rows = self
            .state
            .read()
            .await
            .jobs
            .get(&job.job_id)
            .map(|(_, rows)| rows.clone())
            .ok_or_else(|| TestHarnessError::EngineError {
                operation: "read_results".to_string(),
                message: format!("Unknown job {}", job.job_id),
            })?;
        Ok(Box::new(MemoryCursor {
            rows: rows.into_iter(),
        }))
    }

    async fn close(&self) -> TestHarnessResult<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

struct MemoryCursor {
    rows: std::vec::IntoIter<Vec<FieldValue>>,
}

#[async_trait]
impl ResultCursor for MemoryCursor {
    async fn next_row(&mut self) -> TestHarnessResult<Option<Vec<FieldValue>>> {
        Ok(self.rows.next())
    }
}
