//! BigQuery REST client
//!
//! Talks to the BigQuery v2 REST API over HTTP. Works against the real
//! service (with an OAuth bearer token) and against `bigquery-emulator`
//! (no token, plain HTTP endpoint).
//!
//! Endpoints used:
//! - `datasets` get / insert
//! - `tables` insert, `tabledata.insertAll`
//! - `jobs` insert / get, `queries` getQueryResults (paged)

use super::{JobHandle, JobStatus, QueryEngine, ResultCursor, TableRef};
use crate::test_harness::config::EngineConfig;
use crate::test_harness::error::{TestHarnessError, TestHarnessResult};
use crate::test_harness::schema::InferredSchema;
use crate::test_harness::types::{FieldValue, TypedRow};
use crate::test_harness::utils::typed_row_to_json;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::future::Future;
use std::time::Duration;

// ==================== Wire types ====================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DatasetReference {
    project_id: String,
    dataset_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DatasetResource {
    dataset_reference: DatasetReference,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TableReference {
    project_id: String,
    dataset_id: String,
    table_id: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct TableFieldSchema {
    name: String,
    #[serde(rename = "type")]
    field_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    mode: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct TableSchema {
    #[serde(default)]
    fields: Vec<TableFieldSchema>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TableResource {
    table_reference: TableReference,
    schema: TableSchema,
}

#[derive(Debug, Serialize)]
struct InsertAllRow {
    json: serde_json::Value,
}

#[derive(Debug, Serialize)]
struct InsertAllRequest {
    rows: Vec<InsertAllRow>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InsertAllResponse {
    #[serde(default)]
    insert_errors: Vec<InsertErrors>,
}

#[derive(Debug, Deserialize)]
struct InsertErrors {
    #[serde(default)]
    index: u64,
    #[serde(default)]
    errors: Vec<ErrorProto>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ErrorProto {
    #[serde(default)]
    reason: Option<String>,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryConfig {
    query: String,
    use_legacy_sql: bool,
}

#[derive(Debug, Serialize)]
struct JobConfiguration {
    query: QueryConfig,
}

#[derive(Debug, Serialize)]
struct JobRequest {
    configuration: JobConfiguration,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobReference {
    job_id: String,
    #[serde(default)]
    location: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobStatusProto {
    #[serde(default)]
    state: String,
    #[serde(default)]
    error_result: Option<ErrorProto>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobResource {
    job_reference: JobReference,
    #[serde(default)]
    status: JobStatusProto,
}

#[derive(Debug, Deserialize)]
struct TableCell {
    #[serde(default)]
    v: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct TableRow {
    #[serde(default)]
    f: Vec<TableCell>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryResultsPage {
    #[serde(default)]
    schema: Option<TableSchema>,
    #[serde(default)]
    rows: Vec<TableRow>,
    #[serde(default)]
    page_token: Option<String>,
    #[serde(default = "default_true")]
    job_complete: bool,
}

fn default_true() -> bool {
    true
}

// ==================== Client ====================

/// BigQuery engine backed by the REST API
#[derive(Debug, Clone)]
pub struct BigQueryClient {
    client: Client,
    config: EngineConfig,
}

impl BigQueryClient {
    /// Create a client for the configured endpoint and project
    pub fn new(config: EngineConfig) -> TestHarnessResult<Self> {
        config.validate()?;
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| TestHarnessError::ConfigError {
                message: format!("Failed to build HTTP client: {}", e),
            })?;

        log::info!(
            "BigQuery client for project '{}' at {}",
            config.project,
            config.endpoint
        );
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn project_url(&self) -> String {
        format!(
            "{}/bigquery/v2/projects/{}",
            self.config.endpoint.trim_end_matches('/'),
            self.config.project
        )
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let builder = self.client.request(method, url);
        match self.config.access_token {
            Some(ref token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    fn with_location(builder: RequestBuilder, job: &JobHandle) -> RequestBuilder {
        match job.location {
            Some(ref location) => builder.query(&[("location", location.as_str())]),
            None => builder,
        }
    }

    async fn job_state(&self, job: &JobHandle) -> TestHarnessResult<JobStatusProto> {
        let url = format!("{}/jobs/{}", self.project_url(), job.job_id);
        let response = Self::with_location(self.request(Method::GET, &url), job)
            .send()
            .await?;
        let resource: JobResource = expect_success(response, "jobs.get").await?.json().await?;
        Ok(resource.status)
    }

    async fn fetch_page(
        &self,
        job: &JobHandle,
        page_token: Option<&str>,
    ) -> TestHarnessResult<QueryResultsPage> {
        let url = format!("{}/queries/{}", self.project_url(), job.job_id);
        let mut builder = Self::with_location(self.request(Method::GET, &url), job);
        if let Some(token) = page_token {
            builder = builder.query(&[("pageToken", token)]);
        }
        let response = builder.send().await?;
        Ok(expect_success(response, "jobs.getQueryResults")
            .await?
            .json()
            .await?)
    }
}

#[async_trait]
impl QueryEngine for BigQueryClient {
    fn name(&self) -> &str {
        "bigquery"
    }

    async fn dataset_exists(&self, dataset: &str) -> TestHarnessResult<bool> {
        let url = format!("{}/datasets/{}", self.project_url(), dataset);
        let response = self.request(Method::GET, &url).send().await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(false),
            s if s.is_success() => Ok(true),
            _ => Err(engine_error(response, "datasets.get").await),
        }
    }

    async fn create_dataset(&self, dataset: &str) -> TestHarnessResult<()> {
        let url = format!("{}/datasets", self.project_url());
        let body = DatasetResource {
            dataset_reference: DatasetReference {
                project_id: self.config.project.clone(),
                dataset_id: dataset.to_string(),
            },
        };
        let response = self.request(Method::POST, &url).json(&body).send().await?;
        if response.status() == StatusCode::CONFLICT {
            return Err(TestHarnessError::DatasetAlreadyExists {
                dataset: dataset.to_string(),
            });
        }
        expect_success(response, "datasets.insert").await?;
        Ok(())
    }

    async fn create_table(&self, table: &TableRef, schema: &InferredSchema) -> TestHarnessResult<()> {
        let url = format!("{}/datasets/{}/tables", self.project_url(), table.dataset);
        let body = TableResource {
            table_reference: TableReference {
                project_id: self.config.project.clone(),
                dataset_id: table.dataset.clone(),
                table_id: table.table.clone(),
            },
            schema: TableSchema {
                fields: schema
                    .fields
                    .iter()
                    .map(|f| TableFieldSchema {
                        name: f.name.clone(),
                        field_type: f.field_type.as_str().to_string(),
                        mode: None,
                    })
                    .collect(),
            },
        };

        log::debug!("Creating table {} with {} columns", table, schema.len());
        let response = self.request(Method::POST, &url).json(&body).send().await?;
        if response.status() == StatusCode::CONFLICT {
            return Err(TestHarnessError::TableAlreadyExists {
                table: table.to_string(),
            });
        }
        expect_success(response, "tables.insert").await?;
        Ok(())
    }

    async fn insert_rows(&self, table: &TableRef, rows: &[TypedRow]) -> TestHarnessResult<()> {
        let url = format!(
            "{}/datasets/{}/tables/{}/insertAll",
            self.project_url(),
            table.dataset,
            table.table
        );
        let body = InsertAllRequest {
            rows: rows
                .iter()
                .map(|row| InsertAllRow {
                    json: typed_row_to_json(row),
                })
                .collect(),
        };

        let insert_failed = |message: String| TestHarnessError::InsertFailed {
            table: table.to_string(),
            message,
        };

        let response = self
            .request(Method::POST, &url)
            .json(&body)
            .send()
            .await
            .map_err(|e| insert_failed(e.to_string()))?;
        if !response.status().is_success() {
            let status = response.status();
            return Err(insert_failed(format!(
                "{} ({})",
                read_error_message(response).await,
                status
            )));
        }

        let result: InsertAllResponse = response
            .json()
            .await
            .map_err(|e| insert_failed(e.to_string()))?;
        match rejected_rows_message(&result, rows.len()) {
            Some(message) => Err(insert_failed(message)),
            None => Ok(()),
        }
    }

    async fn submit_query(&self, query: &str) -> TestHarnessResult<JobHandle> {
        let url = format!("{}/jobs", self.project_url());
        let body = JobRequest {
            configuration: JobConfiguration {
                query: QueryConfig {
                    query: query.to_string(),
                    use_legacy_sql: false,
                },
            },
        };
        let response = self.request(Method::POST, &url).json(&body).send().await?;
        let resource: JobResource = expect_success(response, "jobs.insert").await?.json().await?;

        log::debug!("Submitted job {}", resource.job_reference.job_id);
        Ok(JobHandle {
            job_id: resource.job_reference.job_id,
            location: resource.job_reference.location,
        })
    }

    async fn await_job(&self, job: &JobHandle) -> TestHarnessResult<JobStatus> {
        poll_job(
            &job.job_id,
            self.config.poll_interval,
            self.config.query_timeout,
            || self.job_state(job),
        )
        .await
    }

    async fn read_results(&self, job: &JobHandle) -> TestHarnessResult<Box<dyn ResultCursor>> {
        let mut first = self.fetch_page(job, None).await?;
        while !first.job_complete {
            tokio::time::sleep(self.config.poll_interval).await;
            first = self.fetch_page(job, None).await?;
        }

        let fields = first.schema.take().unwrap_or_default().fields;
        let mut cursor = BigQueryCursor {
            client: self.clone(),
            job: job.clone(),
            fields,
            buffer: VecDeque::new(),
            page_token: None,
            exhausted: false,
        };
        cursor.absorb(first);
        Ok(Box::new(cursor))
    }
}

/// Paged cursor over `getQueryResults`
struct BigQueryCursor {
    client: BigQueryClient,
    job: JobHandle,
    fields: Vec<TableFieldSchema>,
    buffer: VecDeque<Vec<FieldValue>>,
    page_token: Option<String>,
    exhausted: bool,
}

impl BigQueryCursor {
    fn absorb(&mut self, page: QueryResultsPage) {
        for row in page.rows {
            let values = row
                .f
                .into_iter()
                .enumerate()
                .map(|(i, cell)| {
                    let field_type = self.fields.get(i).map(|f| f.field_type.as_str());
                    decode_cell(cell.v, field_type.unwrap_or("STRING"))
                })
                .collect();
            self.buffer.push_back(values);
        }
        self.page_token = page.page_token.filter(|t| !t.is_empty());
        self.exhausted = self.page_token.is_none();
    }
}

#[async_trait]
impl ResultCursor for BigQueryCursor {
    async fn next_row(&mut self) -> TestHarnessResult<Option<Vec<FieldValue>>> {
        while self.buffer.is_empty() && !self.exhausted {
            let page = self
                .client
                .fetch_page(&self.job, self.page_token.as_deref())
                .await?;
            self.absorb(page);
        }
        Ok(self.buffer.pop_front())
    }
}

// ==================== Job polling ====================

/// Terminal status of a job, or `None` while it is still pending or running
fn terminal_status(status: JobStatusProto) -> Option<JobStatus> {
    if status.state != "DONE" {
        return None;
    }
    Some(match status.error_result {
        Some(error) => JobStatus::Failed(error.message),
        None => JobStatus::Succeeded,
    })
}

/// Fetch the job state every `poll_interval` until it is DONE.
///
/// With `timeout` set, giving up yields `Timeout`; without it the wait is
/// unbounded.
async fn poll_job<F, Fut>(
    job_id: &str,
    poll_interval: Duration,
    timeout: Option<Duration>,
    mut fetch_state: F,
) -> TestHarnessResult<JobStatus>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = TestHarnessResult<JobStatusProto>>,
{
    let poll = async {
        loop {
            let status = fetch_state().await?;
            let state = status.state.clone();
            if let Some(terminal) = terminal_status(status) {
                return TestHarnessResult::Ok(terminal);
            }
            log::debug!("Job {} is {}, polling again", job_id, state);
            tokio::time::sleep(poll_interval).await;
        }
    };

    match timeout {
        Some(limit) => tokio::time::timeout(limit, poll)
            .await
            .map_err(|_| TestHarnessError::Timeout {
                operation: format!("await job {}", job_id),
                timeout_ms: limit.as_millis() as u64,
            })?,
        None => poll.await,
    }
}

// ==================== Decoding & errors ====================

/// Describe the rows an insertAll response rejected, if any
fn rejected_rows_message(response: &InsertAllResponse, row_count: usize) -> Option<String> {
    let first = response.insert_errors.first()?;
    let detail = first
        .errors
        .iter()
        .map(|e| match e.reason {
            Some(ref reason) => format!("{}: {}", reason, e.message),
            None => e.message.clone(),
        })
        .collect::<Vec<_>>()
        .join("; ");
    Some(format!(
        "{} of {} rows rejected, first at index {}: {}",
        response.insert_errors.len(),
        row_count,
        first.index,
        detail
    ))
}

/// Decode a result cell using its column type.
///
/// Values that do not parse as their declared type keep the engine's text.
fn decode_cell(value: serde_json::Value, field_type: &str) -> FieldValue {
    let text = match value {
        serde_json::Value::Null => return FieldValue::Null,
        serde_json::Value::String(s) => s,
        serde_json::Value::Bool(b) => return FieldValue::Boolean(b),
        other => return FieldValue::String(other.to_string()),
    };

    let decoded = match field_type.to_uppercase().as_str() {
        "INTEGER" | "INT64" => text.parse::<i64>().ok().map(FieldValue::Integer),
        "FLOAT" | "FLOAT64" => text.parse::<f64>().ok().map(FieldValue::Float),
        "BOOLEAN" | "BOOL" => match text.as_str() {
            "true" => Some(FieldValue::Boolean(true)),
            "false" => Some(FieldValue::Boolean(false)),
            _ => None,
        },
        "TIMESTAMP" => decode_timestamp(&text).map(FieldValue::Timestamp),
        "DATE" => NaiveDate::parse_from_str(&text, "%Y-%m-%d")
            .ok()
            .map(FieldValue::Date),
        _ => None,
    };
    decoded.unwrap_or(FieldValue::String(text))
}

/// TIMESTAMP cells arrive as floating-point epoch seconds ("1.7040672E9")
fn decode_timestamp(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(seconds) = text.parse::<f64>() {
        let micros = (seconds * 1_000_000.0).round() as i64;
        let secs = micros.div_euclid(1_000_000);
        let nanos = (micros.rem_euclid(1_000_000) * 1_000) as u32;
        return DateTime::from_timestamp(secs, nanos);
    }
    DateTime::parse_from_rfc3339(text)
        .ok()
        .map(|ts| ts.with_timezone(&Utc))
}

async fn read_error_message(response: Response) -> String {
    let body = response.text().await.unwrap_or_default();
    match serde_json::from_str::<ErrorEnvelope>(&body) {
        Ok(envelope) if !envelope.error.message.is_empty() => envelope.error.message,
        _ => body,
    }
}

async fn engine_error(response: Response, operation: &str) -> TestHarnessError {
    TestHarnessError::EngineError {
        operation: operation.to_string(),
        message: read_error_message(response).await,
    }
}

async fn expect_success(response: Response, operation: &str) -> TestHarnessResult<Response> {
    if response.status().is_success() {
        Ok(response)
    } else {
        Err(engine_error(response, operation).await)
    }
}
