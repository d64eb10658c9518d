//! # bqtest
//!
//! A test harness for BigQuery SQL. Each test case loads a CSV fixture into a
//! scratch table, runs a query against it and compares the rows it returns
//! with an expected CSV file.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use bqtest::engine::BigQueryClient;
//! use bqtest::test_harness::{EngineConfig, TestRunner, TestSuite};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let suite = TestSuite::from_file("tests.yaml")?;
//!     suite.validate()?;
//!
//!     let client = BigQueryClient::new(EngineConfig::from_env()?)?;
//!     let runner = TestRunner::new(client, &suite.dataset);
//!     let report = runner.run_suite(&suite, None).await;
//!     runner.close().await?;
//!
//!     println!("all passed: {}", report?.all_passed());
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`engine`]: the [`engine::QueryEngine`] capability and its implementations
//! - [`test_harness`]: suite definition, fixture loading, execution, comparison, reporting

pub mod engine;
pub mod test_harness;

pub use engine::{BigQueryClient, InMemoryEngine, QueryEngine};
pub use test_harness::{TestHarnessError, TestHarnessResult, TestRunner, TestSuite};
