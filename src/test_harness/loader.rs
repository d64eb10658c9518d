//! Fixture loading
//!
//! Makes a CSV fixture queryable under a scratch table:
//! 1. Ensure the dataset exists (idempotent create)
//! 2. Create the table with the inferred schema (fails if it exists)
//! 3. Coerce every data row into an in-memory batch
//! 4. Insert the batch in one call
//!
//! Nothing is inserted unless every row coerces. Tables are never dropped.

use super::coercion::coerce_rows;
use super::error::TestHarnessResult;
use super::file_io::read_csv_file;
use super::schema::{infer_schema, InferredSchema};
use super::spec::TestCase;
use super::types::TextRow;
use crate::engine::{ensure_dataset, QueryEngine, TableRef};
use std::collections::HashMap;

/// What a successful load produced
#[derive(Debug, Clone)]
pub struct LoadSummary {
    pub table: TableRef,
    pub schema: InferredSchema,
    pub rows_inserted: usize,
}

/// Loads fixtures into one dataset of an engine
pub struct FixtureLoader<'a, E: QueryEngine + ?Sized> {
    engine: &'a E,
    dataset: String,
}

impl<'a, E: QueryEngine + ?Sized> FixtureLoader<'a, E> {
    pub fn new(engine: &'a E, dataset: &str) -> Self {
        Self {
            engine,
            dataset: dataset.to_string(),
        }
    }

    /// Reference of the scratch table for a table name
    pub fn table_ref(&self, table_name: &str) -> TableRef {
        TableRef::new(self.dataset.clone(), table_name)
    }

    /// Load a test case's input fixture into its target table
    pub async fn load(&self, test: &TestCase) -> TestHarnessResult<LoadSummary> {
        let records = read_csv_file(&test.input_file)?;
        self.load_records(
            &records,
            &test.table_name,
            &test.schema_overrides,
            &test.input_file.display().to_string(),
        )
        .await
    }

    /// Load already-read fixture rows (header first) into `table_name`
    pub async fn load_records(
        &self,
        records: &[TextRow],
        table_name: &str,
        overrides: &HashMap<String, String>,
        source: &str,
    ) -> TestHarnessResult<LoadSummary> {
        let schema = infer_schema(records, overrides, source)?;
        let table = self.table_ref(table_name);

        ensure_dataset(self.engine, &self.dataset).await?;

        self.engine.create_table(&table, &schema).await?;
        log::info!("Created table {} ({} columns)", table, schema.len());

        let batch = coerce_rows(&records[1..], &schema)?;

        self.engine.insert_rows(&table, &batch).await?;
        log::info!("Inserted {} rows into {}", batch.len(), table);

        Ok(LoadSummary {
            table,
            schema,
            rows_inserted: batch.len(),
        })
    }
}
