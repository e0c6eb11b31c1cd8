//! Writes record batches into the destination table.

use anyhow::{Context, Result};
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use tracing::{debug, info};

use super::insert::rows_per_statement;
use super::pool::Pool;
use super::schema::{Schema, drop_table_sql, generate_ddl};
use crate::config::MAX_BIND_PARAMETERS;
use crate::error::IngestError;
use crate::formats::parquet::record_batch_to_records;

/// Destination for record batches
#[async_trait]
pub trait BatchSink: Send {
    /// (Re)create the destination from the schema of `batch`, with zero rows
    ///
    /// Rows of `batch` are not written; pass it to [`BatchSink::append`] as well.
    async fn initialize(&mut self, batch: &RecordBatch) -> Result<()>;

    /// Append the rows of `batch` in order, returning the number written
    async fn append(&mut self, batch: &RecordBatch) -> Result<u64>;
}

/// Loads batches into one PostgreSQL table
pub struct TableLoader {
    pool: Pool,
    table_name: String,
    schema: Option<Schema>,
    batches_appended: usize,
}

impl TableLoader {
    pub fn new(pool: Pool, table_name: impl Into<String>) -> Self {
        Self {
            pool,
            table_name: table_name.into(),
            schema: None,
            batches_appended: 0,
        }
    }
}

#[async_trait]
impl BatchSink for TableLoader {
    async fn initialize(&mut self, batch: &RecordBatch) -> Result<()> {
        let schema = Schema::from_arrow(batch.schema().as_ref())?;
        anyhow::ensure!(
            !schema.columns.is_empty(),
            "Cannot create table '{}' without columns",
            self.table_name
        );

        let ddl = generate_ddl(&self.table_name, &schema);
        debug!(ddl = %ddl, "creating table");

        self.pool
            .execute_in_transaction(&[drop_table_sql(&self.table_name), ddl])
            .await
            .with_context(|| format!("Failed to create table '{}'", self.table_name))?;

        info!(
            table = %self.table_name,
            columns = schema.columns.len(),
            "table created"
        );

        self.schema = Some(schema);
        self.batches_appended = 0;
        Ok(())
    }

    async fn append(&mut self, batch: &RecordBatch) -> Result<u64> {
        let Some(schema) = self.schema.as_ref() else {
            return Err(IngestError::NotInitialized {
                table: self.table_name.clone(),
            }
            .into());
        };

        let batch_schema = Schema::from_arrow(batch.schema().as_ref())?;
        if let Some(detail) = schema.mismatch(&batch_schema) {
            return Err(IngestError::SchemaMismatch {
                table: self.table_name.clone(),
                batch_index: self.batches_appended,
                detail,
            }
            .into());
        }

        let records = record_batch_to_records(batch)?;
        let rows_per_statement = rows_per_statement(schema.columns.len(), MAX_BIND_PARAMETERS);

        self.pool
            .insert_records(&self.table_name, schema, &records, rows_per_statement)
            .await
            .with_context(|| {
                format!(
                    "Failed to append batch {} to '{}'",
                    self.batches_appended, self.table_name
                )
            })?;

        self.batches_appended += 1;
        debug!(
            table = %self.table_name,
            rows = records.len(),
            batch = self.batches_appended,
            "batch appended"
        );

        Ok(records.len() as u64)
    }
}
