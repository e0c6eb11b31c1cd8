//! Parquet batch reader implementation.

use anyhow::{Context, Result};
use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use futures::StreamExt;
use futures::stream::BoxStream;
use parquet::arrow::async_reader::ParquetRecordBatchStreamBuilder;
use std::path::Path;
use tokio::fs::File;
use tracing::debug;

use crate::error::IngestError;
use crate::formats::reader::BatchSource;
use crate::io::StagingFile;

/// Information about a row group cached from Parquet metadata
#[derive(Debug, Clone)]
struct RowGroupInfo {
    num_rows: u64,
}

/// Lazily reads a local Parquet file as a sequence of record batches
///
/// Batches never span row groups, so a batch can be shorter than
/// `batch_size` at every row group boundary, not only at the end of the file.
pub struct ParquetBatchReader {
    staging: StagingFile,
    schema: SchemaRef,
    row_groups: Vec<RowGroupInfo>,
    batch_size: usize,
    stream: BoxStream<'static, parquet::errors::Result<RecordBatch>>,
    rows_read: u64,
    exhausted: bool,
}

impl ParquetBatchReader {
    /// Validate the staging file, read its footer and prepare the batch stream
    pub async fn open(staging: StagingFile, batch_size: usize) -> Result<Self> {
        anyhow::ensure!(batch_size > 0, "Batch size must be greater than zero");

        staging.validate().await?;

        let file = File::open(staging.path())
            .await
            .with_context(|| format!("Failed to open {}", staging.path().display()))?;

        let builder = ParquetRecordBatchStreamBuilder::new(file)
            .await
            .map_err(|e| staging.invalid(format!("unreadable metadata: {e}")))?;

        let row_groups = builder
            .metadata()
            .row_groups()
            .iter()
            .map(|rg| RowGroupInfo {
                num_rows: rg.num_rows() as u64,
            })
            .collect::<Vec<_>>();
        let schema = builder.schema().clone();

        let stream = builder
            .with_batch_size(batch_size)
            .build()
            .context("Failed to build Parquet stream")?
            .boxed();

        debug!(
            path = %staging.path().display(),
            row_groups = row_groups.len(),
            columns = schema.fields().len(),
            "opened parquet file"
        );

        Ok(Self {
            staging,
            schema,
            row_groups,
            batch_size,
            stream,
            rows_read: 0,
            exhausted: false,
        })
    }

    pub fn path(&self) -> &Path {
        self.staging.path()
    }

    pub fn schema(&self) -> SchemaRef {
        self.schema.clone()
    }

    /// Row count declared by the file metadata
    pub fn total_rows(&self) -> u64 {
        self.row_groups.iter().map(|rg| rg.num_rows).sum()
    }

    pub fn row_group_count(&self) -> usize {
        self.row_groups.len()
    }

    /// Number of batches the sequence will produce
    pub fn planned_batches(&self) -> u64 {
        let batch_size = self.batch_size as u64;
        self.row_groups
            .iter()
            .map(|rg| rg.num_rows.div_ceil(batch_size))
            .sum()
    }
}

#[async_trait]
impl BatchSource for ParquetBatchReader {
    async fn next_batch(&mut self) -> Result<Option<RecordBatch>> {
        if self.exhausted {
            return Ok(None);
        }

        match self.stream.next().await {
            Some(batch) => {
                let batch = batch.context("Failed to read record batch")?;
                self.rows_read += batch.num_rows() as u64;
                Ok(Some(batch))
            }
            None => {
                self.exhausted = true;

                // A short read means the file lied about its contents; never end quietly
                let expected = self.total_rows();
                if self.rows_read != expected {
                    return Err(IngestError::RowCountMismatch {
                        expected,
                        actual: self.rows_read,
                    }
                    .into());
                }

                Ok(None)
            }
        }
    }
}
