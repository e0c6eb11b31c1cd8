use anyhow::Result;
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;

/// A single row converted to text, one entry per column
///
/// `None` marks a SQL NULL. Values are re-typed against the table schema when
/// they are bound into an INSERT.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub fields: Vec<Option<String>>,
}

/// A finite, consume-once sequence of record batches
#[async_trait]
pub trait BatchSource: Send {
    /// Produce the next batch
    ///
    /// `Ok(None)` is the end of the sequence and is returned again on every
    /// later call. `Err` means the underlying read failed.
    async fn next_batch(&mut self) -> Result<Option<RecordBatch>>;
}
