use std::path::PathBuf;
use thiserror::Error;

/// Failure conditions callers need to tell apart
///
/// Database and filesystem failures that need no special handling travel as
/// plain `anyhow::Error` with context instead.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Failed to download {url}: {source}")]
    Download {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Staging file {} is not a valid Parquet file: {reason}", path.display())]
    InvalidStagingFile { path: PathBuf, reason: String },

    #[error("Staging file {} contains no rows", path.display())]
    EmptyDataset { path: PathBuf },

    #[error("Read {actual} rows but the file metadata declares {expected}")]
    RowCountMismatch { expected: u64, actual: u64 },

    #[error("Column '{column}' has unsupported type {data_type}")]
    UnsupportedColumnType { column: String, data_type: String },

    #[error("Batch {batch_index} does not match the schema of table '{table}': {detail}")]
    SchemaMismatch {
        table: String,
        batch_index: usize,
        detail: String,
    },

    #[error("Table '{table}' has not been initialized")]
    NotInitialized { table: String },
}
