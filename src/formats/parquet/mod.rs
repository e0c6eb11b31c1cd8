//! Parquet file format support.
//!
//! This module provides functionality to read Apache Parquet files batch by batch.
//! It includes:
//! - Conversion from Arrow RecordBatches to row-based Records
//! - ParquetBatchReader that implements the BatchSource trait

mod conversion;
mod reader;

pub use conversion::record_batch_to_records;
pub use reader::ParquetBatchReader;
