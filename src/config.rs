//! Configuration constants for the ingester
//!
//! This module centralizes the tunable parameters and fixed names used throughout
//! the application.

use std::time::Duration;

// ============================================================================
// Source Configuration
// ============================================================================

/// Staging file the download is written to, relative to the working directory
pub const STAGING_FILE_NAME: &str = "output.parquet";

/// Maximum number of rows materialized per batch
pub const DEFAULT_BATCH_SIZE: usize = 100_000;

/// Magic bytes found at both the start and the end of every Parquet file
pub const PARQUET_MAGIC: &[u8; 4] = b"PAR1";

/// Smallest possible Parquet file: header magic, 4-byte footer length, footer magic
pub const MIN_PARQUET_FILE_SIZE: u64 = 12;

// ============================================================================
// Database Configuration
// ============================================================================

pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Upper bound on bind parameters in a single INSERT statement
///
/// PostgreSQL accepts up to 65535 parameters per statement, SQLite 32766.
/// The smaller limit keeps one statement builder valid for both backends.
pub const MAX_BIND_PARAMETERS: usize = 32_766;
