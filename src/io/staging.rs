//! Local staging file checks.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

use crate::config::{MIN_PARQUET_FILE_SIZE, PARQUET_MAGIC};
use crate::error::IngestError;

/// The on-disk copy of the downloaded dataset
#[derive(Debug, Clone)]
pub struct StagingFile {
    path: PathBuf,
}

impl StagingFile {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn size(&self) -> Result<u64> {
        let metadata = tokio::fs::metadata(&self.path)
            .await
            .with_context(|| format!("Failed to stat staging file {}", self.path.display()))?;
        Ok(metadata.len())
    }

    /// Read `end - start` bytes beginning at `start`
    pub async fn read_range(&self, start: u64, end: u64) -> Result<Vec<u8>> {
        let mut file = File::open(&self.path)
            .await
            .with_context(|| format!("Failed to open staging file {}", self.path.display()))?;
        file.seek(std::io::SeekFrom::Start(start)).await?;

        let mut buffer = vec![0u8; (end - start) as usize];
        file.read_exact(&mut buffer).await?;
        Ok(buffer)
    }

    /// Check that the file is framed like a Parquet file
    ///
    /// A truncated or non-Parquet download (an HTML error page, a partial body)
    /// fails here instead of surfacing later as a confusing decode error.
    pub async fn validate(&self) -> Result<()> {
        let size = self.size().await?;
        if size < MIN_PARQUET_FILE_SIZE {
            return Err(self.invalid(format!(
                "file is {size} bytes, smaller than the minimum of {MIN_PARQUET_FILE_SIZE}"
            )));
        }

        let header = self.read_range(0, 4).await?;
        if header.as_slice() != PARQUET_MAGIC {
            return Err(self.invalid("missing PAR1 header magic".to_string()));
        }

        let footer = self.read_range(size - 4, size).await?;
        if footer.as_slice() != PARQUET_MAGIC {
            return Err(self.invalid(
                "missing PAR1 footer magic, the download may be truncated".to_string(),
            ));
        }

        Ok(())
    }

    pub(crate) fn invalid(&self, reason: String) -> anyhow::Error {
        IngestError::InvalidStagingFile {
            path: self.path.clone(),
            reason,
        }
        .into()
    }
}
