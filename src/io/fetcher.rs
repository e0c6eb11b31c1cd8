use anyhow::{Context, Result};
use bytes::Bytes;
use std::path::Path;
use tracing::info;

use crate::error::IngestError;

/// Downloads a remote file in a single request
///
/// The whole response body is held in memory before anything touches disk.
/// There is no retry and no timeout beyond the client defaults.
#[derive(Debug, Clone, Default)]
pub struct Fetcher {
    client: reqwest::Client,
}

impl Fetcher {
    /// Issue one GET request and return the full response body
    ///
    /// Connection failures and non-success statuses are both reported as
    /// [`IngestError::Download`].
    pub async fn fetch(&self, url: &str) -> Result<Bytes, IngestError> {
        let download_error = |source| IngestError::Download {
            url: url.to_string(),
            source,
        };

        let response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(download_error)?;

        response.bytes().await.map_err(download_error)
    }

    /// Download `url` and overwrite the file at `path` with its contents
    ///
    /// Returns the number of bytes written.
    pub async fn fetch_to_file(&self, url: &str, path: &Path) -> Result<u64> {
        let body = self.fetch(url).await?;

        tokio::fs::write(path, &body)
            .await
            .with_context(|| format!("Failed to write staging file {}", path.display()))?;

        info!(url, bytes = body.len(), path = %path.display(), "downloaded source file");

        Ok(body.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_fetch_to_file_writes_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data.parquet"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"PAR1 body PAR1".to_vec()))
            .expect(1)
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let staging = dir.path().join("output.parquet");
        let url = format!("{}/data.parquet", server.uri());

        let written = Fetcher::default()
            .fetch_to_file(&url, &staging)
            .await
            .unwrap();

        assert_eq!(written, 14);
        assert_eq!(std::fs::read(&staging).unwrap(), b"PAR1 body PAR1");
    }

    #[tokio::test]
    async fn test_fetch_to_file_overwrites_existing_file() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"new".to_vec()))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let staging = dir.path().join("output.parquet");
        std::fs::write(&staging, b"a much longer stale payload").unwrap();

        Fetcher::default()
            .fetch_to_file(&server.uri(), &staging)
            .await
            .unwrap();

        assert_eq!(std::fs::read(&staging).unwrap(), b"new");
    }

    #[tokio::test]
    async fn test_fetch_non_success_status_is_download_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let url = format!("{}/missing.parquet", server.uri());
        let err = Fetcher::default().fetch(&url).await.unwrap_err();

        match err {
            IngestError::Download { url: failed, source } => {
                assert_eq!(failed, url);
                assert_eq!(source.status(), Some(reqwest::StatusCode::NOT_FOUND));
            }
            other => panic!("Expected download error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_fetch_failure_leaves_staging_file_untouched() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let staging = dir.path().join("output.parquet");
        std::fs::write(&staging, b"previous run").unwrap();

        let result = Fetcher::default().fetch_to_file(&server.uri(), &staging).await;

        assert!(result.is_err());
        assert_eq!(std::fs::read(&staging).unwrap(), b"previous run");
    }

    #[tokio::test]
    async fn test_fetch_unreachable_host() {
        // Port 9 (discard) on localhost is not expected to accept HTTP connections
        let err = Fetcher::default()
            .fetch("http://127.0.0.1:9/data.parquet")
            .await
            .unwrap_err();

        assert!(matches!(err, IngestError::Download { .. }));
    }
}
