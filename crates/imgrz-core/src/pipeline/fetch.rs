//! Resource acquisition: reading local files and downloading remote ones.

use futures_util::StreamExt;
use std::path::Path;
use std::time::Duration;

use crate::config::LimitsConfig;
use crate::error::{PipelineError, PipelineResult};

/// Read a local source fully into memory.
pub async fn read_local(path: &Path) -> PipelineResult<Vec<u8>> {
    tokio::fs::read(path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            PipelineError::FileNotFound(path.to_path_buf())
        } else {
            PipelineError::Read {
                path: path.to_path_buf(),
                message: e.to_string(),
            }
        }
    })
}

/// Size of a local source in bytes.
pub async fn local_size(path: &Path) -> PipelineResult<u64> {
    let meta = tokio::fs::metadata(path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            PipelineError::FileNotFound(path.to_path_buf())
        } else {
            PipelineError::Read {
                path: path.to_path_buf(),
                message: format!("Cannot read metadata: {}", e),
            }
        }
    })?;
    Ok(meta.len())
}

/// HTTP client for remote sources.
///
/// Cheap to clone; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct RemoteFetcher {
    client: reqwest::Client,
    max_bytes: u64,
    timeout_ms: u64,
}

impl RemoteFetcher {
    /// Create a fetcher honoring the configured size limit and timeout.
    pub fn new(limits: &LimitsConfig) -> PipelineResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(limits.fetch_timeout_ms))
            .user_agent(concat!("imgrz/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| PipelineError::Fetch {
                url: String::new(),
                message: format!("Cannot build HTTP client: {e}"),
                status_code: None,
            })?;
        Ok(Self {
            client,
            max_bytes: limits.max_bytes(),
            timeout_ms: limits.fetch_timeout_ms,
        })
    }

    /// Size announced by a `HEAD` request, if the server reports one.
    pub async fn content_length(&self, url: &str) -> PipelineResult<Option<u64>> {
        let response = self
            .client
            .head(url)
            .send()
            .await
            .map_err(|e| self.request_error(url, e))?;
        let response = check_status(url, response)?;
        // Read the header directly; the body size hint of a HEAD response is zero.
        Ok(response
            .headers()
            .get(reqwest::header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|len| *len > 0))
    }

    /// Download a remote source, aborting once it exceeds the size limit.
    pub async fn fetch(&self, url: &str) -> PipelineResult<Vec<u8>> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.request_error(url, e))?;
        let response = check_status(url, response)?;

        if let Some(len) = response.content_length() {
            self.check_limit(url, len)?;
        }

        let mut bytes = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| self.request_error(url, e))?;
            bytes.extend_from_slice(&chunk);
            self.check_limit(url, bytes.len() as u64)?;
        }

        tracing::debug!("Fetched {} ({} bytes)", url, bytes.len());
        Ok(bytes)
    }

    fn check_limit(&self, url: &str, len: u64) -> PipelineResult<()> {
        if len > self.max_bytes {
            return Err(PipelineError::FileTooLarge {
                name: url.to_string(),
                size_mb: len / (1024 * 1024),
                max_mb: self.max_bytes / (1024 * 1024),
            });
        }
        Ok(())
    }

    fn request_error(&self, url: &str, e: reqwest::Error) -> PipelineError {
        if e.is_timeout() {
            PipelineError::Timeout {
                name: url.to_string(),
                stage: "fetch".to_string(),
                timeout_ms: self.timeout_ms,
            }
        } else {
            PipelineError::Fetch {
                url: url.to_string(),
                message: e.to_string(),
                status_code: e.status().map(|s| s.as_u16()),
            }
        }
    }
}

fn check_status(url: &str, response: reqwest::Response) -> PipelineResult<reqwest::Response> {
    let status = response.status();
    if !status.is_success() {
        return Err(PipelineError::Fetch {
            url: url.to_string(),
            message: format!("HTTP {}", status),
            status_code: Some(status.as_u16()),
        });
    }
    Ok(response)
}
