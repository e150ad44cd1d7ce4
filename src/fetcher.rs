//! The shipped [`ContentFetcher`]: local files from disk, remote pages
//! over HTTP(S) with `reqwest`.
//!
//! Both paths enforce `fetch.max_bytes` before buffering the whole body and
//! hand the bytes to [`crate::extract`] for text conversion.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;

use context_vacuum_core::fetch::ContentFetcher;
use context_vacuum_core::FetchError;

use crate::config::FetchConfig;
use crate::extract::{extract_text, ContentType};

pub struct HttpFetcher {
    client: reqwest::Client,
    max_bytes: u64,
}

impl HttpFetcher {
    pub fn from_config(config: &FetchConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self::with_client(client, config.max_bytes))
    }

    pub fn with_client(client: reqwest::Client, max_bytes: u64) -> Self {
        Self { client, max_bytes }
    }

    fn check_size(&self, size: u64) -> std::result::Result<(), FetchError> {
        if size > self.max_bytes {
            return Err(FetchError::SizeExceeded {
                size,
                limit: self.max_bytes,
            });
        }
        Ok(())
    }
}

fn request_error(url: &str, err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout(url.to_string())
    } else {
        FetchError::Network(format!("{}: {}", url, err))
    }
}

/// PDF and DOCX extraction is CPU-bound; keep it off the runtime threads.
async fn extract_blocking(
    bytes: Vec<u8>,
    content_type: ContentType,
    lossy: bool,
) -> std::result::Result<String, FetchError> {
    tokio::task::spawn_blocking(move || extract_text(&bytes, content_type, lossy))
        .await
        .map_err(|e| FetchError::Decode(format!("extraction task failed: {}", e)))?
}

#[async_trait]
impl ContentFetcher for HttpFetcher {
    async fn fetch_file(&self, path: &Path) -> std::result::Result<String, FetchError> {
        let io_err = |source: std::io::Error| FetchError::Io {
            path: path.display().to_string(),
            source,
        };

        let metadata = tokio::fs::metadata(path).await.map_err(io_err)?;
        self.check_size(metadata.len())?;

        let bytes = tokio::fs::read(path).await.map_err(io_err)?;
        self.check_size(bytes.len() as u64)?;

        extract_blocking(bytes, ContentType::from_path(path), false).await
    }

    async fn fetch_remote(&self, url: &str) -> std::result::Result<String, FetchError> {
        let mut response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| request_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        if let Some(declared) = response.content_length() {
            self.check_size(declared)?;
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(ContentType::from_mime)
            .unwrap_or(ContentType::Text);

        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(|e| request_error(url, e))? {
            body.extend_from_slice(&chunk);
            self.check_size(body.len() as u64)?;
        }

        tracing::debug!(url, bytes = body.len(), ?content_type, "fetched remote content");
        extract_blocking(body, content_type, true).await
    }
}
