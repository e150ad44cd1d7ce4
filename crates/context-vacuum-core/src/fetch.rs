//! The content-fetching capability consumed by the refresh engine.

use std::path::Path;

use async_trait::async_trait;

use crate::FetchError;

/// Turns a locator into plain text.
///
/// Implementations own extraction (HTML to text, PDF, and so on), size
/// limits, and timeouts. The refresh engine treats every error the same
/// way: it keeps serving the cached body.
#[async_trait]
pub trait ContentFetcher: Send + Sync {
    async fn fetch_file(&self, path: &Path) -> Result<String, FetchError>;

    async fn fetch_remote(&self, url: &str) -> Result<String, FetchError>;
}
