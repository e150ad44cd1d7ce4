//! Storage abstraction for Context Vacuum.
//!
//! [`SourceStore`] owns source records; [`HistoryRecorder`] owns the
//! append-only generation log. The refresh and composition engines only
//! ever see owned snapshots and write back through these traits.
//!
//! Implementations must be `Send + Sync` and must apply each write as a
//! single atomic unit: content, fingerprint and `updated_at` are never
//! observable half-updated.

pub mod memory;

use async_trait::async_trait;

use crate::models::{CachedContent, CompositionRecord, NewSource, Source};
use crate::Result;

/// Abstract source storage backend.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`create`](SourceStore::create) | Insert a new source, `DuplicateName` on collision |
/// | [`get_by_name`](SourceStore::get_by_name) | Lookup by unique name |
/// | [`find_by_fingerprint`](SourceStore::find_by_fingerprint) | Detect already-cached content |
/// | [`list`](SourceStore::list) | All sources, oldest first |
/// | [`list_enabled`](SourceStore::list_enabled) | Enabled sources, oldest first (composition order) |
/// | [`update_content`](SourceStore::update_content) | Replace cached body + fingerprint |
/// | [`update_locator`](SourceStore::update_locator) | Point a source at a new path or URL |
/// | [`set_enabled`](SourceStore::set_enabled) | Toggle participation in composition |
/// | [`delete`](SourceStore::delete) | Remove a source |
#[async_trait]
pub trait SourceStore: Send + Sync {
    async fn create(&self, new: NewSource) -> Result<Source>;

    async fn get_by_name(&self, name: &str) -> Result<Source>;

    async fn find_by_fingerprint(&self, fingerprint: &str) -> Result<Option<Source>>;

    async fn list(&self) -> Result<Vec<Source>>;

    /// Enabled sources ordered by `created_at` ascending, ties by `id`.
    async fn list_enabled(&self) -> Result<Vec<Source>>;

    /// Overwrite content and fingerprint and bump `updated_at`.
    async fn update_content(&self, id: i64, cached: &CachedContent) -> Result<()>;

    async fn update_locator(&self, id: i64, locator: &str) -> Result<()>;

    /// Set the enabled flag and bump `updated_at`.
    async fn set_enabled(&self, name: &str, enabled: bool) -> Result<()>;

    async fn delete(&self, name: &str) -> Result<()>;
}

/// Append-only log of generated compositions.
#[async_trait]
pub trait HistoryRecorder: Send + Sync {
    async fn record(
        &self,
        label: Option<&str>,
        destination: &str,
        source_count: usize,
    ) -> Result<CompositionRecord>;

    /// Most recent entries first.
    async fn recent(&self, limit: usize) -> Result<Vec<CompositionRecord>>;
}
