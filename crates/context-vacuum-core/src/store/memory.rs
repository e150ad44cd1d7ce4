//! In-memory [`SourceStore`] and [`HistoryRecorder`] for tests.
//!
//! Records live in `Vec`s behind `std::sync::RwLock`; every operation takes
//! the lock once, so each write is atomic with respect to readers.

use std::sync::RwLock;

use async_trait::async_trait;

use crate::models::{now_ts, CachedContent, CompositionRecord, NewSource, Source};
use crate::{Error, Result};

use super::{HistoryRecorder, SourceStore};

#[derive(Default)]
struct Tables {
    sources: Vec<Source>,
    history: Vec<CompositionRecord>,
    next_source_id: i64,
    next_history_id: i64,
}

/// In-memory store for tests and embedding.
#[derive(Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned() -> Error {
    Error::storage("in-memory store", "lock poisoned")
}

fn enabled_in_order(sources: &[Source]) -> Vec<Source> {
    let mut enabled: Vec<Source> = sources.iter().filter(|s| s.enabled).cloned().collect();
    enabled.sort_by_key(|s| (s.created_at, s.id));
    enabled
}

#[async_trait]
impl SourceStore for InMemoryStore {
    async fn create(&self, new: NewSource) -> Result<Source> {
        let mut tables = self.tables.write().map_err(|_| poisoned())?;
        if tables.sources.iter().any(|s| s.name == new.name) {
            return Err(Error::DuplicateName(new.name));
        }
        tables.next_source_id += 1;
        let now = now_ts();
        let source = Source {
            id: tables.next_source_id,
            name: new.name,
            kind: new.kind,
            locator: new.locator,
            cached: new.cached,
            enabled: new.enabled,
            created_at: now,
            updated_at: now,
        };
        tables.sources.push(source.clone());
        Ok(source)
    }

    async fn get_by_name(&self, name: &str) -> Result<Source> {
        let tables = self.tables.read().map_err(|_| poisoned())?;
        tables
            .sources
            .iter()
            .find(|s| s.name == name)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("source '{}'", name)))
    }

    async fn find_by_fingerprint(&self, fingerprint: &str) -> Result<Option<Source>> {
        let tables = self.tables.read().map_err(|_| poisoned())?;
        Ok(tables
            .sources
            .iter()
            .find(|s| s.fingerprint() == fingerprint)
            .cloned())
    }

    async fn list(&self) -> Result<Vec<Source>> {
        let tables = self.tables.read().map_err(|_| poisoned())?;
        let mut all = tables.sources.clone();
        all.sort_by_key(|s| (s.created_at, s.id));
        Ok(all)
    }

    async fn list_enabled(&self) -> Result<Vec<Source>> {
        let tables = self.tables.read().map_err(|_| poisoned())?;
        Ok(enabled_in_order(&tables.sources))
    }

    async fn update_content(&self, id: i64, cached: &CachedContent) -> Result<()> {
        let mut tables = self.tables.write().map_err(|_| poisoned())?;
        let source = tables
            .sources
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| Error::NotFound(format!("source id {}", id)))?;
        source.cached = cached.clone();
        source.updated_at = now_ts();
        Ok(())
    }

    async fn update_locator(&self, id: i64, locator: &str) -> Result<()> {
        let mut tables = self.tables.write().map_err(|_| poisoned())?;
        let source = tables
            .sources
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| Error::NotFound(format!("source id {}", id)))?;
        source.locator = locator.to_string();
        Ok(())
    }

    async fn set_enabled(&self, name: &str, enabled: bool) -> Result<()> {
        let mut tables = self.tables.write().map_err(|_| poisoned())?;
        let source = tables
            .sources
            .iter_mut()
            .find(|s| s.name == name)
            .ok_or_else(|| Error::NotFound(format!("source '{}'", name)))?;
        if source.enabled != enabled {
            source.enabled = enabled;
            source.updated_at = now_ts();
        }
        Ok(())
    }

    async fn delete(&self, name: &str) -> Result<()> {
        let mut tables = self.tables.write().map_err(|_| poisoned())?;
        let before = tables.sources.len();
        tables.sources.retain(|s| s.name != name);
        if tables.sources.len() == before {
            return Err(Error::NotFound(format!("source '{}'", name)));
        }
        Ok(())
    }
}

#[async_trait]
impl HistoryRecorder for InMemoryStore {
    async fn record(
        &self,
        label: Option<&str>,
        destination: &str,
        source_count: usize,
    ) -> Result<CompositionRecord> {
        let mut tables = self.tables.write().map_err(|_| poisoned())?;
        tables.next_history_id += 1;
        let record = CompositionRecord {
            id: tables.next_history_id,
            label: label.map(str::to_string),
            destination: destination.to_string(),
            source_count: source_count as i64,
            generated_at: now_ts(),
        };
        tables.history.push(record.clone());
        Ok(record)
    }

    async fn recent(&self, limit: usize) -> Result<Vec<CompositionRecord>> {
        let tables = self.tables.read().map_err(|_| poisoned())?;
        Ok(tables.history.iter().rev().take(limit).cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SourceKind;

    fn new_source(name: &str, body: &str, enabled: bool) -> NewSource {
        NewSource {
            name: name.to_string(),
            kind: SourceKind::File,
            locator: format!("/tmp/{}", name),
            cached: CachedContent::new(body),
            enabled,
        }
    }

    #[tokio::test]
    async fn create_rejects_duplicate_names() {
        let store = InMemoryStore::new();
        store.create(new_source("a", "one", true)).await.unwrap();
        let err = store.create(new_source("a", "two", true)).await.unwrap_err();
        assert!(matches!(err, Error::DuplicateName(ref n) if n == "a"));
        assert_eq!(store.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn list_enabled_filters_and_keeps_creation_order() {
        let store = InMemoryStore::new();
        store.create(new_source("first", "1", true)).await.unwrap();
        store.create(new_source("hidden", "2", false)).await.unwrap();
        store.create(new_source("third", "3", true)).await.unwrap();

        let names: Vec<String> = store
            .list_enabled()
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names, vec!["first", "third"]);
    }

    #[tokio::test]
    async fn toggling_does_not_reorder() {
        let store = InMemoryStore::new();
        store.create(new_source("a", "1", true)).await.unwrap();
        store.create(new_source("b", "2", true)).await.unwrap();
        store.set_enabled("a", false).await.unwrap();
        store.set_enabled("a", true).await.unwrap();

        let names: Vec<String> = store
            .list_enabled()
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn setting_the_current_flag_leaves_updated_at_alone() {
        let store = InMemoryStore::new();
        store.create(new_source("a", "1", true)).await.unwrap();
        store.tables.write().unwrap().sources[0].updated_at = 0;

        store.set_enabled("a", true).await.unwrap();
        assert_eq!(store.get_by_name("a").await.unwrap().updated_at, 0);

        store.set_enabled("a", false).await.unwrap();
        let toggled = store.get_by_name("a").await.unwrap();
        assert!(!toggled.enabled);
        assert!(toggled.updated_at > 0);
    }

    #[tokio::test]
    async fn update_content_replaces_body_and_digest_together() {
        let store = InMemoryStore::new();
        let created = store.create(new_source("a", "alpha", true)).await.unwrap();
        store
            .update_content(created.id, &CachedContent::new("ALPHA"))
            .await
            .unwrap();

        let fetched = store.get_by_name("a").await.unwrap();
        assert_eq!(fetched.content(), "ALPHA");
        assert_eq!(fetched.fingerprint(), crate::models::fingerprint("ALPHA"));
    }

    #[tokio::test]
    async fn missing_records_report_not_found() {
        let store = InMemoryStore::new();
        assert!(matches!(
            store.get_by_name("nope").await,
            Err(Error::NotFound(_))
        ));
        assert!(matches!(
            store.set_enabled("nope", true).await,
            Err(Error::NotFound(_))
        ));
        assert!(matches!(store.delete("nope").await, Err(Error::NotFound(_))));
        assert!(matches!(
            store.update_content(42, &CachedContent::new("x")).await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn history_is_most_recent_first() {
        let store = InMemoryStore::new();
        store.record(None, "stdout", 1).await.unwrap();
        store.record(Some("work"), "/tmp/out.md", 3).await.unwrap();

        let recent = store.recent(10).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].label.as_deref(), Some("work"));
        assert_eq!(recent[0].source_count, 3);
        assert_eq!(recent[1].destination, "stdout");
        assert_eq!(store.recent(1).await.unwrap().len(), 1);
    }
}
