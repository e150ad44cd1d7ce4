//! Add-or-update of sources by name.
//!
//! Re-adding an existing name updates that record in place; it never
//! creates a second source. The same happens when `create` loses a race
//! against another writer and reports [`Error::DuplicateName`].

use crate::models::{now_ts, NewSource, Source};
use crate::store::SourceStore;
use crate::{Error, Result};

#[derive(Debug, Clone)]
pub enum Upserted {
    Created(Source),
    Updated(Source),
}

impl Upserted {
    pub fn source(&self) -> &Source {
        match self {
            Upserted::Created(source) | Upserted::Updated(source) => source,
        }
    }
}

pub async fn upsert_source(store: &dyn SourceStore, new: NewSource) -> Result<Upserted> {
    match store.get_by_name(&new.name).await {
        Ok(existing) => {
            tracing::info!(source = %new.name, "source exists, updating in place");
            return update_existing(store, existing, new).await.map(Upserted::Updated);
        }
        Err(Error::NotFound(_)) => {}
        Err(e) => return Err(e),
    }

    let name = new.name.clone();
    let retry = new.clone();
    match store.create(new).await {
        Ok(created) => {
            tracing::info!(
                source = %created.name,
                kind = %created.kind,
                enabled = created.enabled,
                "source added"
            );
            Ok(Upserted::Created(created))
        }
        Err(Error::DuplicateName(_)) => {
            tracing::warn!(source = %name, "name was taken concurrently, updating in place");
            let existing = store.get_by_name(&name).await?;
            update_existing(store, existing, retry)
                .await
                .map(Upserted::Updated)
        }
        Err(e) => Err(e),
    }
}

async fn update_existing(
    store: &dyn SourceStore,
    mut existing: Source,
    new: NewSource,
) -> Result<Source> {
    if existing.kind != new.kind {
        return Err(Error::KindChange {
            name: existing.name,
            existing: existing.kind.to_string(),
            requested: new.kind.to_string(),
        });
    }

    if existing.locator != new.locator {
        store.update_locator(existing.id, &new.locator).await?;
        existing.locator = new.locator;
    }

    if existing.fingerprint() != new.cached.fingerprint() {
        store.update_content(existing.id, &new.cached).await?;
        existing.cached = new.cached;
        existing.updated_at = now_ts();
    }

    Ok(existing)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CachedContent, SourceKind};
    use crate::store::memory::InMemoryStore;

    fn new_source(name: &str, locator: &str, body: &str) -> NewSource {
        NewSource {
            name: name.to_string(),
            kind: SourceKind::for_locator(locator),
            locator: locator.to_string(),
            cached: CachedContent::new(body),
            enabled: true,
        }
    }

    #[tokio::test]
    async fn first_add_creates() {
        let store = InMemoryStore::new();
        let result = upsert_source(&store, new_source("a", "/a.md", "alpha"))
            .await
            .unwrap();
        assert!(matches!(result, Upserted::Created(_)));
        assert_eq!(result.source().content(), "alpha");
    }

    #[tokio::test]
    async fn re_add_updates_in_place() {
        let store = InMemoryStore::new();
        let first = upsert_source(&store, new_source("a", "/a.md", "alpha"))
            .await
            .unwrap();
        let second = upsert_source(&store, new_source("a", "/moved/a.md", "ALPHA"))
            .await
            .unwrap();

        assert!(matches!(second, Upserted::Updated(_)));
        assert_eq!(second.source().id, first.source().id);

        let all = store.list().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].content(), "ALPHA");
        assert_eq!(all[0].locator, "/moved/a.md");
        assert_eq!(all[0].fingerprint(), crate::models::fingerprint("ALPHA"));
    }

    #[tokio::test]
    async fn re_add_cannot_change_kind() {
        let store = InMemoryStore::new();
        upsert_source(&store, new_source("a", "/a.md", "alpha"))
            .await
            .unwrap();
        let err = upsert_source(&store, new_source("a", "https://example.com", "web"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::KindChange { .. }));
        assert_eq!(store.get_by_name("a").await.unwrap().content(), "alpha");
    }
}
