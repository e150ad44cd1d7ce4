//! Import of browser bookmark exports (Netscape bookmark HTML).
//!
//! Every `<a href="…">title</a>` with both an href and a title becomes a
//! `bookmark` source named after its title. Imported sources start
//! disabled, so a large export does not flood the next composition.

use std::path::Path;

use anyhow::{Context, Result};

use context_vacuum_core::fetch::ContentFetcher;
use context_vacuum_core::models::{CachedContent, NewSource, SourceKind};
use context_vacuum_core::store::SourceStore;
use context_vacuum_core::Error;

use crate::config::Config;
use crate::db;
use crate::extract::decode_entities;
use crate::fetcher::HttpFetcher;
use crate::sqlite_store::SqliteStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bookmark {
    pub title: String,
    pub url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportSummary {
    pub imported: usize,
    pub total: usize,
}

/// Anchors in document order. Anchors missing an href or a title are dropped.
pub fn parse_bookmarks(html: &str) -> Vec<Bookmark> {
    let lower = html.to_ascii_lowercase();
    let mut bookmarks = Vec::new();
    let mut pos = 0;

    while let Some(at) = lower[pos..].find("<a") {
        let start = pos + at;
        pos = start + 2;
        match lower[pos..].chars().next() {
            Some(c) if c.is_ascii_whitespace() => {}
            _ => continue,
        }
        let tag_end = match lower[start..].find('>') {
            Some(gt) => start + gt,
            None => break,
        };
        let body_start = tag_end + 1;
        let body_end = lower[body_start..]
            .find("</a")
            .map(|i| body_start + i)
            .unwrap_or(html.len());
        pos = body_end;

        let href = attribute(&html[start..tag_end], &lower[start..tag_end], "href");
        let title = decode_entities(strip_markup(&html[body_start..body_end]).trim());
        if let Some(url) = href {
            let title = title.trim();
            if !url.is_empty() && !title.is_empty() {
                bookmarks.push(Bookmark {
                    title: title.to_string(),
                    url: decode_entities(&url),
                });
            }
        }
    }
    bookmarks
}

/// Value of `name=` inside a tag; `lower` is the tag lowercased.
fn attribute(tag: &str, lower: &str, name: &str) -> Option<String> {
    let needle = format!("{}=", name);
    let mut search = 0;
    while let Some(at) = lower[search..].find(&needle) {
        let key_start = search + at;
        search = key_start + needle.len();
        let preceded_by_space = lower[..key_start]
            .chars()
            .last()
            .map(|c| c.is_ascii_whitespace())
            .unwrap_or(false);
        if !preceded_by_space {
            continue;
        }
        let rest = &tag[search..];
        let value = match rest.chars().next() {
            Some(quote @ ('"' | '\'')) => {
                let inner = &rest[1..];
                &inner[..inner.find(quote).unwrap_or(inner.len())]
            }
            _ => {
                let end = rest
                    .find(|c: char| c.is_ascii_whitespace() || c == '>')
                    .unwrap_or(rest.len());
                &rest[..end]
            }
        };
        return Some(value.trim().to_string());
    }
    None
}

fn strip_markup(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_tag = false;
    for c in text.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            c if !in_tag => out.push(c),
            _ => {}
        }
    }
    out
}

/// Fetch and store each bookmark that is not already cached.
///
/// A bookmark is skipped when its name is taken or when a source with the
/// same content fingerprint exists. Failures are logged per bookmark.
pub async fn import_bookmarks(
    store: &dyn SourceStore,
    fetcher: &dyn ContentFetcher,
    bookmarks: &[Bookmark],
) -> ImportSummary {
    let mut imported = 0;

    for bookmark in bookmarks {
        let content = match fetcher.fetch_remote(&bookmark.url).await {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!(
                    title = %bookmark.title,
                    url = %bookmark.url,
                    error = %e,
                    "failed to fetch bookmark"
                );
                continue;
            }
        };
        let cached = CachedContent::new(content);

        match store.find_by_fingerprint(cached.fingerprint()).await {
            Ok(Some(existing)) => {
                tracing::debug!(
                    title = %bookmark.title,
                    existing = %existing.name,
                    "bookmark content already cached"
                );
                continue;
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(title = %bookmark.title, error = %e, "failed to check for duplicate");
                continue;
            }
        }

        let new = NewSource {
            name: bookmark.title.clone(),
            kind: SourceKind::Bookmark,
            locator: bookmark.url.clone(),
            cached,
            enabled: false,
        };
        match store.create(new).await {
            Ok(_) => imported += 1,
            Err(Error::DuplicateName(name)) => {
                tracing::debug!(title = %name, "name already in use, skipping bookmark");
            }
            Err(e) => {
                tracing::warn!(title = %bookmark.title, error = %e, "failed to create source");
            }
        }
    }

    ImportSummary {
        imported,
        total: bookmarks.len(),
    }
}

pub async fn run_import_bookmarks(config: &Config, file: &Path) -> Result<()> {
    let html = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read bookmark file: {}", file.display()))?;
    let bookmarks = parse_bookmarks(&html);
    tracing::info!(count = bookmarks.len(), "importing bookmarks");

    let pool = db::connect(config).await?;
    let store = SqliteStore::new(pool.clone());
    let fetcher = HttpFetcher::from_config(&config.fetch)?;

    let summary = import_bookmarks(&store, &fetcher, &bookmarks).await;
    pool.close().await;

    println!("Imported {}/{} bookmarks", summary.imported, summary.total);
    Ok(())
}
