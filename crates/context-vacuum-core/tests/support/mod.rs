//! Shared test doubles: a scripted fetcher, a store wrapper that counts
//! (and can fail) writes, and a diagnostic sink that remembers reports.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use context_vacuum_core::diagnostics::{Diagnostic, DiagnosticSink};
use context_vacuum_core::fetch::ContentFetcher;
use context_vacuum_core::models::{CachedContent, NewSource, Source, SourceKind};
use context_vacuum_core::store::memory::InMemoryStore;
use context_vacuum_core::store::SourceStore;
use context_vacuum_core::{Error, FetchError, Result};

/// Scripted response for one locator.
#[derive(Clone)]
pub enum Reply {
    Body(String),
    Fail,
    TooLarge,
}

/// Fetcher answering from a locator → reply table, with optional delays.
#[derive(Default)]
pub struct ScriptedFetcher {
    replies: Mutex<HashMap<String, Reply>>,
    delays: Mutex<HashMap<String, Duration>>,
    calls: AtomicUsize,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, locator: &str, reply: Reply) {
        self.replies
            .lock()
            .unwrap()
            .insert(locator.to_string(), reply);
    }

    pub fn body(&self, locator: &str, body: &str) {
        self.set(locator, Reply::Body(body.to_string()));
    }

    pub fn delay(&self, locator: &str, delay: Duration) {
        self.delays
            .lock()
            .unwrap()
            .insert(locator.to_string(), delay);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn answer(&self, locator: &str) -> std::result::Result<String, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let delay = self.delays.lock().unwrap().get(locator).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let reply = self.replies.lock().unwrap().get(locator).cloned();
        match reply {
            Some(Reply::Body(body)) => Ok(body),
            Some(Reply::TooLarge) => Err(FetchError::SizeExceeded {
                size: 11 * 1024 * 1024,
                limit: 10 * 1024 * 1024,
            }),
            Some(Reply::Fail) | None => Err(FetchError::Network(format!(
                "connection refused: {}",
                locator
            ))),
        }
    }
}

#[async_trait]
impl ContentFetcher for ScriptedFetcher {
    async fn fetch_file(&self, path: &Path) -> std::result::Result<String, FetchError> {
        self.answer(&path.display().to_string()).await
    }

    async fn fetch_remote(&self, url: &str) -> std::result::Result<String, FetchError> {
        self.answer(url).await
    }
}

/// Delegates to [`InMemoryStore`], counting content writes.
#[derive(Default)]
pub struct CountingStore {
    inner: InMemoryStore,
    content_writes: AtomicUsize,
    fail_writes: AtomicBool,
}

impl CountingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn content_writes(&self) -> usize {
        self.content_writes.load(Ordering::SeqCst)
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl SourceStore for CountingStore {
    async fn create(&self, new: NewSource) -> Result<Source> {
        self.inner.create(new).await
    }

    async fn get_by_name(&self, name: &str) -> Result<Source> {
        self.inner.get_by_name(name).await
    }

    async fn find_by_fingerprint(&self, fingerprint: &str) -> Result<Option<Source>> {
        self.inner.find_by_fingerprint(fingerprint).await
    }

    async fn list(&self) -> Result<Vec<Source>> {
        self.inner.list().await
    }

    async fn list_enabled(&self) -> Result<Vec<Source>> {
        self.inner.list_enabled().await
    }

    async fn update_content(&self, id: i64, cached: &CachedContent) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Error::storage("update source content", "disk I/O error"));
        }
        self.content_writes.fetch_add(1, Ordering::SeqCst);
        self.inner.update_content(id, cached).await
    }

    async fn update_locator(&self, id: i64, locator: &str) -> Result<()> {
        self.inner.update_locator(id, locator).await
    }

    async fn set_enabled(&self, name: &str, enabled: bool) -> Result<()> {
        self.inner.set_enabled(name, enabled).await
    }

    async fn delete(&self, name: &str) -> Result<()> {
        self.inner.delete(name).await
    }
}

/// Remembers every diagnostic as a rendered line.
#[derive(Default)]
pub struct RecordingSink {
    lines: Mutex<Vec<String>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }
}

impl DiagnosticSink for RecordingSink {
    fn report(&self, diagnostic: Diagnostic<'_>) {
        self.lines.lock().unwrap().push(diagnostic.to_string());
    }
}

pub fn file_source(name: &str, locator: &str, body: &str) -> NewSource {
    NewSource {
        name: name.to_string(),
        kind: SourceKind::File,
        locator: locator.to_string(),
        cached: CachedContent::new(body),
        enabled: true,
    }
}

pub fn remote_source(name: &str, url: &str, body: &str) -> NewSource {
    NewSource {
        kind: SourceKind::Remote,
        ..file_source(name, url, body)
    }
}

pub fn shared<T>(value: T) -> Arc<T> {
    Arc::new(value)
}
