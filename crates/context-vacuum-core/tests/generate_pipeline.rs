//! Full generation runs against the in-memory store.

mod support;

use std::sync::Arc;

use async_trait::async_trait;
use context_vacuum_core::compose::{FormatRegistry, UnknownFormatPolicy};
use context_vacuum_core::generate::{Destination, GenerateRequest, Generator};
use context_vacuum_core::models::{fingerprint, CompositionRecord};
use context_vacuum_core::store::memory::InMemoryStore;
use context_vacuum_core::store::{HistoryRecorder, SourceStore};
use context_vacuum_core::{Error, Result};
use tempfile::TempDir;

use support::{file_source, CountingStore, RecordingSink, Reply, ScriptedFetcher};

fn request(format: &str) -> GenerateRequest {
    GenerateRequest {
        format: Some(format.to_string()),
        label: None,
        destination: Destination::Stdout,
    }
}

struct BrokenHistory;

#[async_trait]
impl HistoryRecorder for BrokenHistory {
    async fn record(
        &self,
        _label: Option<&str>,
        _destination: &str,
        _source_count: usize,
    ) -> Result<CompositionRecord> {
        Err(Error::storage("insert history", "database is locked"))
    }

    async fn recent(&self, _limit: usize) -> Result<Vec<CompositionRecord>> {
        Ok(Vec::new())
    }
}

#[tokio::test]
async fn file_change_is_picked_up_and_other_sources_untouched() {
    let store = Arc::new(CountingStore::new());
    let fetcher = Arc::new(ScriptedFetcher::new());
    let history = Arc::new(InMemoryStore::new());
    let sink = Arc::new(RecordingSink::new());
    let generator = Generator::new(store.clone(), fetcher.clone(), history.clone(), sink.clone());

    store.create(file_source("A", "/a.txt", "alpha")).await.unwrap();
    store.create(file_source("B", "/b.txt", "beta")).await.unwrap();
    fetcher.body("/a.txt", "alpha");
    fetcher.body("/b.txt", "beta");

    let first = generator.generate(request("claude")).await.unwrap();
    let a = first.text.find("## 1. A").unwrap();
    let b = first.text.find("## 2. B").unwrap();
    assert!(a < b);
    assert!(first.text.contains("```\nalpha\n```"));
    assert!(first.text.contains("```\nbeta\n```"));
    assert_eq!(store.content_writes(), 0);

    let b_before = store.get_by_name("B").await.unwrap();
    fetcher.body("/a.txt", "ALPHA");

    let second = generator.generate(request("claude")).await.unwrap();
    assert!(second.text.contains("```\nALPHA\n```"));
    assert_eq!(second.refreshed, 1);
    assert_eq!(store.content_writes(), 1);
    assert_eq!(
        store.get_by_name("A").await.unwrap().fingerprint(),
        fingerprint("ALPHA")
    );
    assert_eq!(store.get_by_name("B").await.unwrap(), b_before);
}

#[tokio::test]
async fn empty_enabled_set_is_rejected() {
    let store = Arc::new(InMemoryStore::new());
    let generator = Generator::new(
        store.clone(),
        Arc::new(ScriptedFetcher::new()),
        store.clone(),
        Arc::new(RecordingSink::new()),
    );

    let err = generator.generate(request("plain")).await.unwrap_err();
    assert!(matches!(err, Error::EmptySourceSet));

    store
        .create(context_vacuum_core::models::NewSource {
            enabled: false,
            ..file_source("off", "/off.txt", "x")
        })
        .await
        .unwrap();
    let err = generator.generate(request("plain")).await.unwrap_err();
    assert!(matches!(err, Error::EmptySourceSet));
    assert!(store.recent(10).await.unwrap().is_empty());
}

#[tokio::test]
async fn plain_round_trip_contains_content_once() {
    let store = Arc::new(InMemoryStore::new());
    let fetcher = Arc::new(ScriptedFetcher::new());
    let generator = Generator::new(
        store.clone(),
        fetcher.clone(),
        store.clone(),
        Arc::new(RecordingSink::new()),
    );

    let body = "fn main() {\n    println!(\"hi\");\n}";
    store.create(file_source("snippet", "/main.rs", body)).await.unwrap();
    fetcher.body("/main.rs", body);

    let generated = generator.generate(request("plain")).await.unwrap();
    assert_eq!(generated.text.matches(body).count(), 1);
    assert_eq!(generated.text, format!("=== snippet ===\n{}", body));
}

#[tokio::test]
async fn unreachable_sources_still_compose_from_cache() {
    let store = Arc::new(InMemoryStore::new());
    let fetcher = Arc::new(ScriptedFetcher::new());
    let sink = Arc::new(RecordingSink::new());
    let generator = Generator::new(store.clone(), fetcher.clone(), store.clone(), sink.clone());

    store
        .create(file_source("gone", "/deleted.md", "remembered"))
        .await
        .unwrap();
    store.create(file_source("here", "/here.md", "present")).await.unwrap();
    fetcher.set("/deleted.md", Reply::Fail);
    fetcher.body("/here.md", "present");

    let generated = generator.generate(request("plain")).await.unwrap();
    assert_eq!(generated.fell_back, 1);
    assert_eq!(generated.source_count, 2);
    assert!(generated.text.contains("=== gone ===\nremembered"));
    assert_eq!(sink.lines().len(), 1);
}

#[tokio::test]
async fn history_failure_does_not_fail_generation() {
    let store = Arc::new(InMemoryStore::new());
    let fetcher = Arc::new(ScriptedFetcher::new());
    let sink = Arc::new(RecordingSink::new());
    let generator = Generator::new(
        store.clone(),
        fetcher.clone(),
        Arc::new(BrokenHistory),
        sink.clone(),
    );

    store.create(file_source("a", "/a.md", "alpha")).await.unwrap();
    fetcher.body("/a.md", "alpha");

    let generated = generator.generate(request("plain")).await.unwrap();
    assert!(generated.record.is_none());
    assert!(sink.lines()[0].contains("failed to record history"));
}

#[tokio::test]
async fn file_destination_is_written_and_recorded() {
    let tmp = TempDir::new().unwrap();
    let out = tmp.path().join("nested").join("CONTEXT.md");

    let store = Arc::new(InMemoryStore::new());
    let fetcher = Arc::new(ScriptedFetcher::new());
    let generator = Generator::new(
        store.clone(),
        fetcher.clone(),
        store.clone(),
        Arc::new(RecordingSink::new()),
    );
    store.create(file_source("a", "/a.md", "alpha")).await.unwrap();
    fetcher.body("/a.md", "alpha");

    let generated = generator
        .generate(GenerateRequest {
            format: None,
            label: Some("work".to_string()),
            destination: Destination::File(out.clone()),
        })
        .await
        .unwrap();

    assert_eq!(generated.format, "claude");
    assert_eq!(std::fs::read_to_string(&out).unwrap(), generated.text);

    let record = generated.record.unwrap();
    assert_eq!(record.label.as_deref(), Some("work"));
    assert_eq!(record.destination, out.display().to_string());
    assert_eq!(record.source_count, 1);
    assert_eq!(store.recent(5).await.unwrap(), vec![record]);
}

#[tokio::test]
async fn unknown_format_follows_configured_policy() {
    let store = Arc::new(InMemoryStore::new());
    let fetcher = Arc::new(ScriptedFetcher::new());
    store.create(file_source("a", "/a.md", "alpha")).await.unwrap();
    fetcher.body("/a.md", "alpha");

    let strict = Generator::new(
        store.clone(),
        fetcher.clone(),
        store.clone(),
        Arc::new(RecordingSink::new()),
    );
    let err = strict.generate(request("yaml")).await.unwrap_err();
    assert!(matches!(err, Error::UnknownFormat(_)));
    assert_eq!(fetcher.calls(), 0);

    let mut formats = FormatRegistry::with_builtins();
    formats.set_default("plain").unwrap();
    formats.set_policy(UnknownFormatPolicy::Fallback);
    let sink = Arc::new(RecordingSink::new());
    let lenient = Generator::new(store.clone(), fetcher.clone(), store.clone(), sink.clone())
        .with_formats(formats);

    let generated = lenient.generate(request("yaml")).await.unwrap();
    assert_eq!(generated.format, "plain");
    assert!(sink.lines()[0].contains("unknown format 'yaml'"));
}

#[tokio::test]
async fn all_sources_skipped_is_an_empty_set() {
    let store = Arc::new(InMemoryStore::new());
    let generator = Generator::new(
        store.clone(),
        Arc::new(ScriptedFetcher::new()),
        store.clone(),
        Arc::new(RecordingSink::new()),
    );
    store
        .create(context_vacuum_core::models::NewSource {
            kind: context_vacuum_core::models::SourceKind::Unrecognized("ftp".to_string()),
            ..file_source("odd", "ftp://odd", "x")
        })
        .await
        .unwrap();

    let err = generator.generate(request("plain")).await.unwrap_err();
    assert!(matches!(err, Error::EmptySourceSet));
}
