//! Source management commands: `add`, `remove`, `enable`, `disable`, `list`.
//!
//! Adding a directory walks it and adds every file that is not excluded by
//! `filesystem.exclude_globs`, each as its own `file` source named
//! `<name>/<relative path>`.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::Serialize;
use walkdir::WalkDir;

use context_vacuum_core::fetch::ContentFetcher;
use context_vacuum_core::models::{CachedContent, NewSource, Source, SourceKind};
use context_vacuum_core::sources::{upsert_source, Upserted};
use context_vacuum_core::store::SourceStore;

use crate::config::Config;
use crate::db;
use crate::fetcher::HttpFetcher;
use crate::sqlite_store::SqliteStore;

/// Options for [`add_source`].
pub struct AddOptions<'a> {
    pub name: &'a str,
    pub enabled: bool,
    pub exclude_globs: &'a [String],
}

/// Result of adding a directory or a single locator.
#[derive(Debug, Default)]
pub struct AddReport {
    pub upserted: Vec<Upserted>,
    /// Files under a directory that could not be read, with the reason.
    pub failed: Vec<(PathBuf, String)>,
}

pub fn build_excludes(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(
            Glob::new(pattern)
                .with_context(|| format!("Invalid exclude glob: {}", pattern))?,
        );
    }
    Ok(builder.build()?)
}

fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir().context("Failed to resolve current directory")?;
    Ok(cwd.join(path))
}

/// Files under `dir` in sorted order, minus excluded ones, paired with
/// their `/`-separated path relative to `dir`.
fn walk_files(dir: &Path, excludes: &GlobSet) -> Result<Vec<(PathBuf, String)>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.with_context(|| format!("Failed to walk {}", dir.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = match entry.path().strip_prefix(dir) {
            Ok(rel) => rel,
            Err(_) => continue,
        };
        if excludes.is_match(relative) {
            tracing::debug!(path = %relative.display(), "excluded");
            continue;
        }
        let name = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        files.push((entry.path().to_path_buf(), name));
    }
    Ok(files)
}

/// Fetch `locator` and upsert it under `options.name`.
///
/// URLs become `remote` sources, paths become `file` sources. A directory
/// adds one source per contained file; unreadable files are reported in
/// [`AddReport::failed`] instead of failing the whole add.
pub async fn add_source(
    store: &dyn SourceStore,
    fetcher: &dyn ContentFetcher,
    locator: &str,
    options: &AddOptions<'_>,
) -> Result<AddReport> {
    let mut report = AddReport::default();

    if SourceKind::for_locator(locator) == SourceKind::Remote {
        let content = fetcher
            .fetch_remote(locator)
            .await
            .with_context(|| format!("Failed to fetch {}", locator))?;
        let upserted = upsert_source(
            store,
            NewSource {
                name: options.name.to_string(),
                kind: SourceKind::Remote,
                locator: locator.to_string(),
                cached: CachedContent::new(content),
                enabled: options.enabled,
            },
        )
        .await?;
        report.upserted.push(upserted);
        return Ok(report);
    }

    let path = absolute(Path::new(locator))?;
    if !path.exists() {
        bail!("No such file or directory: {}", path.display());
    }

    if !path.is_dir() {
        let content = fetcher
            .fetch_file(&path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let upserted = upsert_source(store, file_source(options, options.name, &path, content)).await?;
        report.upserted.push(upserted);
        return Ok(report);
    }

    let excludes = build_excludes(options.exclude_globs)?;
    for (file, relative) in walk_files(&path, &excludes)? {
        let content = match fetcher.fetch_file(&file).await {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!(path = %file.display(), error = %e, "skipping unreadable file");
                report.failed.push((file, e.to_string()));
                continue;
            }
        };
        let name = format!("{}/{}", options.name, relative);
        let upserted = upsert_source(store, file_source(options, &name, &file, content)).await?;
        report.upserted.push(upserted);
    }
    Ok(report)
}

fn file_source(options: &AddOptions<'_>, name: &str, path: &Path, content: String) -> NewSource {
    NewSource {
        name: name.to_string(),
        kind: SourceKind::File,
        locator: path.display().to_string(),
        cached: CachedContent::new(content),
        enabled: options.enabled,
    }
}

pub async fn run_add(config: &Config, locator: &str, name: &str, disabled: bool) -> Result<()> {
    let pool = db::connect(config).await?;
    let store = SqliteStore::new(pool.clone());
    let fetcher = HttpFetcher::from_config(&config.fetch)?;

    let options = AddOptions {
        name,
        enabled: !disabled,
        exclude_globs: &config.filesystem.exclude_globs,
    };
    let report = add_source(&store, &fetcher, locator, &options).await;
    pool.close().await;
    let report = report?;

    for upserted in &report.upserted {
        match upserted {
            Upserted::Created(source) => {
                println!("Added source: {} (ID: {})", source.name, source.id)
            }
            Upserted::Updated(source) => println!("Updated source: {}", source.name),
        }
    }
    for (path, reason) in &report.failed {
        eprintln!("Skipped {}: {}", path.display(), reason);
    }
    if report.upserted.is_empty() {
        bail!("Nothing added from {}", locator);
    }
    Ok(())
}

pub async fn run_remove(config: &Config, name: &str) -> Result<()> {
    let pool = db::connect(config).await?;
    let store = SqliteStore::new(pool.clone());
    let result = store.delete(name).await;
    pool.close().await;
    result.with_context(|| format!("Failed to delete source '{}'", name))?;

    tracing::info!(source = %name, "source removed");
    println!("Removed source: {}", name);
    Ok(())
}

pub async fn run_set_enabled(config: &Config, name: &str, enabled: bool) -> Result<()> {
    let pool = db::connect(config).await?;
    let store = SqliteStore::new(pool.clone());
    let result = store.set_enabled(name, enabled).await;
    pool.close().await;

    if enabled {
        result.with_context(|| format!("Failed to enable source '{}'", name))?;
        println!("Enabled source: {}", name);
    } else {
        result.with_context(|| format!("Failed to disable source '{}'", name))?;
        println!("Disabled source: {}", name);
    }
    Ok(())
}

/// Source as printed by `list --json`: everything except the cached body.
#[derive(Debug, Serialize)]
pub struct SourceSummary<'a> {
    pub id: i64,
    pub name: &'a str,
    pub kind: &'a SourceKind,
    pub locator: &'a str,
    pub enabled: bool,
    pub fingerprint: &'a str,
    pub bytes: usize,
    pub created_at: i64,
    pub updated_at: i64,
}

impl<'a> From<&'a Source> for SourceSummary<'a> {
    fn from(source: &'a Source) -> Self {
        Self {
            id: source.id,
            name: &source.name,
            kind: &source.kind,
            locator: &source.locator,
            enabled: source.enabled,
            fingerprint: source.fingerprint(),
            bytes: source.content().len(),
            created_at: source.created_at,
            updated_at: source.updated_at,
        }
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let kept: String = s.chars().take(max.saturating_sub(3)).collect();
    format!("{}...", kept)
}

pub async fn run_list(config: &Config, json: bool) -> Result<()> {
    let pool = db::connect(config).await?;
    let store = SqliteStore::new(pool.clone());
    let sources = store.list().await;
    pool.close().await;
    let sources = sources.context("Failed to list sources")?;

    if json {
        let summaries: Vec<SourceSummary<'_>> = sources.iter().map(SourceSummary::from).collect();
        println!("{}", serde_json::to_string_pretty(&summaries)?);
        return Ok(());
    }

    if sources.is_empty() {
        println!("No sources found");
        return Ok(());
    }

    println!(
        "{:<5} {:<30} {:<10} {:<8} PATH",
        "ID", "NAME", "TYPE", "ENABLED"
    );
    println!("{}", "-".repeat(80));
    for source in &sources {
        println!(
            "{:<5} {:<30} {:<10} {:<8} {}",
            source.id,
            truncate(&source.name, 30),
            source.kind.as_str(),
            if source.enabled { "yes" } else { "no" },
            truncate(&source.locator, 40),
        );
    }
    Ok(())
}
