//! End-to-end composition: list, reconcile, render, write, record.
//!
//! [`Generator::generate`] is the one entry point the CLI calls. Failures
//! that concern a single source or the history log are reported to the
//! diagnostic sink and do not fail the run; only an unknown format, a store
//! read failure, an empty source set, or a failed output write do.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::compose::{compose, FormatRegistry};
use crate::diagnostics::{Diagnostic, DiagnosticSink};
use crate::fetch::ContentFetcher;
use crate::models::CompositionRecord;
use crate::refresh::{Outcome, RefreshEngine, Skipped};
use crate::store::{HistoryRecorder, SourceStore};
use crate::{Error, Result};

/// Where the rendered document goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    Stdout,
    File(PathBuf),
}

impl Destination {
    /// Value stored in history.
    pub fn label(&self) -> String {
        match self {
            Destination::Stdout => "stdout".to_string(),
            Destination::File(path) => path.display().to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GenerateRequest {
    /// Format name; `None` uses the registry default.
    pub format: Option<String>,
    /// Label recorded in history (the preset name, when there is one).
    pub label: Option<String>,
    pub destination: Destination,
}

/// A finished composition.
#[derive(Debug)]
pub struct Generated {
    pub text: String,
    pub format: String,
    pub source_count: usize,
    pub refreshed: usize,
    pub fell_back: usize,
    pub skipped: Vec<Skipped>,
    /// `None` if the history write failed.
    pub record: Option<CompositionRecord>,
}

pub struct Generator {
    store: Arc<dyn SourceStore>,
    refresh: RefreshEngine,
    formats: FormatRegistry,
    history: Arc<dyn HistoryRecorder>,
    diagnostics: Arc<dyn DiagnosticSink>,
}

impl Generator {
    pub fn new(
        store: Arc<dyn SourceStore>,
        fetcher: Arc<dyn ContentFetcher>,
        history: Arc<dyn HistoryRecorder>,
        diagnostics: Arc<dyn DiagnosticSink>,
    ) -> Self {
        let refresh = RefreshEngine::new(store.clone(), fetcher, diagnostics.clone());
        Self {
            store,
            refresh,
            formats: FormatRegistry::with_builtins(),
            history,
            diagnostics,
        }
    }

    pub fn with_formats(mut self, formats: FormatRegistry) -> Self {
        self.formats = formats;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.refresh = self.refresh.with_concurrency(concurrency);
        self
    }

    pub async fn generate(&self, request: GenerateRequest) -> Result<Generated> {
        let format = self
            .formats
            .resolve(request.format.as_deref(), self.diagnostics.as_ref())?;

        let enabled = self.store.list_enabled().await?;
        if enabled.is_empty() {
            return Err(Error::EmptySourceSet);
        }
        tracing::debug!(source_count = enabled.len(), format = format.name(), "generating context");

        let report = self.refresh.reconcile_all(enabled).await;
        let sources = report.sources();
        let text = compose(format.as_ref(), &sources)?;

        if let Destination::File(path) = &request.destination {
            write_output(path, &text)?;
        }

        let destination = request.destination.label();
        let record = match self
            .history
            .record(request.label.as_deref(), &destination, sources.len())
            .await
        {
            Ok(record) => Some(record),
            Err(error) => {
                self.diagnostics
                    .report(Diagnostic::HistoryFailed { error: &error });
                None
            }
        };

        let refreshed =
            report.count(Outcome::Refreshed) + report.count(Outcome::RefreshedUnpersisted);
        let fell_back = report.count(Outcome::FellBack);
        tracing::info!(
            source_count = sources.len(),
            refreshed,
            fell_back,
            skipped = report.skipped.len(),
            destination = %destination,
            "context generated"
        );

        Ok(Generated {
            text,
            format: format.name().to_string(),
            source_count: sources.len(),
            refreshed,
            fell_back,
            skipped: report.skipped,
            record,
        })
    }
}

fn write_output(path: &Path, text: &str) -> Result<()> {
    let io_err = |source| Error::Io {
        path: path.display().to_string(),
        source,
    };
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
    }
    std::fs::write(path, text).map_err(io_err)
}
