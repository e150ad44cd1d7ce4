//! Cache refresh engine.
//!
//! Reconciles each enabled source with whatever its locator currently
//! holds. The fingerprint of the fetched body is compared with the cached
//! one: equal means nothing is written, different means the store is
//! updated and the fresh body is used. Any failure degrades to the best
//! available data for that source alone; [`RefreshEngine::reconcile_all`]
//! never fails as a whole.
//!
//! Fetches may run concurrently (see [`RefreshEngine::with_concurrency`]),
//! but results are reassembled in input order, never completion order.

use std::path::Path;
use std::sync::Arc;

use futures_util::stream::{self, StreamExt};

use crate::diagnostics::{Diagnostic, DiagnosticSink};
use crate::fetch::ContentFetcher;
use crate::models::{now_ts, CachedContent, Source, SourceKind};
use crate::store::SourceStore;
use crate::Error;

/// What reconciliation did with a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Fetched body matched the cache; no write.
    Unchanged,
    /// Fetched body differed and was written back.
    Refreshed,
    /// Fetched body differed but the write failed; fresh body used anyway.
    RefreshedUnpersisted,
    /// Fetch failed; cached body used.
    FellBack,
}

/// A source ready for composition.
#[derive(Debug, Clone)]
pub struct Reconciled {
    pub source: Source,
    pub outcome: Outcome,
}

/// A source excluded from composition.
#[derive(Debug)]
pub struct Skipped {
    pub name: String,
    pub reason: Error,
}

/// Result of reconciling a batch, in input order.
#[derive(Debug, Default)]
pub struct ReconcileReport {
    pub reconciled: Vec<Reconciled>,
    pub skipped: Vec<Skipped>,
}

impl ReconcileReport {
    pub fn count(&self, outcome: Outcome) -> usize {
        self.reconciled
            .iter()
            .filter(|r| r.outcome == outcome)
            .count()
    }

    pub fn sources(&self) -> Vec<Source> {
        self.reconciled.iter().map(|r| r.source.clone()).collect()
    }
}

pub struct RefreshEngine {
    store: Arc<dyn SourceStore>,
    fetcher: Arc<dyn ContentFetcher>,
    diagnostics: Arc<dyn DiagnosticSink>,
    concurrency: usize,
}

impl RefreshEngine {
    pub fn new(
        store: Arc<dyn SourceStore>,
        fetcher: Arc<dyn ContentFetcher>,
        diagnostics: Arc<dyn DiagnosticSink>,
    ) -> Self {
        Self {
            store,
            fetcher,
            diagnostics,
            concurrency: 1,
        }
    }

    /// Maximum number of fetches in flight. Values below 1 are treated as 1.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Reconcile every source in `snapshot`.
    pub async fn reconcile_all(&self, snapshot: Vec<Source>) -> ReconcileReport {
        let results: Vec<Result<Reconciled, Skipped>> = stream::iter(snapshot)
            .map(|source| self.reconcile(source))
            .buffered(self.concurrency)
            .collect()
            .await;

        let mut report = ReconcileReport::default();
        for result in results {
            match result {
                Ok(reconciled) => report.reconciled.push(reconciled),
                Err(skipped) => report.skipped.push(skipped),
            }
        }
        report
    }

    /// Reconcile one source.
    pub async fn reconcile(&self, mut source: Source) -> Result<Reconciled, Skipped> {
        let fetched = match &source.kind {
            SourceKind::File => self.fetcher.fetch_file(Path::new(&source.locator)).await,
            SourceKind::Remote | SourceKind::Bookmark => {
                self.fetcher.fetch_remote(&source.locator).await
            }
            SourceKind::Unrecognized(raw) => {
                let reason = Error::UnrecognizedKind(raw.clone());
                self.diagnostics.report(Diagnostic::Skipped {
                    source: &source.name,
                    error: &reason,
                });
                return Err(Skipped {
                    name: source.name,
                    reason,
                });
            }
        };

        let fresh = match fetched {
            Ok(body) => CachedContent::new(body),
            Err(error) => {
                self.diagnostics.report(Diagnostic::FetchFailed {
                    source: &source.name,
                    error: &error,
                });
                return Ok(Reconciled {
                    source,
                    outcome: Outcome::FellBack,
                });
            }
        };

        if fresh.fingerprint() == source.fingerprint() {
            tracing::debug!(source = %source.name, "cache hit");
            return Ok(Reconciled {
                source,
                outcome: Outcome::Unchanged,
            });
        }

        let outcome = match self.store.update_content(source.id, &fresh).await {
            Ok(()) => {
                tracing::debug!(source = %source.name, kind = %source.kind, "refreshed cache");
                source.updated_at = now_ts();
                Outcome::Refreshed
            }
            Err(error) => {
                self.diagnostics.report(Diagnostic::PersistFailed {
                    source: &source.name,
                    error: &error,
                });
                Outcome::RefreshedUnpersisted
            }
        };
        source.cached = fresh;

        Ok(Reconciled { source, outcome })
    }
}
