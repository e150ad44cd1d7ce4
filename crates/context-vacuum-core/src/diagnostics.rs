//! Diagnostic sink for failures that are recovered rather than returned.
//!
//! The refresh engine and generator never abort a batch because of one
//! bad source; they hand the failure to a [`DiagnosticSink`] instead. The
//! default [`TracingSink`] turns each diagnostic into a `tracing` event.

use std::fmt;

use crate::{Error, FetchError};

/// A recovered failure.
#[derive(Debug)]
pub enum Diagnostic<'a> {
    /// Fetch failed; cached content was used.
    FetchFailed {
        source: &'a str,
        error: &'a FetchError,
    },
    /// Fresh content could not be written back; it was still used for this run.
    PersistFailed { source: &'a str, error: &'a Error },
    /// Source was left out of the composition.
    Skipped { source: &'a str, error: &'a Error },
    /// Generation succeeded but the history entry was not written.
    HistoryFailed { error: &'a Error },
    /// An unknown format name was replaced by the default.
    FormatFallback { requested: &'a str, used: &'a str },
}

impl fmt::Display for Diagnostic<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::FetchFailed { source, error } => {
                write!(f, "fetch failed for '{}', using cached content: {}", source, error)
            }
            Diagnostic::PersistFailed { source, error } => {
                write!(f, "could not persist refreshed '{}': {}", source, error)
            }
            Diagnostic::Skipped { source, error } => {
                write!(f, "skipped '{}': {}", source, error)
            }
            Diagnostic::HistoryFailed { error } => {
                write!(f, "failed to record history: {}", error)
            }
            Diagnostic::FormatFallback { requested, used } => {
                write!(f, "unknown format '{}', using '{}'", requested, used)
            }
        }
    }
}

pub trait DiagnosticSink: Send + Sync {
    fn report(&self, diagnostic: Diagnostic<'_>);
}

/// Emits diagnostics as `tracing` warnings.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn report(&self, diagnostic: Diagnostic<'_>) {
        match diagnostic {
            Diagnostic::FetchFailed { source, error } => {
                tracing::warn!(source, error = %error, "fetch failed, using cached content");
            }
            Diagnostic::PersistFailed { source, error } => {
                tracing::warn!(source, error = %error, "failed to update cache, using fresh content");
            }
            Diagnostic::Skipped { source, error } => {
                tracing::error!(source, error = %error, "source excluded from composition");
            }
            Diagnostic::HistoryFailed { error } => {
                tracing::warn!(error = %error, "failed to record history");
            }
            Diagnostic::FormatFallback { requested, used } => {
                tracing::warn!(requested, used, "unknown output format, using default");
            }
        }
    }
}
