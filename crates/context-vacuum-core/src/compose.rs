//! Output formats and the format registry.
//!
//! A [`Format`] renders an ordered slice of sources into one document. It
//! borrows its input and never re-sorts it, so the order the store hands
//! out (creation time, oldest first) is the order in the output.
//!
//! Three formats are built in:
//!
//! | Name | Shape |
//! |------|-------|
//! | `claude` | Header, numbered sections with locator and fenced content |
//! | `cursor` | Timestamped header, one heading + raw body per source |
//! | `plain` | `=== name ===` delimiter lines, no header |

use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};

use crate::diagnostics::{Diagnostic, DiagnosticSink};
use crate::models::Source;
use crate::{Error, Result};

pub const PRIMARY: &str = "claude";
pub const ANNOTATED: &str = "cursor";
pub const PLAIN: &str = "plain";

/// A named renderer.
pub trait Format: Send + Sync {
    fn name(&self) -> &str;

    fn render(&self, sources: &[Source]) -> String;
}

/// Render `sources`, rejecting an empty set.
pub fn compose(format: &dyn Format, sources: &[Source]) -> Result<String> {
    if sources.is_empty() {
        return Err(Error::EmptySourceSet);
    }
    Ok(format.render(sources))
}

/// Numbered, fenced sections. Deterministic.
#[derive(Debug, Default, Clone, Copy)]
pub struct PrimaryFormat;

impl Format for PrimaryFormat {
    fn name(&self) -> &str {
        PRIMARY
    }

    fn render(&self, sources: &[Source]) -> String {
        let mut out = String::new();
        out.push_str("# Development Context\n\n");
        out.push_str("The following content consists of curated context for LLM assistants.\n\n");
        out.push_str("---\n\n");

        for (i, source) in sources.iter().enumerate() {
            out.push_str(&format!("## {}. {}\n\n", i + 1, source.name));
            out.push_str(&format!("**Source:** {} ({})\n\n", source.locator, source.kind));
            out.push_str("```\n");
            out.push_str(source.content());
            out.push_str("\n```\n\n");
            out.push_str("---\n\n");
        }
        out
    }
}

/// Render-time clock for [`AnnotatedFormat`].
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Timestamped header followed by raw bodies.
pub struct AnnotatedFormat {
    clock: Clock,
}

impl AnnotatedFormat {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(Utc::now))
    }

    pub fn with_clock(clock: Clock) -> Self {
        Self { clock }
    }
}

impl Default for AnnotatedFormat {
    fn default() -> Self {
        Self::new()
    }
}

impl Format for AnnotatedFormat {
    fn name(&self) -> &str {
        ANNOTATED
    }

    fn render(&self, sources: &[Source]) -> String {
        let generated = (self.clock)().to_rfc3339_opts(SecondsFormat::Secs, true);
        let mut out = String::new();
        out.push_str("# Cursor Context\n\n");
        out.push_str(&format!("Generated: {}\n\n", generated));

        for source in sources {
            out.push_str(&format!("## {}\n\n", source.name));
            out.push_str(source.content());
            out.push_str("\n\n");
        }
        out
    }
}

/// Delimited concatenation with no header.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainFormat;

impl Format for PlainFormat {
    fn name(&self) -> &str {
        PLAIN
    }

    fn render(&self, sources: &[Source]) -> String {
        let mut out = String::new();
        for (i, source) in sources.iter().enumerate() {
            if i > 0 {
                out.push_str("\n\n");
            }
            out.push_str(&format!("=== {} ===\n", source.name));
            out.push_str(source.content());
        }
        out
    }
}

/// What to do when a caller names a format that is not registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnknownFormatPolicy {
    /// Fail with [`Error::UnknownFormat`].
    #[default]
    Reject,
    /// Use the registry's default format and report a diagnostic.
    Fallback,
}

impl FromStr for UnknownFormatPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "reject" => Ok(UnknownFormatPolicy::Reject),
            "fallback" => Ok(UnknownFormatPolicy::Fallback),
            other => Err(Error::UnknownFormat(format!(
                "unknown-format policy '{}' (expected reject or fallback)",
                other
            ))),
        }
    }
}

/// Format lookup by name.
pub struct FormatRegistry {
    formats: BTreeMap<String, Arc<dyn Format>>,
    default_format: String,
    policy: UnknownFormatPolicy,
}

impl FormatRegistry {
    /// Registry holding the three built-in formats, defaulting to `claude`.
    pub fn with_builtins() -> Self {
        let mut registry = Self {
            formats: BTreeMap::new(),
            default_format: PRIMARY.to_string(),
            policy: UnknownFormatPolicy::default(),
        };
        registry.register(Arc::new(PrimaryFormat));
        registry.register(Arc::new(AnnotatedFormat::new()));
        registry.register(Arc::new(PlainFormat));
        registry
    }

    /// Add a format, replacing any with the same name.
    pub fn register(&mut self, format: Arc<dyn Format>) {
        self.formats.insert(format.name().to_string(), format);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.formats.contains_key(name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.formats.keys().map(String::as_str).collect()
    }

    pub fn default_format(&self) -> &str {
        &self.default_format
    }

    pub fn set_default(&mut self, name: &str) -> Result<()> {
        if !self.contains(name) {
            return Err(Error::UnknownFormat(name.to_string()));
        }
        self.default_format = name.to_string();
        Ok(())
    }

    pub fn set_policy(&mut self, policy: UnknownFormatPolicy) {
        self.policy = policy;
    }

    /// Look up `requested`, or the default format when `None`.
    pub fn resolve(
        &self,
        requested: Option<&str>,
        diagnostics: &dyn DiagnosticSink,
    ) -> Result<Arc<dyn Format>> {
        let name = requested.unwrap_or(&self.default_format);
        if let Some(format) = self.formats.get(name) {
            return Ok(format.clone());
        }
        match self.policy {
            UnknownFormatPolicy::Reject => Err(Error::UnknownFormat(name.to_string())),
            UnknownFormatPolicy::Fallback => {
                let format = self
                    .formats
                    .get(&self.default_format)
                    .cloned()
                    .ok_or_else(|| Error::UnknownFormat(self.default_format.clone()))?;
                diagnostics.report(Diagnostic::FormatFallback {
                    requested: name,
                    used: &self.default_format,
                });
                Ok(format)
            }
        }
    }
}

impl Default for FormatRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}
