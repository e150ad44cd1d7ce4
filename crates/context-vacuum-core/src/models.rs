//! Core data models used throughout Context Vacuum.
//!
//! A [`Source`] is one cached unit of text (a file, a web page, or an
//! imported bookmark). Its body always travels together with its
//! fingerprint inside [`CachedContent`], so the two can never diverge.

use serde::{Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;

/// SHA-256 of the content, lowercase hex.
///
/// Used only for equality checks between the cached and the freshly
/// fetched body of the same source.
pub fn fingerprint(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}

pub(crate) fn now_ts() -> i64 {
    chrono::Utc::now().timestamp()
}

/// How a source is refreshed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SourceKind {
    /// Local file, re-read from disk.
    File,
    /// Web page, re-fetched on every refresh.
    Remote,
    /// Web page imported from a bookmark file.
    Bookmark,
    /// A kind string this build does not know how to refresh.
    Unrecognized(String),
}

impl SourceKind {
    /// Persisted identifier.
    pub fn as_str(&self) -> &str {
        match self {
            SourceKind::File => "file",
            SourceKind::Remote => "url",
            SourceKind::Bookmark => "bookmark",
            SourceKind::Unrecognized(raw) => raw,
        }
    }

    pub fn parse(raw: &str) -> Self {
        match raw {
            "file" => SourceKind::File,
            "url" | "remote" => SourceKind::Remote,
            "bookmark" => SourceKind::Bookmark,
            other => SourceKind::Unrecognized(other.to_string()),
        }
    }

    /// Classify a user-supplied locator.
    pub fn for_locator(locator: &str) -> Self {
        if locator.starts_with("http://") || locator.starts_with("https://") {
            SourceKind::Remote
        } else {
            SourceKind::File
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for SourceKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// A text body paired with its fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CachedContent {
    content: String,
    fingerprint: String,
}

impl CachedContent {
    pub fn new(content: impl Into<String>) -> Self {
        let content = content.into();
        let fingerprint = fingerprint(&content);
        Self {
            content,
            fingerprint,
        }
    }

    /// Rebuild from persisted columns.
    ///
    /// Only store backends should call this, for rows they wrote themselves
    /// through [`CachedContent::new`].
    pub fn from_stored(content: String, fingerprint: String) -> Self {
        Self {
            content,
            fingerprint,
        }
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }
}

/// A cached source as held by a [`SourceStore`](crate::store::SourceStore).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Source {
    pub id: i64,
    pub name: String,
    pub kind: SourceKind,
    /// Absolute path or URL.
    pub locator: String,
    #[serde(flatten)]
    pub cached: CachedContent,
    pub enabled: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Source {
    pub fn content(&self) -> &str {
        self.cached.content()
    }

    pub fn fingerprint(&self) -> &str {
        self.cached.fingerprint()
    }
}

/// Input for [`SourceStore::create`](crate::store::SourceStore::create).
#[derive(Debug, Clone)]
pub struct NewSource {
    pub name: String,
    pub kind: SourceKind,
    pub locator: String,
    pub cached: CachedContent,
    pub enabled: bool,
}

/// One entry in the append-only generation history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompositionRecord {
    pub id: i64,
    /// Preset the composition was generated from, if any.
    pub label: Option<String>,
    /// Output path, or `stdout`.
    pub destination: String,
    pub source_count: i64,
    pub generated_at: i64,
}
