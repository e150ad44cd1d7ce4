//! # Context Vacuum Core
//!
//! The cache-consistency and composition engine behind Context Vacuum:
//! source models, the store abstraction, the refresh engine that keeps
//! cached content current, and the output formats that stitch enabled
//! sources into a single context document.
//!
//! This crate contains no SQLite, HTTP, or CLI code. Those live in the
//! `context-vacuum` application crate, which implements [`store::SourceStore`]
//! and [`fetch::ContentFetcher`] on top of sqlx and reqwest.
//!
//! ## Pipeline
//!
//! ```text
//! SourceStore::list_enabled ──▶ RefreshEngine ──▶ FormatRegistry ──▶ output
//!        ▲                          │                                 │
//!        └──── update_content ◀─────┘                HistoryRecorder ◀┘
//! ```

pub mod compose;
pub mod diagnostics;
pub mod error;
pub mod fetch;
pub mod generate;
pub mod models;
pub mod refresh;
pub mod sources;
pub mod store;

pub use error::{Error, FetchError, Result};
