//! # Context Vacuum
//!
//! A local-first cache of files, web pages and bookmarks, composed on demand
//! into a single context document for LLM tools.
//!
//! The cache-consistency and composition engine lives in
//! [`context_vacuum_core`]. This crate supplies the SQLite store, the HTTP
//! and filesystem fetcher, text extraction, configuration, and the command
//! implementations behind the `context-vacuum` binary.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌───────────────┐   ┌────────────────┐
//! │ HttpFetcher  │──▶│ RefreshEngine │──▶│ FormatRegistry │──▶ stdout / file
//! │ files + URLs │   │ (core)        │   │ claude/cursor  │
//! └──────────────┘   └───────┬───────┘   └───────┬────────┘
//!                            ▼                   ▼
//!                    ┌──────────────────────────────────┐
//!                    │ SQLite: sources, presets,        │
//!                    │ preset_sources, history          │
//!                    └──────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |
//! | [`sqlite_store`] | SQLite `SourceStore` / `HistoryRecorder` |
//! | [`fetcher`] | File and HTTP content fetching |
//! | [`extract`] | HTML, PDF and DOCX to text |
//! | [`sources`] | add / remove / enable / disable / list |
//! | [`bookmarks`] | Bookmark export import |
//! | [`presets`] | Named enabled-set snapshots |
//! | [`generate`] | Composition command |
//! | [`history`] | Composition history command |
//! | [`logging`] | tracing subscriber setup |

pub mod bookmarks;
pub mod config;
pub mod db;
pub mod extract;
pub mod fetcher;
pub mod generate;
pub mod history;
pub mod logging;
pub mod migrate;
pub mod presets;
pub mod sources;
pub mod sqlite_store;
