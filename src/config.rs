//! TOML configuration.
//!
//! Every section is optional; a missing config file behaves like an empty
//! one. Paths may start with `~/`.
//!
//! ```toml
//! [db]
//! path = "~/.context-vacuum/cache.db"
//!
//! [fetch]
//! max_bytes = 10485760
//! timeout_secs = 30
//! concurrency = 4
//!
//! [output]
//! default_format = "claude"
//! unknown_format = "reject"   # or "fallback"
//!
//! [filesystem]
//! exclude_globs = ["**/node_modules/**", "**/*.test.ts"]
//!
//! [logging]
//! level = "warn"
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use context_vacuum_core::compose::{FormatRegistry, UnknownFormatPolicy};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub db: DbConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub filesystem: FilesystemConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct FetchConfig {
    /// Largest file or response body accepted, in bytes.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: u64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Sources refreshed in parallel during `generate`.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_bytes: default_max_bytes(),
            timeout_secs: default_timeout_secs(),
            concurrency: default_concurrency(),
            user_agent: default_user_agent(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct OutputConfig {
    #[serde(default = "default_format")]
    pub default_format: String,
    /// `reject` or `fallback`.
    #[serde(default = "default_unknown_format")]
    pub unknown_format: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            default_format: default_format(),
            unknown_format: default_unknown_format(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct FilesystemConfig {
    /// Skipped when adding a directory. Matched against paths relative to it.
    #[serde(default = "default_exclude_globs")]
    pub exclude_globs: Vec<String>,
}

impl Default for FilesystemConfig {
    fn default() -> Self {
        Self {
            exclude_globs: default_exclude_globs(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// `~/.context-vacuum`, or `./.context-vacuum` when there is no home directory.
pub fn data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".context-vacuum")
}

pub fn default_config_path() -> PathBuf {
    data_dir().join("config.toml")
}

fn default_db_path() -> PathBuf {
    data_dir().join("cache.db")
}
fn default_max_bytes() -> u64 {
    10 * 1024 * 1024
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_concurrency() -> usize {
    4
}
fn default_user_agent() -> String {
    concat!("context-vacuum/", env!("CARGO_PKG_VERSION")).to_string()
}
fn default_format() -> String {
    "claude".to_string()
}
fn default_unknown_format() -> String {
    "reject".to_string()
}
fn default_exclude_globs() -> Vec<String> {
    vec![
        "**/*.test.ts".to_string(),
        "**/*.spec.ts".to_string(),
        "**/node_modules/**".to_string(),
        "**/.git/**".to_string(),
        "**/target/**".to_string(),
    ]
}
fn default_log_level() -> String {
    "warn".to_string()
}

impl Config {
    pub fn unknown_format_policy(&self) -> Result<UnknownFormatPolicy> {
        Ok(self.output.unknown_format.parse::<UnknownFormatPolicy>()?)
    }

    /// Built-in formats with the configured default and unknown-name policy.
    pub fn format_registry(&self) -> Result<FormatRegistry> {
        let mut registry = FormatRegistry::with_builtins();
        registry.set_default(&self.output.default_format)?;
        registry.set_policy(self.unknown_format_policy()?);
        Ok(registry)
    }
}

fn expand_tilde(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), dirs::home_dir()) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let mut config: Config = if path.exists() {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&content).with_context(|| "Failed to parse config file")?
    } else {
        Config::default()
    };

    config.db.path = expand_tilde(&config.db.path);

    if config.fetch.max_bytes == 0 {
        anyhow::bail!("fetch.max_bytes must be > 0");
    }
    if config.fetch.timeout_secs == 0 {
        anyhow::bail!("fetch.timeout_secs must be > 0");
    }
    if config.fetch.concurrency == 0 {
        anyhow::bail!("fetch.concurrency must be >= 1");
    }

    let registry = FormatRegistry::with_builtins();
    if !registry.contains(&config.output.default_format) {
        anyhow::bail!(
            "Unknown output.default_format: '{}'. Must be one of: {}.",
            config.output.default_format,
            registry.names().join(", ")
        );
    }
    config
        .unknown_format_policy()
        .with_context(|| "Invalid output.unknown_format")?;

    Ok(config)
}
