//! # Context Vacuum CLI (`context-vacuum`)
//!
//! Caches files, web pages and bookmarks in SQLite and composes the enabled
//! ones into a single context document for LLM tools.
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `context-vacuum init` | Create the database and schema |
//! | `context-vacuum add <path\|url> --name N` | Cache a file, directory or URL |
//! | `context-vacuum remove <name>` | Delete a cached source |
//! | `context-vacuum enable <name>` / `disable <name>` | Toggle participation |
//! | `context-vacuum list` | Show cached sources |
//! | `context-vacuum generate` | Refresh and compose enabled sources |
//! | `context-vacuum import-bookmarks <file>` | Import a bookmark export (disabled) |
//! | `context-vacuum preset save\|apply\|list\|delete` | Manage enabled-set snapshots |
//! | `context-vacuum history` | Show recent compositions |
//!
//! ## Examples
//!
//! ```bash
//! context-vacuum add ./src/lib.rs --name lib
//! context-vacuum add https://docs.rs/tokio --name tokio-docs
//! context-vacuum generate --format cursor --output .cursorrules
//! context-vacuum preset save backend && context-vacuum generate --preset backend
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use context_vacuum::{bookmarks, config, db, generate, history, logging, presets, sources};

/// Context Vacuum: a local cache of files, pages and bookmarks, composed on
/// demand into LLM context documents.
#[derive(Parser)]
#[command(name = "context-vacuum", version, about)]
struct Cli {
    /// Path to configuration file (TOML). A missing file means defaults.
    #[arg(long, global = true, env = "CONTEXT_VACUUM_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error). `RUST_LOG` takes precedence.
    #[arg(long, global = true, env = "LOG_LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the SQLite database and run schema migrations.
    ///
    /// Every other command does this on demand; running it twice is safe.
    Init,

    /// Cache a file, a directory, or an http(s) URL.
    ///
    /// Re-adding an existing name updates that source in place. A
    /// directory adds every non-excluded file as `<name>/<relative path>`.
    Add {
        /// File path, directory, or URL.
        locator: String,

        /// Friendly name for the source.
        #[arg(long)]
        name: String,

        /// Store the source without enabling it for generation.
        #[arg(long)]
        disabled: bool,
    },

    /// Remove a cached source.
    Remove { name: String },

    /// Include a source in generated context.
    #[command(alias = "toggle-on")]
    Enable { name: String },

    /// Exclude a source from generated context.
    #[command(alias = "toggle-off")]
    Disable { name: String },

    /// List cached sources.
    List {
        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,
    },

    /// Refresh enabled sources and compose them into one document.
    Generate {
        /// Output file (default: stdout; `-` also means stdout).
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Output format: claude, cursor, or plain (default from config).
        #[arg(long, short)]
        format: Option<String>,

        /// Apply this preset first and record it in history.
        #[arg(long)]
        preset: Option<String>,
    },

    /// Import a browser bookmark export; imported sources start disabled.
    ImportBookmarks { file: PathBuf },

    /// Manage presets (named sets of enabled sources).
    Preset {
        #[command(subcommand)]
        action: PresetAction,
    },

    /// Show recent compositions, newest first.
    History {
        /// Maximum number of entries.
        #[arg(long, default_value = "20")]
        limit: usize,

        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum PresetAction {
    /// Save the currently enabled sources under a name.
    Save {
        name: String,

        #[arg(long)]
        description: Option<String>,
    },
    /// Enable exactly the preset's sources and disable the rest.
    Apply { name: String },
    /// List saved presets.
    List {
        #[arg(long)]
        json: bool,
    },
    /// Delete a preset. Its sources are left untouched.
    Delete { name: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.unwrap_or_else(config::default_config_path);
    let cfg = config::load_config(&config_path)?;
    logging::init(cli.log_level.as_deref().unwrap_or(&cfg.logging.level))?;
    if !config_path.exists() {
        tracing::debug!(path = %config_path.display(), "config file not found, using defaults");
    }

    match cli.command {
        Commands::Init => {
            let pool = db::connect(&cfg).await?;
            pool.close().await;
            println!("Database initialized: {}", cfg.db.path.display());
        }
        Commands::Add {
            locator,
            name,
            disabled,
        } => {
            sources::run_add(&cfg, &locator, &name, disabled).await?;
        }
        Commands::Remove { name } => {
            sources::run_remove(&cfg, &name).await?;
        }
        Commands::Enable { name } => {
            sources::run_set_enabled(&cfg, &name, true).await?;
        }
        Commands::Disable { name } => {
            sources::run_set_enabled(&cfg, &name, false).await?;
        }
        Commands::List { json } => {
            sources::run_list(&cfg, json).await?;
        }
        Commands::Generate {
            output,
            format,
            preset,
        } => {
            generate::run_generate(
                &cfg,
                generate::GenerateArgs {
                    output,
                    format,
                    preset,
                },
            )
            .await?;
        }
        Commands::ImportBookmarks { file } => {
            bookmarks::run_import_bookmarks(&cfg, &file).await?;
        }
        Commands::Preset { action } => match action {
            PresetAction::Save { name, description } => {
                presets::run_save(&cfg, &name, description.as_deref()).await?;
            }
            PresetAction::Apply { name } => {
                presets::run_apply(&cfg, &name).await?;
            }
            PresetAction::List { json } => {
                presets::run_list(&cfg, json).await?;
            }
            PresetAction::Delete { name } => {
                presets::run_delete(&cfg, &name).await?;
            }
        },
        Commands::History { limit, json } => {
            history::run_history(&cfg, limit, json).await?;
        }
    }

    Ok(())
}
