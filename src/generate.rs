//! `generate`: refresh enabled sources and compose them into one document.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};

use context_vacuum_core::diagnostics::TracingSink;
use context_vacuum_core::generate::{Destination, GenerateRequest, Generated, Generator};

use crate::config::Config;
use crate::db;
use crate::fetcher::HttpFetcher;
use crate::presets;
use crate::sqlite_store::SqliteStore;

pub struct GenerateArgs {
    /// `None` or `-` writes to stdout.
    pub output: Option<PathBuf>,
    pub format: Option<String>,
    pub preset: Option<String>,
}

fn destination(output: Option<&Path>) -> Result<Destination> {
    match output {
        None => Ok(Destination::Stdout),
        Some(path) if path == Path::new("-") => Ok(Destination::Stdout),
        Some(path) if path.is_absolute() => Ok(Destination::File(path.to_path_buf())),
        Some(path) => {
            let cwd = std::env::current_dir().context("Failed to resolve current directory")?;
            Ok(Destination::File(cwd.join(path)))
        }
    }
}

pub async fn generate(config: &Config, args: GenerateArgs) -> Result<Generated> {
    let formats = config.format_registry()?;
    let format = formats
        .resolve(args.format.as_deref(), &TracingSink)?
        .name()
        .to_string();
    let pool = db::connect(config).await?;

    if let Some(preset) = &args.preset {
        presets::apply(&pool, preset).await?;
    }

    let store = Arc::new(SqliteStore::new(pool.clone()));
    let fetcher = Arc::new(HttpFetcher::from_config(&config.fetch)?);
    let generator = Generator::new(store.clone(), fetcher, store, Arc::new(TracingSink))
        .with_formats(formats)
        .with_concurrency(config.fetch.concurrency);

    let request = GenerateRequest {
        format: Some(format),
        label: args.preset,
        destination: destination(args.output.as_deref())?,
    };
    let generated = generator.generate(request).await;
    pool.close().await;
    Ok(generated?)
}

pub async fn run_generate(config: &Config, args: GenerateArgs) -> Result<()> {
    let dest = destination(args.output.as_deref())?;
    let generated = generate(config, args)
        .await
        .context("Failed to generate context")?;

    match dest {
        Destination::Stdout => {
            print!("{}", generated.text);
            if !generated.text.ends_with('\n') {
                println!();
            }
        }
        Destination::File(path) => eprintln!("Context generated: {}", path.display()),
    }

    if generated.fell_back > 0 || !generated.skipped.is_empty() {
        eprintln!(
            "{} source(s) used cached content, {} skipped",
            generated.fell_back,
            generated.skipped.len()
        );
    }
    Ok(())
}
