//! `history`: recent compositions, newest first.

use anyhow::{Context, Result};

use context_vacuum_core::models::CompositionRecord;
use context_vacuum_core::store::HistoryRecorder;

use crate::config::Config;
use crate::db;
use crate::sqlite_store::SqliteStore;

fn format_ts(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%dT%H:%M:%SZ").to_string())
        .unwrap_or_else(|| ts.to_string())
}

pub fn render_table(records: &[CompositionRecord]) -> String {
    let mut out = format!(
        "{:<5} {:<20} {:<16} {:<7} OUTPUT\n",
        "ID", "GENERATED", "PRESET", "SOURCES"
    );
    out.push_str(&"-".repeat(80));
    out.push('\n');
    for record in records {
        out.push_str(&format!(
            "{:<5} {:<20} {:<16} {:<7} {}\n",
            record.id,
            format_ts(record.generated_at),
            record.label.as_deref().unwrap_or("-"),
            record.source_count,
            record.destination,
        ));
    }
    out
}

pub async fn run_history(config: &Config, limit: usize, json: bool) -> Result<()> {
    let pool = db::connect(config).await?;
    let store = SqliteStore::new(pool.clone());
    let records = store.recent(limit).await;
    pool.close().await;
    let records = records.context("Failed to read history")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&records)?);
    } else if records.is_empty() {
        println!("No history yet");
    } else {
        print!("{}", render_table(&records));
    }
    Ok(())
}
