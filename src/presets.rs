//! Presets: named snapshots of which sources are enabled.
//!
//! `save` records the currently enabled sources under a name; `apply`
//! enables exactly those sources and disables every other one in a single
//! transaction. Membership rows disappear with their source.

use anyhow::{bail, Context, Result};
use serde::Serialize;
use sqlx::{Row, SqlitePool};

use crate::config::Config;
use crate::db;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Preset {
    pub name: String,
    pub description: Option<String>,
    /// Member source names in composition order.
    pub members: Vec<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Number of sources whose enabled flag changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Applied {
    pub enabled: u64,
    pub disabled: u64,
}

fn now_ts() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Snapshot the enabled sources under `name`, replacing any preset of
/// that name.
pub async fn save(pool: &SqlitePool, name: &str, description: Option<&str>) -> Result<Preset> {
    let now = now_ts();
    let mut tx = pool.begin().await?;

    let id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO presets (name, description, created_at, updated_at)
        VALUES (?, ?, ?, ?)
        ON CONFLICT(name) DO UPDATE SET
            description = excluded.description,
            updated_at = excluded.updated_at
        RETURNING id
        "#,
    )
    .bind(name)
    .bind(description)
    .bind(now)
    .bind(now)
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query("DELETE FROM preset_sources WHERE preset_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    sqlx::query(
        "INSERT INTO preset_sources (preset_id, source_id) SELECT ?, id FROM sources WHERE enabled = 1",
    )
    .bind(id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    get(pool, name).await
}

pub async fn get(pool: &SqlitePool, name: &str) -> Result<Preset> {
    let row = sqlx::query(
        "SELECT id, name, description, created_at, updated_at FROM presets WHERE name = ?",
    )
    .bind(name)
    .fetch_optional(pool)
    .await?;

    let row = match row {
        Some(row) => row,
        None => bail!("preset not found: {}", name),
    };
    let id: i64 = row.get("id");

    Ok(Preset {
        name: row.get("name"),
        description: row.get("description"),
        members: members(pool, id).await?,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

async fn members(pool: &SqlitePool, preset_id: i64) -> Result<Vec<String>> {
    let names: Vec<String> = sqlx::query_scalar(
        r#"
        SELECT s.name FROM preset_sources ps
        JOIN sources s ON s.id = ps.source_id
        WHERE ps.preset_id = ?
        ORDER BY s.created_at ASC, s.id ASC
        "#,
    )
    .bind(preset_id)
    .fetch_all(pool)
    .await?;
    Ok(names)
}

/// Enable exactly the preset's members. `updated_at` moves only on rows
/// whose flag actually changes.
pub async fn apply(pool: &SqlitePool, name: &str) -> Result<Applied> {
    let now = now_ts();
    let mut tx = pool.begin().await?;

    let id: Option<i64> = sqlx::query_scalar("SELECT id FROM presets WHERE name = ?")
        .bind(name)
        .fetch_optional(&mut *tx)
        .await?;
    let id = match id {
        Some(id) => id,
        None => bail!("preset not found: {}", name),
    };

    let enabled = sqlx::query(
        r#"
        UPDATE sources SET enabled = 1, updated_at = ?
        WHERE enabled = 0
          AND id IN (SELECT source_id FROM preset_sources WHERE preset_id = ?)
        "#,
    )
    .bind(now)
    .bind(id)
    .execute(&mut *tx)
    .await?
    .rows_affected();

    let disabled = sqlx::query(
        r#"
        UPDATE sources SET enabled = 0, updated_at = ?
        WHERE enabled = 1
          AND id NOT IN (SELECT source_id FROM preset_sources WHERE preset_id = ?)
        "#,
    )
    .bind(now)
    .bind(id)
    .execute(&mut *tx)
    .await?
    .rows_affected();

    tx.commit().await?;

    tracing::info!(preset = %name, enabled, disabled, "preset applied");
    Ok(Applied { enabled, disabled })
}

pub async fn list(pool: &SqlitePool) -> Result<Vec<Preset>> {
    let names: Vec<String> = sqlx::query_scalar("SELECT name FROM presets ORDER BY name ASC")
        .fetch_all(pool)
        .await?;

    let mut presets = Vec::with_capacity(names.len());
    for name in names {
        presets.push(get(pool, &name).await?);
    }
    Ok(presets)
}

pub async fn delete(pool: &SqlitePool, name: &str) -> Result<()> {
    let result = sqlx::query("DELETE FROM presets WHERE name = ?")
        .bind(name)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        bail!("preset not found: {}", name);
    }
    Ok(())
}

pub async fn run_save(config: &Config, name: &str, description: Option<&str>) -> Result<()> {
    let pool = db::connect(config).await?;
    let preset = save(&pool, name, description).await;
    pool.close().await;
    let preset = preset.with_context(|| format!("Failed to save preset '{}'", name))?;

    println!(
        "Saved preset: {} ({} sources)",
        preset.name,
        preset.members.len()
    );
    Ok(())
}

pub async fn run_apply(config: &Config, name: &str) -> Result<()> {
    let pool = db::connect(config).await?;
    let applied = apply(&pool, name).await;
    pool.close().await;
    let applied = applied.with_context(|| format!("Failed to apply preset '{}'", name))?;

    println!(
        "Applied preset: {} ({} enabled, {} disabled)",
        name, applied.enabled, applied.disabled
    );
    Ok(())
}

pub async fn run_list(config: &Config, json: bool) -> Result<()> {
    let pool = db::connect(config).await?;
    let presets = list(&pool).await;
    pool.close().await;
    let presets = presets.context("Failed to list presets")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&presets)?);
        return Ok(());
    }
    if presets.is_empty() {
        println!("No presets found");
        return Ok(());
    }

    println!("{:<20} {:<8} DESCRIPTION", "NAME", "SOURCES");
    println!("{}", "-".repeat(60));
    for preset in &presets {
        println!(
            "{:<20} {:<8} {}",
            preset.name,
            preset.members.len(),
            preset.description.as_deref().unwrap_or("")
        );
    }
    Ok(())
}

pub async fn run_delete(config: &Config, name: &str) -> Result<()> {
    let pool = db::connect(config).await?;
    let result = delete(&pool, name).await;
    pool.close().await;
    result.with_context(|| format!("Failed to delete preset '{}'", name))?;

    println!("Deleted preset: {}", name);
    Ok(())
}
