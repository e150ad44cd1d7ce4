//! SQLite-backed [`SourceStore`] and [`HistoryRecorder`].
//!
//! Each trait method is a single statement against the `sources` or
//! `history` table, so every write is atomic on its own.

use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use context_vacuum_core::models::{
    CachedContent, CompositionRecord, NewSource, Source, SourceKind,
};
use context_vacuum_core::store::{HistoryRecorder, SourceStore};
use context_vacuum_core::{Error, Result};

const SOURCE_COLUMNS: &str =
    "id, name, source_type, path, content, hash, enabled, created_at, updated_at";

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn now_ts() -> i64 {
    chrono::Utc::now().timestamp()
}

fn storage(context: &'static str) -> impl FnOnce(sqlx::Error) -> Error {
    move |e| Error::storage(context, e)
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .map(|db| db.is_unique_violation())
        .unwrap_or(false)
}

fn source_from_row(row: &SqliteRow) -> Source {
    let kind: String = row.get("source_type");
    Source {
        id: row.get("id"),
        name: row.get("name"),
        kind: SourceKind::parse(&kind),
        locator: row.get("path"),
        cached: CachedContent::from_stored(row.get("content"), row.get("hash")),
        enabled: row.get("enabled"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn record_from_row(row: &SqliteRow) -> CompositionRecord {
    CompositionRecord {
        id: row.get("id"),
        label: row.get("preset_name"),
        destination: row.get("output_path"),
        source_count: row.get("source_count"),
        generated_at: row.get("generated_at"),
    }
}

#[async_trait]
impl SourceStore for SqliteStore {
    async fn create(&self, new: NewSource) -> Result<Source> {
        let now = now_ts();
        let result = sqlx::query(
            r#"
            INSERT INTO sources (name, source_type, path, content, hash, enabled, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&new.name)
        .bind(new.kind.as_str())
        .bind(&new.locator)
        .bind(new.cached.content())
        .bind(new.cached.fingerprint())
        .bind(new.enabled)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await;

        let result = match result {
            Ok(result) => result,
            Err(e) if is_unique_violation(&e) => return Err(Error::DuplicateName(new.name)),
            Err(e) => return Err(Error::storage("insert source", e)),
        };

        Ok(Source {
            id: result.last_insert_rowid(),
            name: new.name,
            kind: new.kind,
            locator: new.locator,
            cached: new.cached,
            enabled: new.enabled,
            created_at: now,
            updated_at: now,
        })
    }

    async fn get_by_name(&self, name: &str) -> Result<Source> {
        let row = sqlx::query(&format!("SELECT {} FROM sources WHERE name = ?", SOURCE_COLUMNS))
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage("select source"))?;

        row.as_ref()
            .map(source_from_row)
            .ok_or_else(|| Error::NotFound(format!("source '{}'", name)))
    }

    async fn find_by_fingerprint(&self, fingerprint: &str) -> Result<Option<Source>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM sources WHERE hash = ? ORDER BY id LIMIT 1",
            SOURCE_COLUMNS
        ))
        .bind(fingerprint)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage("select source by hash"))?;

        Ok(row.as_ref().map(source_from_row))
    }

    async fn list(&self) -> Result<Vec<Source>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM sources ORDER BY created_at ASC, id ASC",
            SOURCE_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(storage("list sources"))?;

        Ok(rows.iter().map(source_from_row).collect())
    }

    async fn list_enabled(&self) -> Result<Vec<Source>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM sources WHERE enabled = 1 ORDER BY created_at ASC, id ASC",
            SOURCE_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(storage("list enabled sources"))?;

        Ok(rows.iter().map(source_from_row).collect())
    }

    async fn update_content(&self, id: i64, cached: &CachedContent) -> Result<()> {
        let result =
            sqlx::query("UPDATE sources SET content = ?, hash = ?, updated_at = ? WHERE id = ?")
                .bind(cached.content())
                .bind(cached.fingerprint())
                .bind(now_ts())
                .bind(id)
                .execute(&self.pool)
                .await
                .map_err(storage("update source content"))?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("source id {}", id)));
        }
        Ok(())
    }

    async fn update_locator(&self, id: i64, locator: &str) -> Result<()> {
        let result = sqlx::query("UPDATE sources SET path = ? WHERE id = ?")
            .bind(locator)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(storage("update source path"))?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("source id {}", id)));
        }
        Ok(())
    }

    async fn set_enabled(&self, name: &str, enabled: bool) -> Result<()> {
        let result = sqlx::query(
            "UPDATE sources SET enabled = ?, \
             updated_at = CASE WHEN enabled <> ? THEN ? ELSE updated_at END \
             WHERE name = ?",
        )
        .bind(enabled)
        .bind(enabled)
        .bind(now_ts())
        .bind(name)
        .execute(&self.pool)
        .await
        .map_err(storage("toggle source"))?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("source '{}'", name)));
        }
        Ok(())
    }

    async fn delete(&self, name: &str) -> Result<()> {
        let result = sqlx::query("DELETE FROM sources WHERE name = ?")
            .bind(name)
            .execute(&self.pool)
            .await
            .map_err(storage("delete source"))?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("source '{}'", name)));
        }
        Ok(())
    }
}

#[async_trait]
impl HistoryRecorder for SqliteStore {
    async fn record(
        &self,
        label: Option<&str>,
        destination: &str,
        source_count: usize,
    ) -> Result<CompositionRecord> {
        let generated_at = now_ts();
        let source_count = source_count as i64;
        let result = sqlx::query(
            "INSERT INTO history (preset_name, output_path, source_count, generated_at) VALUES (?, ?, ?, ?)",
        )
        .bind(label)
        .bind(destination)
        .bind(source_count)
        .bind(generated_at)
        .execute(&self.pool)
        .await
        .map_err(storage("insert history"))?;

        Ok(CompositionRecord {
            id: result.last_insert_rowid(),
            label: label.map(str::to_string),
            destination: destination.to_string(),
            source_count,
            generated_at,
        })
    }

    async fn recent(&self, limit: usize) -> Result<Vec<CompositionRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT id, preset_name, output_path, source_count, generated_at
            FROM history
            ORDER BY generated_at DESC, id DESC
            LIMIT ?
            "#,
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(storage("list history"))?;

        Ok(rows.iter().map(record_from_row).collect())
    }
}
