//! Per-table JSON snapshots of the registered tables.
//!
//! Each run shares one minute-resolution timestamp. Tables are exported
//! independently, not at a single consistent point in time, and files
//! written before a failure stay on disk.

use crate::case::row_keys_to_camel_case;
use crate::error::BackupError;
use crate::registry::SchemaRegistry;
use chrono::Local;
use serde_json::{Map, Value};
use sqlx::postgres::PgRow;
use sqlx::PgPool;
use std::path::Path;
use std::sync::Arc;

pub struct BackupExporter {
    pool: PgPool,
    registry: Arc<SchemaRegistry>,
}

impl BackupExporter {
    pub fn new(pool: PgPool, registry: Arc<SchemaRegistry>) -> Self {
        BackupExporter { pool, registry }
    }

    /// Export every registered table, in registration order, as a
    /// pretty-printed JSON array under `output_dir` (created recursively).
    /// Stops at the first failure.
    pub async fn backup(&self, output_dir: impl AsRef<Path>) -> Result<(), BackupError> {
        let output_dir = output_dir.as_ref();
        tracing::info!(dir = %output_dir.display(), "starting database backup");

        tokio::fs::create_dir_all(output_dir)
            .await
            .map_err(|e| BackupError::OutputDir {
                path: output_dir.to_path_buf(),
                source: e,
            })?;

        // One timestamp for the whole run; a second run within the same
        // minute overwrites the first.
        let timestamp = Local::now().format("%Y%m%d%H%M").to_string();

        for table in self.registry.tables() {
            self.export_table(table, output_dir, &timestamp).await?;
        }

        tracing::info!("database backup completed");
        Ok(())
    }

    async fn export_table(
        &self,
        table: &str,
        output_dir: &Path,
        timestamp: &str,
    ) -> Result<(), BackupError> {
        let sql = format!("SELECT * FROM {}", quoted(table));
        tracing::debug!(sql = %sql, "query");
        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| BackupError::Query {
                table: table.to_string(),
                source: e,
            })?;

        let mut out = Vec::with_capacity(rows.len());
        for row in &rows {
            let obj = row_to_object(row);
            let transformed =
                row_keys_to_camel_case(obj).map_err(|c| BackupError::KeyCollision {
                    table: table.to_string(),
                    first: c.first,
                    second: c.second,
                    key: c.key,
                })?;
            out.push(Value::Object(transformed));
        }

        let mut json = serde_json::to_vec_pretty(&out).map_err(|e| BackupError::Encode {
            table: table.to_string(),
            source: e,
        })?;
        json.push(b'\n');

        let path = output_dir.join(backup_file_name(table, timestamp));
        tokio::fs::write(&path, json)
            .await
            .map_err(|e| BackupError::Write {
                path: path.clone(),
                source: e,
            })?;

        tracing::info!(table, path = %path.display(), rows = rows.len(), "table exported");
        Ok(())
    }
}

/// `backup_<table>_<YYYYMMDDHHMM>.json`
fn backup_file_name(table: &str, timestamp: &str) -> String {
    format!("backup_{}_{}.json", table, timestamp)
}

/// Quote identifier for PostgreSQL (safe: only from the registry).
fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

/// The column set is discovered from the row, not assumed; key order follows
/// the query result.
fn row_to_object(row: &PgRow) -> Map<String, Value> {
    use sqlx::{Column, Row};
    let mut map = Map::new();
    for col in row.columns() {
        let name = col.name();
        map.insert(name.to_string(), cell_to_value(row, name));
    }
    map
}

fn cell_to_value(row: &PgRow, name: &str) -> Value {
    use sqlx::Row;
    if let Ok(Some(n)) = row.try_get::<Option<i16>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<i32>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<i64>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<f32>, _>(name) {
        if let Some(n) = serde_json::Number::from_f64(n as f64) {
            return Value::Number(n);
        }
    }
    if let Ok(Some(n)) = row.try_get::<Option<f64>, _>(name) {
        if let Some(n) = serde_json::Number::from_f64(n) {
            return Value::Number(n);
        }
    }
    if let Ok(Some(b)) = row.try_get::<Option<bool>, _>(name) {
        return Value::Bool(b);
    }
    if let Ok(Some(u)) = row.try_get::<Option<uuid::Uuid>, _>(name) {
        return Value::String(u.to_string());
    }
    if let Ok(Some(d)) = row.try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(name) {
        return Value::String(d.to_rfc3339());
    }
    if let Ok(Some(d)) = row.try_get::<Option<chrono::NaiveDateTime>, _>(name) {
        return Value::String(d.format("%Y-%m-%dT%H:%M:%S%.f").to_string());
    }
    if let Ok(Some(d)) = row.try_get::<Option<chrono::NaiveDate>, _>(name) {
        return Value::String(d.format("%Y-%m-%d").to_string());
    }
    if let Ok(Some(s)) = row.try_get::<Option<String>, _>(name) {
        return Value::String(s);
    }
    if let Ok(Some(j)) = row.try_get::<Option<serde_json::Value>, _>(name) {
        return j;
    }
    Value::Null
}
