//! Apply the registry to a live database: extensions, enum types, and model
//! DDL inside one transaction, with a destructive fresh-reset mode.

use crate::error::MigrateError;
use crate::model::ModelDescriptor;
use crate::registry::{EnumDef, SchemaRegistry};
use sqlx::{PgPool, Postgres, Transaction};
use std::sync::Arc;

pub struct MigrationEngine {
    pool: PgPool,
    registry: Arc<SchemaRegistry>,
}

impl MigrationEngine {
    pub fn new(pool: PgPool, registry: Arc<SchemaRegistry>) -> Self {
        MigrationEngine { pool, registry }
    }

    /// Apply the registry. `fresh` first drops every live table and every
    /// declared enum type; destructive, only on explicit request.
    ///
    /// The whole apply runs in one transaction: either every declared object
    /// exists consistently with the registry afterwards, or the schema is
    /// left exactly as it was. The sqlx transaction rolls back on drop, so
    /// every exit path (error return, panic) releases cleanly.
    pub async fn migrate(&self, fresh: bool) -> Result<(), MigrateError> {
        tracing::info!(fresh, "starting database migration");

        let mut tx = self.pool.begin().await.map_err(MigrateError::Transaction)?;

        if fresh {
            drop_all(&mut tx, &self.registry).await?;
        }

        create_extensions(&mut tx, self.registry.extensions()).await?;
        create_enums(&mut tx, self.registry.enums()).await?;
        apply_models(&mut tx, self.registry.models()).await?;

        tx.commit().await.map_err(MigrateError::Transaction)?;

        if !fresh {
            // Best-effort and additive only; runs on autocommit connections
            // after the commit (see reconcile module).
            crate::reconcile::reconcile_enums(&self.pool, self.registry.enums()).await;
        }

        tracing::info!("database migration completed");
        Ok(())
    }

    /// Run every registered seed factory in order. A failing factory is
    /// logged and skipped; later factories still run.
    pub async fn seed(&self) {
        tracing::info!("starting database seeding");
        for factory in self.registry.seeders() {
            if let Err(e) = factory.seed(&self.pool).await {
                tracing::error!(factory = factory.name(), error = %e, "seed factory failed");
            }
        }
        tracing::info!("database seeding completed");
    }
}

/// Fresh reset: truncate and drop every table in the current schema, then
/// drop the declared enum types. Live tables are listed from the catalog, so
/// tables the registry no longer declares are removed too.
async fn drop_all(
    tx: &mut Transaction<'_, Postgres>,
    registry: &SchemaRegistry,
) -> Result<(), MigrateError> {
    let tables: Vec<String> = sqlx::query_scalar(
        "SELECT tablename FROM pg_catalog.pg_tables WHERE schemaname = current_schema()",
    )
    .fetch_all(&mut **tx)
    .await?;

    if !tables.is_empty() {
        let joined = tables.iter().map(|t| quote(t)).collect::<Vec<_>>().join(", ");
        let truncate = format!("TRUNCATE {} CASCADE", joined);
        tracing::debug!(sql = %truncate, "ddl");
        sqlx::query(&truncate).execute(&mut **tx).await?;

        for t in &tables {
            sqlx::query(&format!("DROP TABLE IF EXISTS {} CASCADE", quote(t)))
                .execute(&mut **tx)
                .await
                .map_err(|e| MigrateError::SchemaApply {
                    kind: "table",
                    name: t.clone(),
                    source: e,
                })?;
        }
    }

    for e in registry.enums() {
        sqlx::query(&e.drop_query())
            .execute(&mut **tx)
            .await
            .map_err(|err| MigrateError::SchemaApply {
                kind: "enum",
                name: e.name.clone(),
                source: err,
            })?;
    }

    Ok(())
}

async fn create_extensions(
    tx: &mut Transaction<'_, Postgres>,
    extensions: &[String],
) -> Result<(), MigrateError> {
    for name in extensions {
        let sql = format!("CREATE EXTENSION IF NOT EXISTS {}", quote(name));
        tracing::debug!(sql = %sql, "ddl");
        sqlx::query(&sql)
            .execute(&mut **tx)
            .await
            .map_err(|e| MigrateError::SchemaApply {
                kind: "extension",
                name: name.clone(),
                source: e,
            })?;
    }
    Ok(())
}

async fn create_enums(
    tx: &mut Transaction<'_, Postgres>,
    enums: &[EnumDef],
) -> Result<(), MigrateError> {
    for e in enums {
        let sql = e.create_query();
        tracing::debug!(sql = %sql, "ddl");
        sqlx::query(&sql)
            .execute(&mut **tx)
            .await
            .map_err(|err| MigrateError::SchemaApply {
                kind: "enum",
                name: e.name.clone(),
                source: err,
            })?;
    }
    Ok(())
}

/// Strictly additive: create missing tables, then missing columns, then
/// missing indexes, per descriptor in registration order.
async fn apply_models(
    tx: &mut Transaction<'_, Postgres>,
    models: &[ModelDescriptor],
) -> Result<(), MigrateError> {
    for m in models {
        let create = m.create_table_query();
        tracing::debug!(sql = %create, "ddl");
        sqlx::query(&create)
            .execute(&mut **tx)
            .await
            .map_err(|e| MigrateError::SchemaApply {
                kind: "table",
                name: m.table.clone(),
                source: e,
            })?;

        for sql in m.add_column_queries().iter().chain(m.create_index_queries().iter()) {
            tracing::debug!(sql = %sql, "ddl");
            sqlx::query(sql)
                .execute(&mut **tx)
                .await
                .map_err(|e| MigrateError::SchemaApply {
                    kind: "table",
                    name: m.table.clone(),
                    source: e,
                })?;
        }
    }
    Ok(())
}

/// Quote identifier for PostgreSQL (safe: only from the registry or the
/// catalog listing).
fn quote(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}
