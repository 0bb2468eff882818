//! Additive enum-value reconciliation: align live enum types with the
//! declared value lists. Never removes a value.

use crate::registry::EnumDef;
use sqlx::PgPool;

/// For each declared value missing from the live type (registration order,
/// value order), issue one `ALTER TYPE ... ADD VALUE`.
///
/// Runs on autocommit connections, outside the migration transaction: a
/// failed statement inside one PostgreSQL transaction aborts the whole
/// transaction, and `ADD VALUE` cannot always run in a transaction block.
/// A failed check or alter is logged and the next value is tried; a
/// partially reconciled enum is an accepted, logged outcome.
pub async fn reconcile_enums(pool: &PgPool, enums: &[EnumDef]) {
    for e in enums {
        ensure_enum_values(pool, &e.name, &e.values).await;
    }
}

async fn ensure_enum_values(pool: &PgPool, name: &str, values: &[String]) {
    for value in values {
        let label = sanitize_label(value);

        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM pg_enum WHERE enumlabel = $1 AND enumtypid = $2::regtype)",
        )
        .bind(&label)
        .bind(name)
        .fetch_one(pool)
        .await;

        match exists {
            Err(e) => {
                tracing::warn!(enum_type = name, value = %label, error = %e, "enum value check failed");
            }
            Ok(true) => {}
            Ok(false) => {
                let stmt = add_value_query(name, &label);
                tracing::debug!(sql = %stmt, "ddl");
                if let Err(e) = sqlx::query(&stmt).execute(pool).await {
                    tracing::warn!(enum_type = name, value = %label, error = %e, "adding enum value failed");
                }
            }
        }
    }
}

/// Strip single quotes before the label reaches DDL. Minimal mitigation, not
/// full escaping; registry names are already allow-listed at build time.
fn sanitize_label(value: &str) -> String {
    value.replace('\'', "")
}

fn add_value_query(name: &str, label: &str) -> String {
    format!("ALTER TYPE {} ADD VALUE '{}'", name, label)
}
