//! Declarative table descriptors and the additive DDL derived from them.
//!
//! Auto-migration never drops or narrows: a descriptor only ever produces
//! `CREATE ... IF NOT EXISTS` and `ADD COLUMN IF NOT EXISTS` statements.

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub type_: String,
    #[serde(default = "default_true")]
    pub nullable: bool,
    /// Raw DEFAULT expression, e.g. `NOW()` or `'pending'`.
    #[serde(default)]
    pub default: Option<String>,
}

fn default_true() -> bool {
    true
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IndexSpec {
    pub name: String,
    pub columns: Vec<String>,
    #[serde(default)]
    pub unique: bool,
}

/// One auto-migration target: a table shape the engine brings the live
/// database up to.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ModelDescriptor {
    pub table: String,
    pub columns: Vec<ColumnSpec>,
    #[serde(default)]
    pub primary_key: Vec<String>,
    #[serde(default)]
    pub indexes: Vec<IndexSpec>,
}

impl ColumnSpec {
    fn definition(&self) -> String {
        let mut def = format!("{} {}", quote(&self.name), self.type_);
        if !self.nullable {
            def.push_str(" NOT NULL");
        }
        if let Some(ref d) = self.default {
            def.push_str(" DEFAULT ");
            def.push_str(d);
        }
        def
    }
}

impl ModelDescriptor {
    /// CREATE TABLE IF NOT EXISTS with the full column list and primary key.
    pub fn create_table_query(&self) -> String {
        let mut defs: Vec<String> = self.columns.iter().map(ColumnSpec::definition).collect();
        if !self.primary_key.is_empty() {
            let cols: Vec<String> = self.primary_key.iter().map(|c| quote(c)).collect();
            defs.push(format!("PRIMARY KEY ({})", cols.join(", ")));
        }
        format!(
            "CREATE TABLE IF NOT EXISTS {} (\n  {}\n)",
            quote(&self.table),
            defs.join(",\n  ")
        )
    }

    /// One ADD COLUMN IF NOT EXISTS per column, so tables that predate a
    /// newly declared column pick it up.
    pub fn add_column_queries(&self) -> Vec<String> {
        self.columns
            .iter()
            .map(|c| {
                format!(
                    "ALTER TABLE {} ADD COLUMN IF NOT EXISTS {}",
                    quote(&self.table),
                    c.definition()
                )
            })
            .collect()
    }

    pub fn create_index_queries(&self) -> Vec<String> {
        self.indexes
            .iter()
            .map(|idx| {
                let cols: Vec<String> = idx.columns.iter().map(|c| quote(c)).collect();
                let unique = if idx.unique { "UNIQUE " } else { "" };
                format!(
                    "CREATE {}INDEX IF NOT EXISTS {} ON {} ({})",
                    unique,
                    quote(&idx.name),
                    quote(&self.table),
                    cols.join(", ")
                )
            })
            .collect()
    }
}

/// Quote identifier for PostgreSQL (safe: only from the registry).
fn quote(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}
