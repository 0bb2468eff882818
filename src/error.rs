//! Typed errors for registry construction, migration, and backup export.

use std::path::PathBuf;
use thiserror::Error;

/// Rejections raised while building a [`crate::SchemaRegistry`].
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("enum '{name}': {reason}")]
    InvalidEnum { name: String, reason: String },
    #[error("duplicate enum type '{0}'")]
    DuplicateEnum(String),
    #[error("invalid {kind} name '{name}'")]
    InvalidIdentifier { kind: &'static str, name: String },
}

/// Failures inside a `migrate` call. Everything here rolls the migration
/// transaction back; enum reconciliation failures are logged warnings, not
/// members of this enum.
#[derive(Error, Debug)]
pub enum MigrateError {
    #[error("transaction: {0}")]
    Transaction(#[source] sqlx::Error),
    #[error("apply {kind} '{name}': {source}")]
    SchemaApply {
        kind: &'static str,
        name: String,
        #[source]
        source: sqlx::Error,
    },
    #[error("database: {0}")]
    Db(#[from] sqlx::Error),
}

/// Failures during backup export. The first one aborts the remaining tables
/// of the run; files already written stay on disk.
#[derive(Error, Debug)]
pub enum BackupError {
    #[error("create output directory '{}': {}", path.display(), source)]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("query table '{table}': {source}")]
    Query {
        table: String,
        #[source]
        source: sqlx::Error,
    },
    #[error("table '{table}': columns '{first}' and '{second}' both map to key '{key}'")]
    KeyCollision {
        table: String,
        first: String,
        second: String,
        key: String,
    },
    #[error("encode table '{table}': {source}")]
    Encode {
        table: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("write '{}': {}", path.display(), source)]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
