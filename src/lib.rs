//! Schemakit: registry-driven PostgreSQL schema migration and backup.
//!
//! A deployment declares its schema once (extensions, enum types, backup
//! tables, model descriptors, seed factories) in an immutable
//! [`SchemaRegistry`]. [`MigrationEngine`] applies the registry to a live
//! database inside one transaction, with a destructive fresh mode, and
//! [`BackupExporter`] writes per-table JSON snapshots of the registered
//! tables. The owning process connects once and passes the pool into both
//! constructors.

pub mod backup;
pub mod case;
pub mod error;
pub mod migration;
pub mod model;
pub mod reconcile;
pub mod registry;
pub mod seed;

pub use backup::BackupExporter;
pub use case::to_camel_case;
pub use error::{BackupError, MigrateError, RegistryError};
pub use migration::MigrationEngine;
pub use model::{ColumnSpec, IndexSpec, ModelDescriptor};
pub use registry::{EnumDef, RegistryBuilder, SchemaRegistry};
pub use seed::SeedFactory;
