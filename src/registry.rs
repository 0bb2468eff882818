//! Immutable schema registry: extensions, enum types, backup tables, model
//! descriptors, and seed factories, all in registration order.

use crate::error::RegistryError;
use crate::model::ModelDescriptor;
use crate::seed::SeedFactory;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

/// A PostgreSQL enumerated type declared by the registry.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EnumDef {
    pub name: String,
    pub values: Vec<String>,
}

impl EnumDef {
    pub fn new(name: impl Into<String>, values: impl IntoIterator<Item = impl Into<String>>) -> Self {
        EnumDef {
            name: name.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Idempotent create. PostgreSQL has no `CREATE TYPE IF NOT EXISTS`, so
    /// the statement is wrapped in a duplicate_object guard.
    pub fn create_query(&self) -> String {
        let values: Vec<String> = self.values.iter().map(|v| quote_literal(v)).collect();
        format!(
            "DO $$ BEGIN CREATE TYPE {} AS ENUM ({}); EXCEPTION WHEN duplicate_object THEN NULL; END $$",
            self.name,
            values.join(", ")
        )
    }

    pub fn drop_query(&self) -> String {
        format!("DROP TYPE IF EXISTS {}", self.name)
    }
}

fn quote_literal(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

/// Immutable descriptor of every schema object a deployment manages.
/// Built once via [`RegistryBuilder`]; read accessors only afterwards.
pub struct SchemaRegistry {
    extensions: Vec<String>,
    enums: Vec<EnumDef>,
    tables: Vec<String>,
    models: Vec<ModelDescriptor>,
    seeders: Vec<Arc<dyn SeedFactory>>,
}

impl std::fmt::Debug for SchemaRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaRegistry")
            .field("extensions", &self.extensions)
            .field("enums", &self.enums)
            .field("tables", &self.tables)
            .field("models", &self.models)
            .field("seeders", &self.seeders.len())
            .finish()
    }
}

impl SchemaRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// Extension names, created idempotently in registration order.
    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    pub fn enums(&self) -> &[EnumDef] {
        &self.enums
    }

    /// Backup target tables, exported in registration order.
    pub fn tables(&self) -> &[String] {
        &self.tables
    }

    pub fn models(&self) -> &[ModelDescriptor] {
        &self.models
    }

    pub fn seeders(&self) -> &[Arc<dyn SeedFactory>] {
        &self.seeders
    }
}

#[derive(Default)]
pub struct RegistryBuilder {
    extensions: Vec<String>,
    enums: Vec<EnumDef>,
    tables: Vec<String>,
    models: Vec<ModelDescriptor>,
    seeders: Vec<Arc<dyn SeedFactory>>,
}

impl RegistryBuilder {
    pub fn extension(mut self, name: impl Into<String>) -> Self {
        self.extensions.push(name.into());
        self
    }

    pub fn enum_type(mut self, def: EnumDef) -> Self {
        self.enums.push(def);
        self
    }

    pub fn table(mut self, name: impl Into<String>) -> Self {
        self.tables.push(name.into());
        self
    }

    pub fn model(mut self, model: ModelDescriptor) -> Self {
        self.models.push(model);
        self
    }

    pub fn seeder(mut self, seeder: Arc<dyn SeedFactory>) -> Self {
        self.seeders.push(seeder);
        self
    }

    /// Validate and freeze. Names are allow-listed here so no registry value
    /// reaches DDL unchecked; enum value lists must be non-empty with no
    /// empty strings and no duplicates.
    pub fn build(self) -> Result<SchemaRegistry, RegistryError> {
        validate(&self)?;
        Ok(SchemaRegistry {
            extensions: self.extensions,
            enums: self.enums,
            tables: self.tables,
            models: self.models,
            seeders: self.seeders,
        })
    }
}

fn validate(b: &RegistryBuilder) -> Result<(), RegistryError> {
    // Extension names may carry hyphens (uuid-ossp); enum type and table
    // names are plain identifiers.
    let ident = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("static pattern");
    let ext_name = Regex::new(r"^[A-Za-z_][A-Za-z0-9_-]*$").expect("static pattern");

    for ext in &b.extensions {
        if !ext_name.is_match(ext) {
            return Err(RegistryError::InvalidIdentifier {
                kind: "extension",
                name: ext.clone(),
            });
        }
    }
    for table in &b.tables {
        if !ident.is_match(table) {
            return Err(RegistryError::InvalidIdentifier {
                kind: "table",
                name: table.clone(),
            });
        }
    }

    let mut seen: HashSet<&str> = HashSet::new();
    for e in &b.enums {
        if !ident.is_match(&e.name) {
            return Err(RegistryError::InvalidIdentifier {
                kind: "enum",
                name: e.name.clone(),
            });
        }
        if !seen.insert(e.name.as_str()) {
            return Err(RegistryError::DuplicateEnum(e.name.clone()));
        }
        if e.values.is_empty() {
            return Err(RegistryError::InvalidEnum {
                name: e.name.clone(),
                reason: "value list is empty".into(),
            });
        }
        let mut values: HashSet<&str> = HashSet::new();
        for v in &e.values {
            if v.is_empty() {
                return Err(RegistryError::InvalidEnum {
                    name: e.name.clone(),
                    reason: "empty value".into(),
                });
            }
            if !values.insert(v.as_str()) {
                return Err(RegistryError::InvalidEnum {
                    name: e.name.clone(),
                    reason: format!("duplicate value '{}'", v),
                });
            }
        }
    }
    Ok(())
}
