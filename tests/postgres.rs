//! Live-database tests for migration, reconciliation, and backup.
//!
//! These need a reachable PostgreSQL and are destructive to the target
//! database (fresh mode drops every table), so they are ignored by default:
//!
//!   DATABASE_URL=postgres://localhost/schemakit_test \
//!     cargo test --test postgres -- --ignored --test-threads=1

use schemakit::{
    BackupExporter, ColumnSpec, EnumDef, MigrationEngine, ModelDescriptor, SchemaRegistry,
};
use sqlx::PgPool;
use std::sync::Arc;

async fn pool() -> PgPool {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for live tests");
    PgPool::connect(&url).await.expect("connect")
}

fn column(name: &str, type_: &str) -> ColumnSpec {
    ColumnSpec {
        name: name.into(),
        type_: type_.into(),
        nullable: true,
        default: None,
    }
}

fn simple_model(table: &str) -> ModelDescriptor {
    ModelDescriptor {
        table: table.into(),
        columns: vec![column("id", "BIGSERIAL"), column("user_name", "TEXT")],
        primary_key: vec!["id".into()],
        indexes: vec![],
    }
}

async fn table_exists(pool: &PgPool, table: &str) -> bool {
    sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS (SELECT 1 FROM pg_catalog.pg_tables WHERE schemaname = current_schema() AND tablename = $1)",
    )
    .bind(table)
    .fetch_one(pool)
    .await
    .unwrap()
}

async fn type_exists(pool: &PgPool, name: &str) -> bool {
    sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM pg_type WHERE typname = $1)")
        .bind(name)
        .fetch_one(pool)
        .await
        .unwrap()
}

async fn enum_labels(pool: &PgPool, name: &str) -> Vec<String> {
    sqlx::query_scalar::<_, String>(
        "SELECT enumlabel FROM pg_enum WHERE enumtypid = $1::regtype ORDER BY enumsortorder",
    )
    .bind(name)
    .fetch_all(pool)
    .await
    .unwrap()
}

#[tokio::test]
#[ignore = "requires PostgreSQL (set DATABASE_URL)"]
async fn migrate_twice_is_idempotent() {
    let pool = pool().await;
    sqlx::query("DROP TABLE IF EXISTS id_users CASCADE").execute(&pool).await.unwrap();
    sqlx::query("DROP TYPE IF EXISTS id_mood").execute(&pool).await.unwrap();

    let registry = Arc::new(
        SchemaRegistry::builder()
            .enum_type(EnumDef::new("id_mood", ["happy", "sad"]))
            .model(simple_model("id_users"))
            .build()
            .unwrap(),
    );
    let engine = MigrationEngine::new(pool.clone(), registry);

    engine.migrate(false).await.unwrap();
    engine.migrate(false).await.unwrap();

    assert!(table_exists(&pool, "id_users").await);
    assert_eq!(enum_labels(&pool, "id_mood").await, vec!["happy", "sad"]);
}

#[tokio::test]
#[ignore = "requires PostgreSQL (set DATABASE_URL)"]
async fn fresh_reset_leaves_only_the_declared_set() {
    let pool = pool().await;
    sqlx::query("CREATE TABLE IF NOT EXISTS fr_stray (id INT)")
        .execute(&pool)
        .await
        .unwrap();

    let registry = Arc::new(
        SchemaRegistry::builder()
            .enum_type(EnumDef::new("fr_mood", ["happy"]))
            .model(simple_model("fr_users"))
            .build()
            .unwrap(),
    );
    let engine = MigrationEngine::new(pool.clone(), registry);

    engine.migrate(true).await.unwrap();

    assert!(!table_exists(&pool, "fr_stray").await);
    assert!(table_exists(&pool, "fr_users").await);
    assert_eq!(enum_labels(&pool, "fr_mood").await, vec!["happy"]);
}

#[tokio::test]
#[ignore = "requires PostgreSQL (set DATABASE_URL)"]
async fn reconciliation_adds_only_the_missing_value() {
    let pool = pool().await;
    sqlx::query("DROP TYPE IF EXISTS rc_mood").execute(&pool).await.unwrap();

    let v1 = Arc::new(
        SchemaRegistry::builder()
            .enum_type(EnumDef::new("rc_mood", ["happy", "sad"]))
            .build()
            .unwrap(),
    );
    MigrationEngine::new(pool.clone(), v1).migrate(false).await.unwrap();

    let v2 = Arc::new(
        SchemaRegistry::builder()
            .enum_type(EnumDef::new("rc_mood", ["happy", "sad", "curious"]))
            .build()
            .unwrap(),
    );
    MigrationEngine::new(pool.clone(), v2).migrate(false).await.unwrap();

    // Existing values keep their positions; the new one lands at the end.
    assert_eq!(enum_labels(&pool, "rc_mood").await, vec!["happy", "sad", "curious"]);
}

#[tokio::test]
#[ignore = "requires PostgreSQL (set DATABASE_URL)"]
async fn failed_model_rolls_back_enums_in_the_same_call() {
    let pool = pool().await;
    sqlx::query("DROP TYPE IF EXISTS at_mood").execute(&pool).await.unwrap();
    sqlx::query("DROP TABLE IF EXISTS at_bad CASCADE").execute(&pool).await.unwrap();

    let bad_model = ModelDescriptor {
        table: "at_bad".into(),
        columns: vec![column("x", "no_such_type")],
        primary_key: vec![],
        indexes: vec![],
    };
    let registry = Arc::new(
        SchemaRegistry::builder()
            .enum_type(EnumDef::new("at_mood", ["happy"]))
            .model(bad_model)
            .build()
            .unwrap(),
    );

    let err = MigrationEngine::new(pool.clone(), registry).migrate(false).await;
    assert!(err.is_err());
    assert!(!type_exists(&pool, "at_mood").await);
    assert!(!table_exists(&pool, "at_bad").await);
}

#[tokio::test]
#[ignore = "requires PostgreSQL (set DATABASE_URL)"]
async fn backup_exports_camel_case_rows() {
    let pool = pool().await;
    sqlx::query("DROP TABLE IF EXISTS bk_accounts CASCADE").execute(&pool).await.unwrap();

    let registry = Arc::new(
        SchemaRegistry::builder()
            .model(simple_model("bk_accounts"))
            .table("bk_accounts")
            .build()
            .unwrap(),
    );
    MigrationEngine::new(pool.clone(), registry.clone()).migrate(false).await.unwrap();
    sqlx::query("INSERT INTO bk_accounts (user_name) VALUES ($1)")
        .bind("a")
        .execute(&pool)
        .await
        .unwrap();

    let dir = tempfile::tempdir().unwrap();
    BackupExporter::new(pool.clone(), registry).backup(dir.path()).await.unwrap();

    let entries: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().into_string().unwrap())
        .collect();
    assert_eq!(entries.len(), 1);
    assert!(entries[0].starts_with("backup_bk_accounts_"));
    assert!(entries[0].ends_with(".json"));

    let content = std::fs::read_to_string(dir.path().join(&entries[0])).unwrap();
    let rows: serde_json::Value = serde_json::from_str(&content).unwrap();
    assert_eq!(rows[0]["userName"], serde_json::json!("a"));
    assert!(rows[0].get("user_name").is_none());
}

#[tokio::test]
#[ignore = "requires PostgreSQL (set DATABASE_URL)"]
async fn failed_table_keeps_earlier_files_and_writes_no_later_ones() {
    let pool = pool().await;
    sqlx::query("DROP TABLE IF EXISTS pb_first CASCADE").execute(&pool).await.unwrap();
    sqlx::query("DROP TABLE IF EXISTS pb_third CASCADE").execute(&pool).await.unwrap();
    sqlx::query("DROP TABLE IF EXISTS pb_missing CASCADE").execute(&pool).await.unwrap();

    let registry = Arc::new(
        SchemaRegistry::builder()
            .model(simple_model("pb_first"))
            .model(simple_model("pb_third"))
            .table("pb_first")
            .table("pb_missing")
            .table("pb_third")
            .build()
            .unwrap(),
    );
    MigrationEngine::new(pool.clone(), registry.clone()).migrate(false).await.unwrap();

    let dir = tempfile::tempdir().unwrap();
    let err = BackupExporter::new(pool.clone(), registry).backup(dir.path()).await;
    assert!(err.is_err());

    let entries: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().into_string().unwrap())
        .collect();
    assert_eq!(entries.len(), 1);
    assert!(entries[0].starts_with("backup_pb_first_"));
}
