//! Tests for SQLite connection handling and schema bootstrap.

use std::sync::Arc;

use tempfile::TempDir;

use super::SqliteAdapter;
use crate::config::SqliteConfig;
use crate::db::{Catalog, CollectionSchema, DbError, Filter, QueryOptions, Record};

async fn open(config: &SqliteConfig, catalog: Catalog) -> SqliteAdapter {
    SqliteAdapter::connect(config, Arc::new(catalog))
        .await
        .expect("Failed to open SQLite adapter")
}

#[tokio::test(flavor = "multi_thread")]
async fn bootstrap_creates_all_tables_and_indexes() {
    let adapter = open(&SqliteConfig::in_memory(), Catalog::builtin()).await;

    let tables: Vec<String> =
        sqlx::query_scalar("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .fetch_all(adapter.pool())
            .await
            .expect("Query should succeed");
    for table in [
        "accessories",
        "cars",
        "inquiries",
        "services",
        "sessions",
        "testimonials",
        "users",
    ] {
        assert!(
            tables.iter().any(|t| t == table),
            "Missing table: {}. Found tables: {:?}",
            table,
            tables
        );
    }

    let indexes: Vec<String> =
        sqlx::query_scalar("SELECT name FROM sqlite_master WHERE type='index' AND name LIKE 'idx_%'")
            .fetch_all(adapter.pool())
            .await
            .expect("Query should succeed");
    for index in ["idx_users_email", "idx_sessions_token", "idx_cars_slug", "idx_inquiries_status"] {
        assert!(
            indexes.iter().any(|i| i == index),
            "Missing index: {}. Found: {:?}",
            index,
            indexes
        );
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn bootstrap_is_idempotent_and_keeps_data() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let config = SqliteConfig {
        path: dir.path().join("showroom.db"),
        ..SqliteConfig::default()
    };

    let first = open(&config, Catalog::builtin()).await;
    first
        .create("cars", Record::new().with("slug", "kept").with("price", 10))
        .await
        .expect("create should succeed");
    first.disconnect().await;

    let second = open(&config, Catalog::builtin()).await;
    let count = second
        .count("cars", &Filter::new().eq("slug", "kept"))
        .await
        .expect("count should succeed");
    assert_eq!(count, 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn newly_declared_columns_are_added() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let config = SqliteConfig {
        path: dir.path().join("showroom.db"),
        ..SqliteConfig::default()
    };

    let before = Catalog::new([CollectionSchema::new("boats").text("hull")]);
    let adapter = open(&config, before).await;
    adapter
        .create("boats", Record::new().with("hull", "wood"))
        .await
        .expect("create should succeed");
    adapter.disconnect().await;

    let after = Catalog::new([CollectionSchema::new("boats")
        .text("hull")
        .integer("length")
        .index("length")]);
    let adapter = open(&config, after).await;
    adapter
        .create("boats", Record::new().with("hull", "steel").with("length", 12))
        .await
        .expect("new column should accept writes");

    let long = adapter
        .find("boats", &Filter::new().gt("length", 10), &QueryOptions::default())
        .await
        .expect("find should succeed");
    assert_eq!(long.len(), 1);
    assert_eq!(long[0].get("hull").and_then(|v| v.as_str()), Some("steel"));
}

#[tokio::test(flavor = "multi_thread")]
async fn invalid_catalog_fails_connect() {
    let catalog = Catalog::new([CollectionSchema::new("boats")
        .integer("extras")
        .composites(&["extras"])]);
    let result = SqliteAdapter::connect(&SqliteConfig::in_memory(), Arc::new(catalog)).await;
    assert!(matches!(result, Err(DbError::Schema { .. })));
}

#[tokio::test(flavor = "multi_thread")]
async fn unreachable_path_is_connection_error() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let config = SqliteConfig {
        path: dir.path().join("missing").join("nested").join("showroom.db"),
        ..SqliteConfig::default()
    };
    let result = SqliteAdapter::connect(&config, Arc::new(Catalog::builtin())).await;
    assert!(matches!(result, Err(DbError::Connection { .. })));
}
