//! Tests for SQLite record operations at the row level.

use std::sync::Arc;

use serde_json::json;

use super::SqliteAdapter;
use crate::config::SqliteConfig;
use crate::db::{Catalog, Filter, QueryOptions, Record};

async fn adapter() -> SqliteAdapter {
    SqliteAdapter::connect(&SqliteConfig::in_memory(), Arc::new(Catalog::builtin()))
        .await
        .expect("Failed to open SQLite adapter")
}

#[tokio::test(flavor = "multi_thread")]
async fn generated_ids_are_sixteen_hex_chars() {
    let adapter = adapter().await;
    let created = adapter
        .create("cars", Record::new().with("slug", "a"))
        .await
        .unwrap();
    let id = created.id().unwrap();
    assert_eq!(id.len(), 16);
    assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
}

#[tokio::test(flavor = "multi_thread")]
async fn values_are_stored_in_typed_columns() {
    let adapter = adapter().await;
    let created = adapter
        .create(
            "cars",
            Record::new()
                .with("slug", "typed")
                .with("price", 1200)
                .with("featured", true)
                .with("images", json!(["a.jpg"])),
        )
        .await
        .unwrap();

    let (price, featured, images): (i64, i64, String) = sqlx::query_as(
        r#"SELECT "price", "featured", "images" FROM "cars" WHERE "id" = ?"#,
    )
    .bind(created.id().unwrap())
    .fetch_one(adapter.pool())
    .await
    .expect("row should exist");

    assert_eq!(price, 1200);
    assert_eq!(featured, 1);
    assert_eq!(images, r#"["a.jpg"]"#);
}

#[tokio::test(flavor = "multi_thread")]
async fn corrupt_composite_column_reads_back_as_text() {
    let adapter = adapter().await;
    let created = adapter
        .create("cars", Record::new().with("slug", "bad"))
        .await
        .unwrap();
    sqlx::query(r#"UPDATE "cars" SET "specs" = '{not json' WHERE "id" = ?"#)
        .bind(created.id().unwrap())
        .execute(adapter.pool())
        .await
        .unwrap();

    let found = adapter
        .find_one("cars", &Filter::by_id(created.id().unwrap()), &QueryOptions::default())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.get("specs"), Some(&json!("{not json")));
}

#[tokio::test(flavor = "multi_thread")]
async fn null_update_writes_sql_null() {
    let adapter = adapter().await;
    let created = adapter
        .create("cars", Record::new().with("slug", "c").with("color", "red"))
        .await
        .unwrap();
    let id = created.id().unwrap().to_string();

    adapter
        .update_by_id("cars", &id, Record::new().with("color", json!(null)))
        .await
        .unwrap();

    let color: Option<String> = sqlx::query_scalar(r#"SELECT "color" FROM "cars" WHERE "id" = ?"#)
        .bind(&id)
        .fetch_one(adapter.pool())
        .await
        .unwrap();
    assert_eq!(color, None);
}

#[tokio::test(flavor = "multi_thread")]
async fn transaction_dropped_without_commit_rolls_back() {
    let adapter = adapter().await;
    {
        let mut tx = adapter.begin().await.unwrap();
        tx.create("cars", Record::new().with("slug", "ghost"))
            .await
            .unwrap();
    }
    assert_eq!(adapter.count("cars", &Filter::new()).await.unwrap(), 0);
}
