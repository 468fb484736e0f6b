//! Tests for the SurrealDB adapter.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use super::SurrealAdapter;
use crate::config::SurrealConfig;
use crate::db::{Catalog, CollectionSchema, DbError, Filter, QueryOptions, Record};

async fn adapter() -> SurrealAdapter {
    SurrealAdapter::connect(&SurrealConfig::default(), Arc::new(Catalog::builtin()))
        .await
        .expect("Failed to open in-memory SurrealDB")
}

#[tokio::test(flavor = "multi_thread")]
async fn ids_are_plain_strings() {
    let adapter = adapter().await;
    let created = adapter
        .create("cars", Record::new().with("slug", "a"))
        .await
        .unwrap();
    let id = created.id().expect("id should be a string");
    assert!(!id.contains(':'), "id should not carry the table prefix: {}", id);

    let found = adapter
        .find("cars", &Filter::new().is_in("id", [id]), &QueryOptions::default())
        .await
        .unwrap();
    assert_eq!(found, vec![created.clone()]);
}

#[tokio::test(flavor = "multi_thread")]
async fn values_keep_native_types() {
    let adapter = adapter().await;
    let created = adapter
        .create(
            "users",
            Record::new()
                .with("email", "ana@example.com")
                .with("isActive", true)
                .with("preferences", json!({"newsletter": false, "brands": ["Audi"]})),
        )
        .await
        .unwrap();
    assert_eq!(created.get("isActive"), Some(&json!(true)));
    assert_eq!(
        created.get("preferences"),
        Some(&json!({"newsletter": false, "brands": ["Audi"]}))
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn null_update_removes_field() {
    let adapter = adapter().await;
    let created = adapter
        .create("cars", Record::new().with("slug", "n").with("color", "red"))
        .await
        .unwrap();
    let id = created.id().unwrap();

    let updated = adapter
        .update_by_id("cars", id, Record::new().with("color", json!(null)))
        .await
        .unwrap()
        .unwrap();
    assert!(!updated.contains_key("color"));
    assert_eq!(
        adapter
            .count("cars", &Filter::new().is_null("color"))
            .await
            .unwrap(),
        1
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn registration_is_idempotent() {
    let adapter = adapter().await;
    adapter
        .register_collections()
        .await
        .expect("re-registering should succeed");
}

#[tokio::test(flavor = "multi_thread")]
async fn unknown_relation_is_rejected() {
    let adapter = adapter().await;
    let err = adapter
        .find("cars", &Filter::new(), &QueryOptions::new().relation("owner"))
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::InvalidData { .. }));
}

#[tokio::test(flavor = "multi_thread")]
async fn atomic_blocks_are_serialized() {
    let adapter = Arc::new(adapter().await);
    let first = adapter.begin().await.unwrap();

    let contender = {
        let adapter = Arc::clone(&adapter);
        tokio::spawn(async move { adapter.begin().await.map(|_| ()) })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!contender.is_finished(), "second block must wait for the first");

    first.commit().await.unwrap();
    contender
        .await
        .expect("task panicked")
        .expect("second block should start");
}

#[tokio::test(flavor = "multi_thread")]
async fn rollback_of_empty_journal_is_noop() {
    let adapter = adapter().await;
    let tx = adapter.begin().await.unwrap();
    tx.rollback().await.expect("empty rollback should succeed");
}

#[tokio::test(flavor = "multi_thread")]
async fn invalid_catalog_fails_connect() {
    let catalog = Catalog::new([CollectionSchema::new("boats")
        .text("ownerId")
        .relation("owner", "ownerId", "owners")]);
    let result = SurrealAdapter::connect(&SurrealConfig::default(), Arc::new(catalog)).await;
    assert!(matches!(result, Err(DbError::Schema { .. })));
}

#[tokio::test(flavor = "multi_thread")]
async fn bad_endpoint_is_connection_error() {
    let config = SurrealConfig {
        endpoint: "nope://nowhere".to_string(),
        ..SurrealConfig::default()
    };
    let result = SurrealAdapter::connect(&config, Arc::new(Catalog::builtin())).await;
    assert!(matches!(result, Err(DbError::Connection { .. })));
}
