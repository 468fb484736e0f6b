use serde_json::{Value, json};

use crate::cli::commands::records::*;
use crate::cli::commands::{FindParams, OutputFormat, Target};
use crate::cli::error::CliError;
use crate::config::{SqliteConfig, StorageConfig};
use crate::db::{DbError, Storage};

async fn storage() -> Storage {
    Storage::connect(&StorageConfig::sqlite(SqliteConfig::in_memory()))
        .await
        .expect("Failed to create test storage")
}

async fn create_car(storage: &Storage, slug: &str, price: i64) -> String {
    let output = create(
        storage,
        "cars",
        &json!({"slug": slug, "make": "Kia", "price": price}).to_string(),
        OutputFormat::Json,
    )
    .await
    .expect("create should succeed");
    let record: Value = serde_json::from_str(&output).unwrap();
    record["id"].as_str().unwrap().to_string()
}

#[tokio::test(flavor = "multi_thread")]
async fn test_create_and_get_json() {
    let storage = storage().await;
    let id = create_car(&storage, "rio", 15_000).await;

    let output = get(&storage, "cars", &id, OutputFormat::Json).await.unwrap();
    let records: Vec<Value> = serde_json::from_str(&output).unwrap();
    assert_eq!(records[0]["slug"], "rio");
    assert_eq!(records[0]["price"], 15_000);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_get_missing_record() {
    let storage = storage().await;
    let output = get(&storage, "cars", "nope", OutputFormat::Table)
        .await
        .unwrap();
    assert_eq!(output, "No cars record with id nope");
    let output = get(&storage, "cars", "nope", OutputFormat::Json).await.unwrap();
    assert_eq!(output, "null");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_find_with_filter_sort_and_limit() {
    let storage = storage().await;
    for (slug, price) in [("a", 100), ("b", 200), ("c", 300), ("d", 400), ("e", 500)] {
        create_car(&storage, slug, price).await;
    }

    let params = FindParams {
        filter: Some(r#"{"price": {"gte": 200, "lte": 400}}"#),
        sort: Some("price:desc"),
        limit: Some(2),
        ..FindParams::default()
    };
    let output = find(&storage, "cars", params, OutputFormat::Json)
        .await
        .unwrap();
    let records: Vec<Value> = serde_json::from_str(&output).unwrap();
    let prices: Vec<i64> = records.iter().filter_map(|r| r["price"].as_i64()).collect();
    assert_eq!(prices, vec![400, 300]);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_find_table_output() {
    let storage = storage().await;
    create_car(&storage, "sportage", 28_000).await;

    let output = find(&storage, "cars", FindParams::default(), OutputFormat::Table)
        .await
        .unwrap();
    assert!(output.contains("sportage"));
    assert!(output.contains("price"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_update_by_id_and_by_filter() {
    let storage = storage().await;
    let id = create_car(&storage, "ceed", 18_000).await;
    create_car(&storage, "picanto", 12_000).await;

    let output = update(
        &storage,
        "cars",
        Target::Id(&id),
        r#"{"price": 17500}"#,
        OutputFormat::Json,
    )
    .await
    .unwrap();
    let records: Vec<Value> = serde_json::from_str(&output).unwrap();
    assert_eq!(records[0]["price"], 17_500);

    let output = update(
        &storage,
        "cars",
        Target::Filter(r#"{"make": "Kia"}"#),
        r#"{"status": "sold"}"#,
        OutputFormat::Table,
    )
    .await
    .unwrap();
    assert_eq!(output, "updated: 2");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_update_missing_id_is_error() {
    let storage = storage().await;
    let err = update(
        &storage,
        "cars",
        Target::Id("ghost"),
        r#"{"price": 1}"#,
        OutputFormat::Json,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, CliError::InvalidArgument { .. }));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_delete_and_count() {
    let storage = storage().await;
    let id = create_car(&storage, "stinger", 40_000).await;
    create_car(&storage, "niro", 27_000).await;

    let output = delete(&storage, "cars", Target::Id(&id), OutputFormat::Json)
        .await
        .unwrap();
    assert_eq!(serde_json::from_str::<Value>(&output).unwrap(), json!({"deleted": 1}));

    let output = count(&storage, "cars", None, OutputFormat::Table).await.unwrap();
    assert_eq!(output, "count: 1");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_invalid_inputs() {
    let storage = storage().await;

    let err = create(&storage, "cars", "not json", OutputFormat::Json)
        .await
        .unwrap_err();
    assert!(matches!(err, CliError::InvalidJson { what: "record", .. }));

    let err = count(&storage, "boats", None, OutputFormat::Json)
        .await
        .unwrap_err();
    assert!(matches!(err, CliError::Storage(DbError::InvalidData { .. })));
}
