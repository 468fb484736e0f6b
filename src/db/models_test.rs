//! Tests for backend-neutral models.

use serde_json::json;

use crate::db::{QueryOptions, Record, SortDirection};

#[test]
fn record_serializes_as_plain_object() {
    let record = Record::new().with("id", "car00001").with("price", 300);
    let value = serde_json::to_value(&record).unwrap();
    assert_eq!(value, json!({"id": "car00001", "price": 300}));
}

#[test]
fn record_id_requires_string() {
    assert_eq!(Record::new().with("id", "abc").id(), Some("abc"));
    assert_eq!(Record::new().with("id", 7).id(), None);
    assert_eq!(Record::new().id(), None);
}

#[test]
fn record_without_drops_fields() {
    let record = Record::new()
        .with("id", "a")
        .with("createdAt", "2025-01-01T00:00:00.000Z")
        .with("make", "Audi");
    let stripped = record.without(&["id", "createdAt"]);
    assert_eq!(stripped.len(), 1);
    assert_eq!(stripped.get("make"), Some(&json!("Audi")));
}

#[test]
fn record_try_from_rejects_non_objects() {
    assert!(Record::try_from(json!({"a": 1})).is_ok());
    assert!(Record::try_from(json!([1, 2])).is_err());
}

#[test]
fn query_options_keep_explicit_zero() {
    let options = QueryOptions::new().skip(0).limit(0);
    assert_eq!(options.skip, Some(0));
    assert_eq!(options.limit, Some(0));
    assert_ne!(options, QueryOptions::default());
}

#[test]
fn sort_direction_deserializes_lowercase() {
    let dir: SortDirection = serde_json::from_value(json!("desc")).unwrap();
    assert_eq!(dir, SortDirection::Desc);
    assert_eq!(dir.keyword(), "DESC");
}
