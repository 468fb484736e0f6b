//! Tests for filter construction and JSON parsing.

use serde_json::json;

use crate::db::{Condition, DbError, Filter};

#[test]
fn empty_filter_matches_everything() {
    assert!(Filter::new().is_empty());
    assert!(Filter::from_json(&json!(null)).unwrap().is_empty());
    assert!(Filter::from_json(&json!({})).unwrap().is_empty());
}

#[test]
fn eq_with_null_becomes_is_null() {
    let filter = Filter::new().eq("color", json!(null));
    assert_eq!(filter.clauses()[0].condition, Condition::IsNull);
}

#[test]
fn literals_parse_as_equality() {
    let filter = Filter::from_json(&json!({"status": "available", "year": 2020})).unwrap();
    let expected = Filter::new().eq("status", "available").eq("year", 2020);
    assert_eq!(filter, expected);
}

#[test]
fn operator_objects_expand_to_one_clause_each() {
    let filter = Filter::from_json(&json!({"price": {"gte": 200, "lte": 400}})).unwrap();
    let expected = Filter::new().gte("price", 200).lte("price", 400);
    assert_eq!(filter, expected);
}

#[test]
fn every_operator_parses() {
    let filter = Filter::from_json(&json!({
        "a": {"eq": 1},
        "b": {"in": [1, 2]},
        "c": {"like": "%x%"},
        "d": {"gt": 1},
        "e": {"gte": 1},
        "f": {"lt": 1},
        "g": {"lte": 1},
        "h": null,
    }))
    .unwrap();

    let conditions: Vec<_> = filter.clauses().iter().map(|c| &c.condition).collect();
    assert_eq!(
        conditions,
        vec![
            &Condition::Equals(json!(1)),
            &Condition::In(vec![json!(1), json!(2)]),
            &Condition::Like("%x%".to_string()),
            &Condition::Gt(json!(1)),
            &Condition::Gte(json!(1)),
            &Condition::Lt(json!(1)),
            &Condition::Lte(json!(1)),
            &Condition::IsNull,
        ]
    );
}

#[test]
fn unknown_operator_is_rejected() {
    let err = Filter::from_json(&json!({"price": {"between": [1, 2]}})).unwrap_err();
    assert!(matches!(err, DbError::Translation { .. }));
    assert!(err.to_string().contains("between"));
}

#[test]
fn malformed_operands_are_rejected() {
    for bad in [
        json!({"price": {"in": 5}}),
        json!({"make": {"like": 5}}),
        json!({"make": {}}),
        json!(["make"]),
    ] {
        let err = Filter::from_json(&bad).unwrap_err();
        assert!(
            matches!(err, DbError::Translation { .. }),
            "expected translation error for {}",
            bad
        );
    }
}

#[test]
fn by_id_targets_id_field() {
    let filter = Filter::by_id("abc");
    assert_eq!(filter.clauses()[0].field, "id");
    assert_eq!(filter.clauses()[0].condition, Condition::Equals(json!("abc")));
}
