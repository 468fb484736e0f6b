use serde_json::json;

use crate::cli::error::CliError;
use crate::cli::utils::*;
use crate::db::{Catalog, Condition, Record, SortDirection};

#[test]
fn test_truncate_with_ellipsis_short_string() {
    let result = truncate_with_ellipsis("hello", 10);
    assert_eq!(result, "hello");
}

#[test]
fn test_truncate_with_ellipsis_long_string() {
    let result = truncate_with_ellipsis("hello world this is a long string", 10);
    assert_eq!(result, "hello w...");
}

#[test]
fn test_truncate_with_ellipsis_unicode() {
    let result = truncate_with_ellipsis("hello 世界", 8);
    assert_eq!(result, "hello 世界");

    let result2 = truncate_with_ellipsis("hello 世界", 7);
    assert_eq!(result2, "hell...");
}

#[test]
fn test_parse_sort_terms() {
    let sort = parse_sort(Some("price:desc, make")).unwrap();
    assert_eq!(
        sort,
        vec![
            ("price".to_string(), SortDirection::Desc),
            ("make".to_string(), SortDirection::Asc),
        ]
    );
    assert!(parse_sort(None).unwrap().is_empty());
}

#[test]
fn test_parse_sort_rejects_bad_direction() {
    let err = parse_sort(Some("price:sideways")).unwrap_err();
    assert!(matches!(err, CliError::InvalidArgument { .. }));
}

#[test]
fn test_parse_filter() {
    let filter = parse_filter(Some(r#"{"price": {"gte": 200}}"#)).unwrap();
    assert_eq!(filter.clauses()[0].condition, Condition::Gte(json!(200)));
    assert!(parse_filter(None).unwrap().is_empty());

    let err = parse_filter(Some("{oops")).unwrap_err();
    assert!(matches!(err, CliError::InvalidJson { what: "filter", .. }));

    let err = parse_filter(Some(r#"{"price": {"near": 1}}"#)).unwrap_err();
    assert!(matches!(err, CliError::Storage(_)));
}

#[test]
fn test_parse_record_requires_object() {
    assert_eq!(
        parse_record(r#"{"make": "Kia"}"#).unwrap(),
        Record::new().with("make", "Kia")
    );
    assert!(parse_record("[1, 2]").is_err());
}

#[test]
fn test_format_cell() {
    assert_eq!(format_cell(None), "-");
    assert_eq!(format_cell(Some(&json!(null))), "-");
    assert_eq!(format_cell(Some(&json!("Kia"))), "Kia");
    assert_eq!(format_cell(Some(&json!(["a", "b"]))), r#"["a","b"]"#);
}

#[test]
fn test_records_table_lists_present_columns() {
    let catalog = Catalog::builtin();
    let cars = catalog.get("cars").unwrap();
    let records = vec![
        Record::new()
            .with("id", "c1")
            .with("make", "Kia")
            .with("price", 100)
            .with("createdAt", "2025-01-01T00:00:00.000Z"),
        Record::new().with("id", "c2").with("make", "Audi"),
    ];

    let table = records_table(cars, &records);
    assert!(table.contains("make"));
    assert!(table.contains("price"));
    assert!(table.contains("Audi"));
    assert!(!table.contains("mileage"));
    assert!(!table.contains("createdAt"));
}

#[test]
fn test_records_table_empty() {
    let catalog = Catalog::builtin();
    assert_eq!(
        records_table(catalog.get("cars").unwrap(), &[]),
        "No records found."
    );
}
