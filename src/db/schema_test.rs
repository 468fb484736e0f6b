//! Tests for the collection catalog.

use serde_json::json;

use crate::db::{Catalog, CollectionSchema, ColumnType, DbError};

#[test]
fn builtin_catalog_is_valid() {
    let catalog = Catalog::builtin();
    catalog.validate().expect("built-in catalog should validate");
    for name in [
        "users",
        "sessions",
        "inquiries",
        "cars",
        "testimonials",
        "accessories",
        "services",
    ] {
        assert!(catalog.get(name).is_some(), "missing collection {}", name);
    }
}

#[test]
fn unknown_collection_is_invalid_data() {
    let err = Catalog::builtin().collection("boats").unwrap_err();
    assert!(matches!(err, DbError::InvalidData { .. }));
}

#[test]
fn reserved_fields_are_always_queryable() {
    let schema = CollectionSchema::new("things").text("name");
    for field in ["id", "createdAt", "updatedAt", "name"] {
        assert!(schema.has_field(field), "{} should be a field", field);
    }
    assert!(!schema.has_field("other"));
}

#[test]
fn composite_field_must_be_text_column() {
    let catalog = Catalog::new([CollectionSchema::new("things")
        .integer("tags")
        .composites(&["tags"])]);
    let err = catalog.validate().unwrap_err();
    assert!(matches!(err, DbError::Schema { .. }));
}

#[test]
fn boolean_field_must_be_integer_column() {
    let catalog = Catalog::new([CollectionSchema::new("things")
        .text("active")
        .booleans(&["active"])]);
    assert!(matches!(catalog.validate(), Err(DbError::Schema { .. })));
}

#[test]
fn field_cannot_be_composite_and_boolean() {
    let catalog = Catalog::new([CollectionSchema::new("things")
        .text("flag")
        .composites(&["flag"])
        .booleans(&["flag"])]);
    assert!(matches!(catalog.validate(), Err(DbError::Schema { .. })));
}

#[test]
fn relation_must_target_known_collection() {
    let catalog = Catalog::new([CollectionSchema::new("things")
        .text("ownerId")
        .relation("owner", "ownerId", "owners")]);
    let err = catalog.validate().unwrap_err();
    assert!(err.to_string().contains("owners"));
}

#[test]
fn invalid_identifiers_are_rejected() {
    let catalog = Catalog::new([CollectionSchema::new("bad name")]);
    assert!(matches!(catalog.validate(), Err(DbError::Schema { .. })));

    let catalog = Catalog::new([CollectionSchema::new("things").text("x; DROP")]);
    assert!(matches!(catalog.validate(), Err(DbError::Schema { .. })));
}

#[test]
fn check_write_enforces_declared_shapes() {
    let catalog = Catalog::builtin();
    let cars = catalog.get("cars").unwrap();

    cars.check_write("featured", &json!(true)).unwrap();
    cars.check_write("specs", &json!({"hp": 300})).unwrap();
    cars.check_write("make", &json!("Mazda")).unwrap();
    cars.check_write("make", &json!(null)).unwrap();

    for (field, value) in [
        ("make", json!(true)),
        ("make", json!(["a"])),
        ("featured", json!(1)),
        ("wheels", json!(4)),
        ("make", json!(5)),
        ("year", json!("2020")),
        ("mileage", json!(1.5)),
        ("specs", json!(7)),
    ] {
        let err = cars.check_write(field, &value).unwrap_err();
        assert!(
            matches!(err, DbError::InvalidData { .. }),
            "{} = {} should be rejected",
            field,
            value
        );
    }
}

#[test]
fn real_columns_take_any_number() {
    let schema = CollectionSchema::new("fuel").real("litres").integer("stops");
    schema.check_write("litres", &json!(42.5)).unwrap();
    schema.check_write("litres", &json!(40)).unwrap();
    schema.check_write("stops", &json!(3)).unwrap();
    assert!(schema.check_write("litres", &json!("42.5")).is_err());
    assert!(schema.check_write("stops", &json!(3.5)).is_err());
}

#[test]
fn catalog_loads_from_yaml() {
    let yaml = r#"
- name: boats
  columns:
    - name: hull
      type: text
    - name: length
      type: integer
    - name: extras
      type: text
  composite_fields: [extras]
  indexes:
    - field: hull
      unique: true
"#;
    let catalog = Catalog::from_yaml(yaml).expect("catalog should parse");
    let boats = catalog.get("boats").unwrap();
    assert_eq!(boats.column_type("length"), Some(ColumnType::Integer));
    assert!(boats.is_composite("extras"));
    assert!(boats.indexes[0].unique);
}

#[test]
fn invalid_yaml_catalog_is_schema_error() {
    let err = Catalog::from_yaml("- name: [").unwrap_err();
    assert!(matches!(err, DbError::Schema { .. }));
}
