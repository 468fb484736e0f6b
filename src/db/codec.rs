//! Value codec for the relational backend.
//!
//! Records map onto typed columns: composite values become JSON text,
//! booleans become 0/1 integers and absent fields become NULL. Decoding
//! reverses this using the collection's declared composite and boolean
//! field lists. Decoding never fails: a composite column that does not
//! parse comes back as its raw text.

use std::collections::BTreeMap;

use serde_json::{Number, Value};
use tracing::debug;

use crate::db::Record;
use crate::db::schema::CollectionSchema;

/// A single SQLite storage-class value.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

/// Column name → stored value.
pub type NativeRow = BTreeMap<String, SqlValue>;

/// Encode a value without regard to the column it lands in.
///
/// Used for filter operands as well as scalar fields.
pub fn encode_value(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => SqlValue::Integer(i),
            None => SqlValue::Real(n.as_f64().unwrap_or_default()),
        },
        Value::String(s) => SqlValue::Text(s.clone()),
        composite @ (Value::Array(_) | Value::Object(_)) => SqlValue::Text(composite.to_string()),
    }
}

/// Encode a value destined for a specific field.
///
/// Declared composite fields always hold JSON text, whatever the value, so
/// that decoding can parse them back unambiguously.
pub fn encode_field(schema: &CollectionSchema, field: &str, value: &Value) -> SqlValue {
    if value.is_null() {
        SqlValue::Null
    } else if schema.is_composite(field) {
        SqlValue::Text(value.to_string())
    } else {
        encode_value(value)
    }
}

pub fn encode(schema: &CollectionSchema, record: &Record) -> NativeRow {
    record
        .iter()
        .map(|(field, value)| (field.clone(), encode_field(schema, field, value)))
        .collect()
}

pub fn decode(schema: &CollectionSchema, row: NativeRow) -> Record {
    let mut record = Record::new();
    for (field, stored) in row {
        let value = match stored {
            SqlValue::Null => continue,
            SqlValue::Text(text) if schema.is_composite(&field) => {
                match serde_json::from_str::<Value>(&text) {
                    Ok(parsed) => parsed,
                    Err(e) => {
                        debug!(collection = %schema.name, %field, error = %e, "Composite field kept as raw text");
                        Value::String(text)
                    }
                }
            }
            SqlValue::Integer(i) if schema.is_boolean(&field) => Value::Bool(i != 0),
            SqlValue::Integer(i) => Value::Number(i.into()),
            SqlValue::Real(f) => match Number::from_f64(f) {
                Some(n) => Value::Number(n),
                None => continue,
            },
            SqlValue::Text(text) => Value::String(text),
        };
        record.insert(field, value);
    }
    record
}
