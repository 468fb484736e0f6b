//! Write preparation shared by both adapters.
//!
//! Both backends must stamp, strip and check incoming data the same way, so
//! the rules live here rather than in each adapter.

use serde_json::Value;

use crate::db::models::{CREATED_AT_FIELD, ID_FIELD, UPDATED_AT_FIELD};
use crate::db::schema::{ColumnType, CollectionSchema};
use crate::db::utils::current_timestamp;
use crate::db::{DbError, DbResult, Record};

/// Normalize data for insertion.
///
/// Caller-supplied timestamps are ignored and replaced with fresh ones.
/// `null` fields are dropped. An `id`, when given, must be a non-empty
/// string; otherwise the adapter assigns one.
pub(crate) fn prepare_create(schema: &CollectionSchema, data: Record) -> DbResult<Record> {
    let mut record = Record::new();
    for (field, value) in data.into_inner() {
        if field == CREATED_AT_FIELD || field == UPDATED_AT_FIELD || value.is_null() {
            continue;
        }
        if field == ID_FIELD {
            match value.as_str() {
                Some(id) if !id.is_empty() => {}
                _ => {
                    return Err(DbError::invalid(
                        "id must be a non-empty string",
                        "omit id to have one generated",
                    ));
                }
            }
            record.insert(field, value);
        } else {
            schema.check_write(&field, &value)?;
            let value = widen_real(schema, &field, value);
            record.insert(field, value);
        }
    }

    let now = current_timestamp();
    record.insert(CREATED_AT_FIELD.to_string(), now.clone().into());
    record.insert(UPDATED_AT_FIELD.to_string(), now.into());
    Ok(record)
}

/// Normalize a partial update.
///
/// Only the given fields change; `null` clears a field. `updatedAt` is always
/// re-stamped.
pub(crate) fn prepare_update(schema: &CollectionSchema, patch: Record) -> DbResult<Record> {
    let mut changes = Record::new();
    for (field, value) in patch.into_inner() {
        if field == CREATED_AT_FIELD || field == UPDATED_AT_FIELD {
            continue;
        }
        if field == ID_FIELD {
            return Err(DbError::invalid(
                "id cannot be changed by an update",
                "create a new record instead",
            ));
        }
        schema.check_write(&field, &value)?;
        let value = widen_real(schema, &field, value);
        changes.insert(field, value);
    }
    changes.insert(UPDATED_AT_FIELD.to_string(), current_timestamp().into());
    Ok(changes)
}

/// Store whole numbers bound for a real column as floats, the way SQLite
/// would read them back.
fn widen_real(schema: &CollectionSchema, field: &str, value: Value) -> Value {
    match (&value, schema.column_type(field)) {
        (Value::Number(n), Some(ColumnType::Real)) if !n.is_f64() => {
            n.as_f64().map(Value::from).unwrap_or(value)
        }
        _ => value,
    }
}
