//! Record operations over a single SQLite connection.
//!
//! Every function takes the connection explicitly so the same code runs
//! against a pooled connection or inside an open transaction.

use sqlx::query::Query;
use sqlx::sqlite::{SqliteArguments, SqliteConnection, SqliteRow};
use sqlx::{Column, Row, Sqlite, TypeInfo, ValueRef};

use crate::db::codec::{NativeRow, SqlValue, decode, encode};
use crate::db::models::ID_FIELD;
use crate::db::schema::CollectionSchema;
use crate::db::translate::{quote_sql, sql_order_clause, sql_page_clause, to_sql_where};
use crate::db::utils::generate_entity_id;
use crate::db::write::{prepare_create, prepare_update};
use crate::db::{DbError, DbResult, Filter, QueryOptions, Record};

type SqliteQuery<'q> = Query<'q, Sqlite, SqliteArguments<'q>>;

pub(super) async fn create(
    conn: &mut SqliteConnection,
    schema: &CollectionSchema,
    data: Record,
) -> DbResult<Record> {
    let mut record = prepare_create(schema, data)?;
    let id = match record.id() {
        Some(id) => id.to_string(),
        None => {
            let id = generate_entity_id();
            record.insert(ID_FIELD.to_string(), id.clone().into());
            id
        }
    };

    let row = encode(schema, &record);
    let columns: Vec<String> = row.keys().map(|c| quote_sql(c)).collect();
    let placeholders = vec!["?"; row.len()].join(", ");
    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_sql(&schema.name),
        columns.join(", "),
        placeholders
    );

    let mut query = sqlx::query(&sql);
    for value in row.values().cloned() {
        query = bind_value(query, value);
    }
    query.execute(&mut *conn).await?;

    find_one(conn, schema, &Filter::by_id(&id), &QueryOptions::default())
        .await?
        .ok_or_else(|| DbError::Database {
            message: format!("created record missing from '{}'", schema.name),
        })
}

pub(super) async fn find(
    conn: &mut SqliteConnection,
    schema: &CollectionSchema,
    filter: &Filter,
    options: &QueryOptions,
) -> DbResult<Vec<Record>> {
    if !options.relations.is_empty() {
        return Err(DbError::Unsupported {
            message: format!(
                "relations ({}) are not resolved by the sqlite backend",
                options.relations.join(", ")
            ),
        });
    }

    let where_clause = to_sql_where(schema, filter)?;
    let sql = format!(
        "SELECT * FROM {}{}{}{}",
        quote_sql(&schema.name),
        where_clause.to_sql(),
        sql_order_clause(schema, options)?,
        sql_page_clause(options)
    );

    let mut query = sqlx::query(&sql);
    for value in where_clause.binds {
        query = bind_value(query, value);
    }
    let rows = query.fetch_all(&mut *conn).await?;

    rows.iter()
        .map(|row| read_row(row).map(|native| decode(schema, native)))
        .collect()
}

pub(super) async fn find_one(
    conn: &mut SqliteConnection,
    schema: &CollectionSchema,
    filter: &Filter,
    options: &QueryOptions,
) -> DbResult<Option<Record>> {
    let options = QueryOptions {
        limit: Some(1),
        ..options.clone()
    };
    Ok(find(conn, schema, filter, &options).await?.into_iter().next())
}

pub(super) async fn update(
    conn: &mut SqliteConnection,
    schema: &CollectionSchema,
    filter: &Filter,
    patch: Record,
) -> DbResult<u64> {
    let changes = encode(schema, &prepare_update(schema, patch)?);
    let where_clause = to_sql_where(schema, filter)?;

    let assignments: Vec<String> = changes
        .keys()
        .map(|c| format!("{} = ?", quote_sql(c)))
        .collect();
    let sql = format!(
        "UPDATE {} SET {}{}",
        quote_sql(&schema.name),
        assignments.join(", "),
        where_clause.to_sql()
    );

    let mut query = sqlx::query(&sql);
    for value in changes.into_values().chain(where_clause.binds) {
        query = bind_value(query, value);
    }
    let result = query.execute(&mut *conn).await?;

    Ok(result.rows_affected())
}

pub(super) async fn update_by_id(
    conn: &mut SqliteConnection,
    schema: &CollectionSchema,
    id: &str,
    patch: Record,
) -> DbResult<Option<Record>> {
    let filter = Filter::by_id(id);
    if update(conn, schema, &filter, patch).await? == 0 {
        return Ok(None);
    }
    find_one(conn, schema, &filter, &QueryOptions::default()).await
}

pub(super) async fn delete(
    conn: &mut SqliteConnection,
    schema: &CollectionSchema,
    filter: &Filter,
) -> DbResult<u64> {
    let where_clause = to_sql_where(schema, filter)?;
    let sql = format!(
        "DELETE FROM {}{}",
        quote_sql(&schema.name),
        where_clause.to_sql()
    );

    let mut query = sqlx::query(&sql);
    for value in where_clause.binds {
        query = bind_value(query, value);
    }
    let result = query.execute(&mut *conn).await?;

    Ok(result.rows_affected())
}

pub(super) async fn count(
    conn: &mut SqliteConnection,
    schema: &CollectionSchema,
    filter: &Filter,
) -> DbResult<u64> {
    let where_clause = to_sql_where(schema, filter)?;
    let sql = format!(
        "SELECT COUNT(*) FROM {}{}",
        quote_sql(&schema.name),
        where_clause.to_sql()
    );

    let mut query = sqlx::query(&sql);
    for value in where_clause.binds {
        query = bind_value(query, value);
    }
    let total: i64 = query.fetch_one(&mut *conn).await?.try_get(0)?;

    Ok(total.max(0) as u64)
}

fn bind_value(query: SqliteQuery<'_>, value: SqlValue) -> SqliteQuery<'_> {
    match value {
        SqlValue::Null => query.bind(None::<String>),
        SqlValue::Integer(i) => query.bind(i),
        SqlValue::Real(f) => query.bind(f),
        SqlValue::Text(s) => query.bind(s),
    }
}

/// Read a row by the storage class of each value, not the declared column.
fn read_row(row: &SqliteRow) -> DbResult<NativeRow> {
    let mut native = NativeRow::new();
    for column in row.columns() {
        let idx = column.ordinal();
        let raw = row.try_get_raw(idx)?;
        let value = if raw.is_null() {
            SqlValue::Null
        } else {
            let type_name = raw.type_info().name().to_ascii_uppercase();
            match type_name.as_str() {
                "INTEGER" | "INT" | "BIGINT" | "BOOLEAN" => SqlValue::Integer(row.try_get(idx)?),
                "REAL" | "FLOAT" | "DOUBLE" | "NUMERIC" => SqlValue::Real(row.try_get(idx)?),
                "BLOB" => {
                    let bytes: Vec<u8> = row.try_get(idx)?;
                    SqlValue::Text(String::from_utf8_lossy(&bytes).into_owned())
                }
                _ => SqlValue::Text(row.try_get(idx)?),
            }
        };
        native.insert(column.name().to_string(), value);
    }
    Ok(native)
}
