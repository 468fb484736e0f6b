//! Record operations against SurrealDB.
//!
//! Reads project the native record id down to its key, so callers receive
//! plain records whose `id` is a string exactly as on the relational side.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde_json::{Map, Value};
use surrealdb::Surreal;
use surrealdb::engine::any::Any;
use tokio::sync::{Semaphore, SemaphorePermit};

use crate::db::models::ID_FIELD;
use crate::db::schema::{Catalog, CollectionSchema};
use crate::db::translate::{surql_order_clause, surql_page_clause, to_surql_where};
use crate::db::write::{prepare_create, prepare_update};
use crate::db::{DbError, DbResult, Filter, QueryOptions, Record};

/// Projection returning every stored field with `id` reduced to its key.
const RECORD_FIELDS: &str = "*, record::id(id) AS id";

/// Shared, cheaply cloneable access to the database and catalog.
#[derive(Clone)]
pub(super) struct SurrealHandle {
    pub(super) db: Surreal<Any>,
    pub(super) catalog: Arc<Catalog>,
    permits: Arc<Semaphore>,
}

impl SurrealHandle {
    pub(super) fn new(db: Surreal<Any>, catalog: Arc<Catalog>, pool_size: usize) -> Self {
        Self {
            db,
            catalog,
            permits: Arc::new(Semaphore::new(pool_size.max(1))),
        }
    }

    /// Stop admitting new operations.
    pub(super) fn close(&self) {
        self.permits.close();
    }

    pub(super) async fn permit(&self) -> DbResult<SemaphorePermit<'_>> {
        self.permits.acquire().await.map_err(|_| DbError::Connection {
            message: "document storage is disconnected".to_string(),
        })
    }

    pub(super) fn schema(&self, collection: &str) -> DbResult<&CollectionSchema> {
        self.catalog.collection(collection)
    }

    pub(super) async fn create(&self, schema: &CollectionSchema, data: Record) -> DbResult<Record> {
        let mut record = prepare_create(schema, data)?;
        let id = record.remove(ID_FIELD);

        let mut vars = table_vars(schema);
        let target = match id {
            Some(id) => {
                vars.insert("id".to_string(), id);
                "type::thing($tb, $id)"
            }
            None => "type::table($tb)",
        };
        vars.insert("data".to_string(), Value::Object(record.into_inner()));

        let sql = format!(
            "LET $created = CREATE {} CONTENT $data; SELECT {} FROM $created.id;",
            target, RECORD_FIELDS
        );

        let _permit = self.permit().await?;
        let mut response = self.db.query(sql).bind(vars).await?.check()?;
        let rows: Vec<Value> = response.take(1)?;

        rows.into_iter()
            .next()
            .map(|row| normalize(schema, row))
            .transpose()?
            .ok_or_else(|| DbError::Database {
                message: format!("created record missing from '{}'", schema.name),
            })
    }

    pub(super) async fn find(
        &self,
        schema: &CollectionSchema,
        filter: &Filter,
        options: &QueryOptions,
    ) -> DbResult<Vec<Record>> {
        let where_clause = to_surql_where(schema, filter)?;
        let order = surql_order_clause(schema, options)?;
        if options.limit == Some(0) {
            return Ok(Vec::new());
        }

        let mut vars = table_vars(schema);
        vars.extend(where_clause.vars.clone());
        let sql = format!(
            "SELECT {} FROM type::table($tb){}{}{};",
            RECORD_FIELDS,
            where_clause.to_surql(),
            order,
            surql_page_clause(options)
        );

        let rows: Vec<Value> = {
            let _permit = self.permit().await?;
            let mut response = self.db.query(sql).bind(vars).await?.check()?;
            response.take(0)?
        };

        let mut records = rows
            .into_iter()
            .map(|row| normalize(schema, row))
            .collect::<DbResult<Vec<_>>>()?;

        // resolve_relation calls back into find; the recursion must be boxed.
        for name in &options.relations {
            Box::pin(self.resolve_relation(schema, &mut records, name)).await?;
        }
        Ok(records)
    }

    pub(super) async fn find_one(
        &self,
        schema: &CollectionSchema,
        filter: &Filter,
        options: &QueryOptions,
    ) -> DbResult<Option<Record>> {
        let options = QueryOptions {
            limit: Some(1),
            ..options.clone()
        };
        Ok(self.find(schema, filter, &options).await?.into_iter().next())
    }

    pub(super) async fn update(
        &self,
        schema: &CollectionSchema,
        filter: &Filter,
        patch: Record,
    ) -> DbResult<u64> {
        let changes = prepare_update(schema, patch)?;
        let where_clause = to_surql_where(schema, filter)?;

        let mut vars = table_vars(schema);
        vars.extend(where_clause.vars.clone());
        let mut assignments = Vec::with_capacity(changes.len());
        for (i, (field, value)) in changes.into_inner().into_iter().enumerate() {
            if value.is_null() {
                assignments.push(format!("`{}` = NONE", field));
            } else {
                let var = format!("s{}", i);
                assignments.push(format!("`{}` = ${}", field, var));
                vars.insert(var, value);
            }
        }

        let sql = format!(
            "LET $changed = UPDATE type::table($tb) SET {}{} RETURN id; RETURN array::len($changed);",
            assignments.join(", "),
            where_clause.to_surql()
        );

        let _permit = self.permit().await?;
        let mut response = self.db.query(sql).bind(vars).await?.check()?;
        let changed: Option<i64> = response.take(1)?;
        Ok(changed.unwrap_or(0).max(0) as u64)
    }

    pub(super) async fn update_by_id(
        &self,
        schema: &CollectionSchema,
        id: &str,
        patch: Record,
    ) -> DbResult<Option<Record>> {
        let filter = Filter::by_id(id);
        if self.update(schema, &filter, patch).await? == 0 {
            return Ok(None);
        }
        self.find_one(schema, &filter, &QueryOptions::default()).await
    }

    pub(super) async fn delete(&self, schema: &CollectionSchema, filter: &Filter) -> DbResult<u64> {
        let where_clause = to_surql_where(schema, filter)?;
        let mut vars = table_vars(schema);
        vars.extend(where_clause.vars.clone());
        let sql = format!(
            "LET $gone = DELETE type::table($tb){} RETURN BEFORE; RETURN array::len($gone);",
            where_clause.to_surql()
        );

        let _permit = self.permit().await?;
        let mut response = self.db.query(sql).bind(vars).await?.check()?;
        let gone: Option<i64> = response.take(1)?;
        Ok(gone.unwrap_or(0).max(0) as u64)
    }

    pub(super) async fn count(&self, schema: &CollectionSchema, filter: &Filter) -> DbResult<u64> {
        let where_clause = to_surql_where(schema, filter)?;
        let mut vars = table_vars(schema);
        vars.extend(where_clause.vars.clone());
        let sql = format!(
            "SELECT count() AS total FROM type::table($tb){} GROUP ALL;",
            where_clause.to_surql()
        );

        let _permit = self.permit().await?;
        let mut response = self.db.query(sql).bind(vars).await?.check()?;
        let rows: Vec<Value> = response.take(0)?;
        Ok(rows
            .first()
            .and_then(|row| row.get("total"))
            .and_then(Value::as_u64)
            .unwrap_or(0))
    }

    /// Attach the record named by `relation.field` under the relation name.
    async fn resolve_relation(
        &self,
        schema: &CollectionSchema,
        records: &mut [Record],
        name: &str,
    ) -> DbResult<()> {
        let relation = schema.relation_named(name).ok_or_else(|| {
            DbError::invalid(
                format!("unknown relation '{}' on '{}'", name, schema.name),
                "declare the relation in the collection catalog",
            )
        })?;
        let target = self.schema(&relation.collection)?;

        let mut seen = HashSet::new();
        let ids: Vec<Value> = records
            .iter()
            .filter_map(|r| r.get(&relation.field).and_then(Value::as_str))
            .filter(|id| seen.insert(id.to_string()))
            .map(|id| Value::String(id.to_string()))
            .collect();
        if ids.is_empty() {
            return Ok(());
        }

        let related: HashMap<String, Record> = self
            .find(target, &Filter::new().is_in(ID_FIELD, ids), &QueryOptions::default())
            .await?
            .into_iter()
            .filter_map(|r| r.id().map(str::to_string).map(|id| (id, r)))
            .collect();

        for record in records.iter_mut() {
            let foreign = record
                .get(&relation.field)
                .and_then(Value::as_str)
                .and_then(|id| related.get(id))
                .cloned();
            if let Some(foreign) = foreign {
                record.insert(name.to_string(), Value::Object(foreign.into_inner()));
            }
        }
        Ok(())
    }
}

fn table_vars(schema: &CollectionSchema) -> Map<String, Value> {
    let mut vars = Map::new();
    vars.insert("tb".to_string(), Value::String(schema.name.clone()));
    vars
}

/// Turn a returned row into a plain record.
///
/// Drops nulls and reduces any native record id form to its string key.
fn normalize(schema: &CollectionSchema, row: Value) -> DbResult<Record> {
    let Value::Object(mut map) = row else {
        return Err(DbError::Database {
            message: format!("unexpected row shape from '{}': {}", schema.name, row),
        });
    };
    map.retain(|_, v| !v.is_null());
    if let Some(raw) = map.remove(ID_FIELD) {
        let id = record_key(&schema.name, raw).ok_or_else(|| DbError::Database {
            message: format!("record in '{}' has no usable id", schema.name),
        })?;
        map.insert(ID_FIELD.to_string(), Value::String(id));
    }
    Ok(Record::from(map))
}

fn record_key(table: &str, raw: Value) -> Option<String> {
    match raw {
        Value::String(s) => {
            let prefix = format!("{}:", table);
            Some(s.strip_prefix(&prefix).map(str::to_string).unwrap_or(s))
        }
        Value::Number(n) => Some(n.to_string()),
        // Serialized native ids look like {"tb": ..., "id": {"String": ...}}.
        Value::Object(mut inner) => {
            let key = inner
                .remove("id")
                .or_else(|| inner.remove("String"))
                .or_else(|| inner.remove("Number"))?;
            record_key(table, key)
        }
        _ => None,
    }
}
