//! Atomic blocks for the document backend.
//!
//! Writes issued through a [`SurrealTransaction`] apply immediately and
//! record how to undo themselves. Rolling back replays the undo log in
//! reverse inside one SurrealDB transaction, restoring every touched record
//! to its pre-image. A block holds the adapter's gate exclusively for its
//! whole duration: no other block or plain operation runs until it ends, so
//! its writes are never observed early and restoring pre-images cannot
//! discard anyone else's changes.

use serde_json::{Map, Value};
use tokio::sync::OwnedRwLockWriteGuard;
use tracing::debug;

use super::records::SurrealHandle;
use crate::db::models::ID_FIELD;
use crate::db::{DbError, DbResult, Filter, QueryOptions, Record};

enum Undo {
    /// Remove a record created inside the block.
    Remove { table: String, id: String },
    /// Put back a record as it was before an update or delete.
    Restore { table: String, record: Record },
}

pub(crate) struct SurrealTransaction {
    handle: SurrealHandle,
    journal: Vec<Undo>,
    _exclusive: OwnedRwLockWriteGuard<()>,
}

impl SurrealTransaction {
    pub(super) fn new(handle: SurrealHandle, exclusive: OwnedRwLockWriteGuard<()>) -> Self {
        Self {
            handle,
            journal: Vec::new(),
            _exclusive: exclusive,
        }
    }

    pub async fn commit(self) -> DbResult<()> {
        debug!(writes = self.journal.len(), "Committing document transaction");
        Ok(())
    }

    pub async fn rollback(self) -> DbResult<()> {
        if self.journal.is_empty() {
            return Ok(());
        }

        let mut statements = vec!["BEGIN TRANSACTION;".to_string()];
        let mut vars = Map::new();
        for (i, undo) in self.journal.iter().rev().enumerate() {
            let (table, id) = match undo {
                Undo::Remove { table, id } => (table, id.as_str()),
                Undo::Restore { table, record } => (table, record.id().unwrap_or_default()),
            };
            vars.insert(format!("t{}", i), Value::String(table.clone()));
            vars.insert(format!("k{}", i), Value::String(id.to_string()));
            statements.push(format!("DELETE type::thing($t{i}, $k{i});", i = i));

            if let Undo::Restore { record, .. } = undo {
                let content = record.without(&[ID_FIELD]).into_inner();
                vars.insert(format!("d{}", i), Value::Object(content));
                statements.push(format!(
                    "CREATE type::thing($t{i}, $k{i}) CONTENT $d{i};",
                    i = i
                ));
            }
        }
        statements.push("COMMIT TRANSACTION;".to_string());

        debug!(writes = self.journal.len(), "Rolling back document transaction");
        self.handle
            .db
            .query(statements.join("\n"))
            .bind(vars)
            .await?
            .check()?;
        Ok(())
    }

    pub async fn create(&mut self, collection: &str, data: Record) -> DbResult<Record> {
        let schema = self.handle.schema(collection)?;
        let record = self.handle.create(schema, data).await?;
        let id = record.id().ok_or_else(|| DbError::Database {
            message: format!("created record in '{}' has no id", collection),
        })?;
        self.journal.push(Undo::Remove {
            table: schema.name.clone(),
            id: id.to_string(),
        });
        Ok(record)
    }

    pub async fn find(
        &mut self,
        collection: &str,
        filter: &Filter,
        options: &QueryOptions,
    ) -> DbResult<Vec<Record>> {
        let schema = self.handle.schema(collection)?;
        self.handle.find(schema, filter, options).await
    }

    pub async fn find_one(
        &mut self,
        collection: &str,
        filter: &Filter,
        options: &QueryOptions,
    ) -> DbResult<Option<Record>> {
        let schema = self.handle.schema(collection)?;
        self.handle.find_one(schema, filter, options).await
    }

    pub async fn update(
        &mut self,
        collection: &str,
        filter: &Filter,
        patch: Record,
    ) -> DbResult<u64> {
        let schema = self.handle.schema(collection)?;
        let before = self.handle.find(schema, filter, &QueryOptions::default()).await?;
        if before.is_empty() {
            return Ok(0);
        }

        let changed = self
            .handle
            .update(schema, &ids_filter(&before), patch)
            .await?;
        self.journal
            .extend(before.into_iter().map(|record| Undo::Restore {
                table: schema.name.clone(),
                record,
            }));
        Ok(changed)
    }

    pub async fn update_by_id(
        &mut self,
        collection: &str,
        id: &str,
        patch: Record,
    ) -> DbResult<Option<Record>> {
        let filter = Filter::by_id(id);
        if self.update(collection, &filter, patch).await? == 0 {
            return Ok(None);
        }
        self.find_one(collection, &filter, &QueryOptions::default())
            .await
    }

    pub async fn delete(&mut self, collection: &str, filter: &Filter) -> DbResult<u64> {
        let schema = self.handle.schema(collection)?;
        let before = self.handle.find(schema, filter, &QueryOptions::default()).await?;
        if before.is_empty() {
            return Ok(0);
        }

        let removed = self.handle.delete(schema, &ids_filter(&before)).await?;
        self.journal
            .extend(before.into_iter().map(|record| Undo::Restore {
                table: schema.name.clone(),
                record,
            }));
        Ok(removed)
    }

    pub async fn count(&mut self, collection: &str, filter: &Filter) -> DbResult<u64> {
        let schema = self.handle.schema(collection)?;
        self.handle.count(schema, filter).await
    }
}

fn ids_filter(records: &[Record]) -> Filter {
    Filter::new().is_in(
        ID_FIELD,
        records
            .iter()
            .filter_map(Record::id)
            .map(|id| Value::String(id.to_string())),
    )
}
