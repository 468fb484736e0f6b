//! SQLite transaction context.

use std::sync::Arc;

use sqlx::Sqlite;

use super::records;
use crate::db::schema::Catalog;
use crate::db::{DbResult, Filter, QueryOptions, Record};

/// An open sqlx transaction plus the catalog needed to encode records.
///
/// Dropping it without committing rolls back.
pub(crate) struct SqliteTransaction {
    tx: sqlx::Transaction<'static, Sqlite>,
    catalog: Arc<Catalog>,
}

impl SqliteTransaction {
    pub(super) fn new(tx: sqlx::Transaction<'static, Sqlite>, catalog: Arc<Catalog>) -> Self {
        Self { tx, catalog }
    }

    pub async fn commit(self) -> DbResult<()> {
        self.tx.commit().await?;
        Ok(())
    }

    pub async fn rollback(self) -> DbResult<()> {
        self.tx.rollback().await?;
        Ok(())
    }

    pub async fn create(&mut self, collection: &str, data: Record) -> DbResult<Record> {
        let schema = self.catalog.collection(collection)?;
        records::create(&mut self.tx, schema, data).await
    }

    pub async fn find(
        &mut self,
        collection: &str,
        filter: &Filter,
        options: &QueryOptions,
    ) -> DbResult<Vec<Record>> {
        let schema = self.catalog.collection(collection)?;
        records::find(&mut self.tx, schema, filter, options).await
    }

    pub async fn find_one(
        &mut self,
        collection: &str,
        filter: &Filter,
        options: &QueryOptions,
    ) -> DbResult<Option<Record>> {
        let schema = self.catalog.collection(collection)?;
        records::find_one(&mut self.tx, schema, filter, options).await
    }

    pub async fn update(
        &mut self,
        collection: &str,
        filter: &Filter,
        patch: Record,
    ) -> DbResult<u64> {
        let schema = self.catalog.collection(collection)?;
        records::update(&mut self.tx, schema, filter, patch).await
    }

    pub async fn update_by_id(
        &mut self,
        collection: &str,
        id: &str,
        patch: Record,
    ) -> DbResult<Option<Record>> {
        let schema = self.catalog.collection(collection)?;
        records::update_by_id(&mut self.tx, schema, id, patch).await
    }

    pub async fn delete(&mut self, collection: &str, filter: &Filter) -> DbResult<u64> {
        let schema = self.catalog.collection(collection)?;
        records::delete(&mut self.tx, schema, filter).await
    }

    pub async fn count(&mut self, collection: &str, filter: &Filter) -> DbResult<u64> {
        let schema = self.catalog.collection(collection)?;
        records::count(&mut self.tx, schema, filter).await
    }
}
