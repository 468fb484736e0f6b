//! SurrealDB connection ownership and collection registration.

use std::sync::Arc;
use std::time::Duration;

use surrealdb::engine::any;
use surrealdb::opt::auth::Root;
use tokio::sync::{OwnedRwLockReadGuard, OwnedRwLockWriteGuard, RwLock};
use tracing::{info, instrument};

use super::records::SurrealHandle;
use super::transaction::SurrealTransaction;
use crate::config::SurrealConfig;
use crate::db::models::ID_FIELD;
use crate::db::schema::Catalog;
use crate::db::{DbError, DbResult, Filter, QueryOptions, Record};

/// Document adapter backed by SurrealDB.
///
/// The client multiplexes concurrent operations internally; `pool_size`
/// bounds how many are in flight at once.
///
/// Plain operations share `gate`; an atomic block holds it exclusively
/// until it commits or rolls back, so nothing outside the block observes
/// or overwrites its uncommitted writes.
pub(crate) struct SurrealAdapter {
    handle: SurrealHandle,
    gate: Arc<RwLock<()>>,
    /// How long an operation waits for a running atomic block.
    wait: Duration,
}

impl SurrealAdapter {
    #[instrument(skip_all, fields(endpoint = %config.endpoint))]
    pub async fn connect(config: &SurrealConfig, catalog: Arc<Catalog>) -> DbResult<Self> {
        catalog.validate()?;

        let timeout = Duration::from_millis(config.connect_timeout_ms);
        let connecting = async {
            let db = any::connect(config.endpoint.clone()).await?;
            if let (Some(username), Some(password)) = (&config.username, &config.password) {
                db.signin(Root {
                    username: username.as_str(),
                    password: password.as_str(),
                })
                .await?;
            }
            db.use_ns(config.namespace.clone())
                .use_db(config.database.clone())
                .await?;
            Ok::<_, surrealdb::Error>(db)
        };

        let db = tokio::time::timeout(timeout, connecting)
            .await
            .map_err(|_| DbError::Connection {
                message: format!(
                    "timed out after {}ms connecting to {}",
                    config.connect_timeout_ms, config.endpoint
                ),
            })?
            .map_err(|e| DbError::Connection {
                message: e.to_string(),
            })?;

        let adapter = Self {
            handle: SurrealHandle::new(db, catalog, config.pool_size),
            gate: Arc::new(RwLock::new(())),
            wait: timeout,
        };
        adapter.register_collections().await?;
        info!("SurrealDB storage ready");
        Ok(adapter)
    }

    /// Define every collection and its indexes. Safe to run repeatedly.
    pub(super) async fn register_collections(&self) -> DbResult<()> {
        let mut statements = Vec::new();
        for schema in self.handle.catalog.iter() {
            statements.push(format!(
                "DEFINE TABLE IF NOT EXISTS `{}` SCHEMALESS;",
                schema.name
            ));
            for index in schema.indexes.iter().filter(|i| i.field != ID_FIELD) {
                statements.push(format!(
                    "DEFINE INDEX IF NOT EXISTS `idx_{t}_{f}` ON TABLE `{t}` FIELDS `{f}`{u};",
                    t = schema.name,
                    f = index.field,
                    u = if index.unique { " UNIQUE" } else { "" }
                ));
            }
        }

        self.handle
            .db
            .query(statements.join("\n"))
            .await
            .and_then(|response| response.check())
            .map_err(|e| DbError::Schema {
                message: format!("Failed to register collections: {}", e),
            })?;
        Ok(())
    }

    pub async fn disconnect(&self) {
        self.handle.close();
        info!("SurrealDB storage closed");
    }

    async fn shared(&self) -> DbResult<OwnedRwLockReadGuard<()>> {
        tokio::time::timeout(self.wait, Arc::clone(&self.gate).read_owned())
            .await
            .map_err(|_| self.busy())
    }

    async fn exclusive(&self) -> DbResult<OwnedRwLockWriteGuard<()>> {
        tokio::time::timeout(self.wait, Arc::clone(&self.gate).write_owned())
            .await
            .map_err(|_| self.busy())
    }

    fn busy(&self) -> DbError {
        DbError::Connection {
            message: format!(
                "timed out after {}ms waiting for an atomic block to finish",
                self.wait.as_millis()
            ),
        }
    }

    pub async fn begin(&self) -> DbResult<SurrealTransaction> {
        let guard = self.exclusive().await?;
        Ok(SurrealTransaction::new(self.handle.clone(), guard))
    }

    pub async fn create(&self, collection: &str, data: Record) -> DbResult<Record> {
        let schema = self.handle.schema(collection)?;
        let _shared = self.shared().await?;
        self.handle.create(schema, data).await
    }

    pub async fn find(
        &self,
        collection: &str,
        filter: &Filter,
        options: &QueryOptions,
    ) -> DbResult<Vec<Record>> {
        let schema = self.handle.schema(collection)?;
        let _shared = self.shared().await?;
        self.handle.find(schema, filter, options).await
    }

    pub async fn find_one(
        &self,
        collection: &str,
        filter: &Filter,
        options: &QueryOptions,
    ) -> DbResult<Option<Record>> {
        let schema = self.handle.schema(collection)?;
        let _shared = self.shared().await?;
        self.handle.find_one(schema, filter, options).await
    }

    pub async fn update(&self, collection: &str, filter: &Filter, patch: Record) -> DbResult<u64> {
        let schema = self.handle.schema(collection)?;
        let _shared = self.shared().await?;
        self.handle.update(schema, filter, patch).await
    }

    pub async fn update_by_id(
        &self,
        collection: &str,
        id: &str,
        patch: Record,
    ) -> DbResult<Option<Record>> {
        let schema = self.handle.schema(collection)?;
        let _shared = self.shared().await?;
        self.handle.update_by_id(schema, id, patch).await
    }

    pub async fn delete(&self, collection: &str, filter: &Filter) -> DbResult<u64> {
        let schema = self.handle.schema(collection)?;
        let _shared = self.shared().await?;
        self.handle.delete(schema, filter).await
    }

    pub async fn count(&self, collection: &str, filter: &Filter) -> DbResult<u64> {
        let schema = self.handle.schema(collection)?;
        let _shared = self.shared().await?;
        self.handle.count(schema, filter).await
    }
}
