//! Storage facade.
//!
//! [`Storage`] is the single entry point the rest of the application uses.
//! It owns exactly one backend adapter, chosen by configuration at startup,
//! and forwards every operation to it. Callers never learn which backend
//! is active.
//!
//! ```no_run
//! use showroom::config::StorageConfig;
//! use showroom::db::{Filter, QueryOptions, SortDirection, Storage};
//!
//! # async fn demo() -> showroom::db::DbResult<()> {
//! let storage = Storage::connect(&StorageConfig::default()).await?;
//! let cars = storage
//!     .find(
//!         "cars",
//!         &Filter::new().gte("price", 20_000).eq("status", "available"),
//!         &QueryOptions::new().sort("price", SortDirection::Desc).limit(10),
//!     )
//!     .await?;
//! # Ok(())
//! # }
//! ```

use std::sync::{Arc, OnceLock};

use futures_util::future::BoxFuture;
use tracing::{instrument, warn};

use super::sqlite::{SqliteAdapter, SqliteTransaction};
use super::surreal::{SurrealAdapter, SurrealTransaction};
use crate::config::{BackendConfig, ConfigError, StorageConfig};
use crate::db::schema::Catalog;
use crate::db::{DbError, DbResult, Filter, QueryOptions, Record};

static STORAGE: OnceLock<Storage> = OnceLock::new();

enum Backend {
    Sqlite(SqliteAdapter),
    Surreal(SurrealAdapter),
}

/// Backend-neutral access to every collection.
pub struct Storage {
    backend: Backend,
    catalog: Arc<Catalog>,
}

impl Storage {
    /// Connect using the configured backend and catalog.
    pub async fn connect(config: &StorageConfig) -> DbResult<Self> {
        let catalog = config.load_catalog().map_err(|e| match e {
            ConfigError::Catalog(e) => e,
            other => DbError::Schema {
                message: other.to_string(),
            },
        })?;
        Self::connect_with_catalog(&config.backend, catalog).await
    }

    #[instrument(skip_all, fields(backend = config.kind()))]
    pub async fn connect_with_catalog(config: &BackendConfig, catalog: Catalog) -> DbResult<Self> {
        let catalog = Arc::new(catalog);
        let backend = match config {
            BackendConfig::Sqlite(sqlite) => {
                Backend::Sqlite(SqliteAdapter::connect(sqlite, Arc::clone(&catalog)).await?)
            }
            BackendConfig::Surreal(surreal) => {
                Backend::Surreal(SurrealAdapter::connect(surreal, Arc::clone(&catalog)).await?)
            }
        };
        Ok(Self { backend, catalog })
    }

    /// Make `storage` the process-wide instance.
    pub fn install(storage: Storage) -> DbResult<&'static Storage> {
        STORAGE
            .set(storage)
            .map_err(|_| DbError::AlreadyInitialized)?;
        Self::global()
    }

    /// The process-wide instance registered by [`Storage::install`].
    pub fn global() -> DbResult<&'static Storage> {
        STORAGE.get().ok_or(DbError::NotInitialized)
    }

    pub fn backend_kind(&self) -> &'static str {
        match &self.backend {
            Backend::Sqlite(_) => "sqlite",
            Backend::Surreal(_) => "surreal",
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Release the connection. Later calls fail with a connection error.
    pub async fn disconnect(&self) {
        match &self.backend {
            Backend::Sqlite(adapter) => adapter.disconnect().await,
            Backend::Surreal(adapter) => adapter.disconnect().await,
        }
    }

    #[instrument(skip(self, data))]
    pub async fn create(&self, collection: &str, data: Record) -> DbResult<Record> {
        match &self.backend {
            Backend::Sqlite(adapter) => adapter.create(collection, data).await,
            Backend::Surreal(adapter) => adapter.create(collection, data).await,
        }
    }

    #[instrument(skip(self))]
    pub async fn find(
        &self,
        collection: &str,
        filter: &Filter,
        options: &QueryOptions,
    ) -> DbResult<Vec<Record>> {
        match &self.backend {
            Backend::Sqlite(adapter) => adapter.find(collection, filter, options).await,
            Backend::Surreal(adapter) => adapter.find(collection, filter, options).await,
        }
    }

    #[instrument(skip(self))]
    pub async fn find_one(
        &self,
        collection: &str,
        filter: &Filter,
        options: &QueryOptions,
    ) -> DbResult<Option<Record>> {
        match &self.backend {
            Backend::Sqlite(adapter) => adapter.find_one(collection, filter, options).await,
            Backend::Surreal(adapter) => adapter.find_one(collection, filter, options).await,
        }
    }

    pub async fn find_by_id(&self, collection: &str, id: &str) -> DbResult<Option<Record>> {
        self.find_one(collection, &Filter::by_id(id), &QueryOptions::default())
            .await
    }

    #[instrument(skip(self, patch))]
    pub async fn update(&self, collection: &str, filter: &Filter, patch: Record) -> DbResult<u64> {
        match &self.backend {
            Backend::Sqlite(adapter) => adapter.update(collection, filter, patch).await,
            Backend::Surreal(adapter) => adapter.update(collection, filter, patch).await,
        }
    }

    #[instrument(skip(self, patch))]
    pub async fn update_by_id(
        &self,
        collection: &str,
        id: &str,
        patch: Record,
    ) -> DbResult<Option<Record>> {
        match &self.backend {
            Backend::Sqlite(adapter) => adapter.update_by_id(collection, id, patch).await,
            Backend::Surreal(adapter) => adapter.update_by_id(collection, id, patch).await,
        }
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, collection: &str, filter: &Filter) -> DbResult<u64> {
        match &self.backend {
            Backend::Sqlite(adapter) => adapter.delete(collection, filter).await,
            Backend::Surreal(adapter) => adapter.delete(collection, filter).await,
        }
    }

    pub async fn delete_by_id(&self, collection: &str, id: &str) -> DbResult<bool> {
        Ok(self.delete(collection, &Filter::by_id(id)).await? > 0)
    }

    #[instrument(skip(self))]
    pub async fn count(&self, collection: &str, filter: &Filter) -> DbResult<u64> {
        match &self.backend {
            Backend::Sqlite(adapter) => adapter.count(collection, filter).await,
            Backend::Surreal(adapter) => adapter.count(collection, filter).await,
        }
    }

    async fn begin(&self) -> DbResult<Transaction> {
        let inner = match &self.backend {
            Backend::Sqlite(adapter) => TransactionInner::Sqlite(adapter.begin().await?),
            Backend::Surreal(adapter) => TransactionInner::Surreal(adapter.begin().await?),
        };
        Ok(Transaction { inner })
    }

    /// Run `f` so that all of its writes become visible together or not at all.
    ///
    /// The block commits when `f` returns `Ok`. On `Err` every write made
    /// through the transaction is undone and the error is returned as is.
    ///
    /// Operations inside the block must go through the provided
    /// [`Transaction`]; calling back into `self` from inside waits for the
    /// block to finish on the relational backend.
    ///
    /// ```no_run
    /// # use showroom::db::{DbError, Record, Storage};
    /// # async fn demo(storage: &Storage) -> Result<(), DbError> {
    /// storage
    ///     .run_atomic(|tx| {
    ///         Box::pin(async move {
    ///             let car = tx.create("cars", Record::new().with("slug", "gt-86")).await?;
    ///             let id = car.id().unwrap_or_default().to_string();
    ///             tx.create("testimonials", Record::new().with("carId", id)).await?;
    ///             Ok::<_, DbError>(())
    ///         })
    ///     })
    ///     .await
    /// # }
    /// ```
    #[instrument(skip_all, fields(backend = self.backend_kind()))]
    pub async fn run_atomic<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: for<'c> FnOnce(&'c mut Transaction) -> BoxFuture<'c, Result<T, E>>,
        E: From<DbError>,
    {
        let mut tx = self.begin().await?;
        match f(&mut tx).await {
            Ok(value) => {
                tx.commit().await?;
                Ok(value)
            }
            Err(e) => {
                if let Err(rollback) = tx.rollback().await {
                    warn!(error = %rollback, "Rollback of atomic block failed");
                }
                Err(e)
            }
        }
    }
}

enum TransactionInner {
    Sqlite(SqliteTransaction),
    Surreal(SurrealTransaction),
}

/// Transactional context handed to a [`Storage::run_atomic`] block.
///
/// Exposes the same operations as [`Storage`]; nothing written through it
/// is kept unless the block succeeds.
pub struct Transaction {
    inner: TransactionInner,
}

impl Transaction {
    async fn commit(self) -> DbResult<()> {
        match self.inner {
            TransactionInner::Sqlite(tx) => tx.commit().await,
            TransactionInner::Surreal(tx) => tx.commit().await,
        }
    }

    async fn rollback(self) -> DbResult<()> {
        match self.inner {
            TransactionInner::Sqlite(tx) => tx.rollback().await,
            TransactionInner::Surreal(tx) => tx.rollback().await,
        }
    }

    pub async fn create(&mut self, collection: &str, data: Record) -> DbResult<Record> {
        match &mut self.inner {
            TransactionInner::Sqlite(tx) => tx.create(collection, data).await,
            TransactionInner::Surreal(tx) => tx.create(collection, data).await,
        }
    }

    pub async fn find(
        &mut self,
        collection: &str,
        filter: &Filter,
        options: &QueryOptions,
    ) -> DbResult<Vec<Record>> {
        match &mut self.inner {
            TransactionInner::Sqlite(tx) => tx.find(collection, filter, options).await,
            TransactionInner::Surreal(tx) => tx.find(collection, filter, options).await,
        }
    }

    pub async fn find_one(
        &mut self,
        collection: &str,
        filter: &Filter,
        options: &QueryOptions,
    ) -> DbResult<Option<Record>> {
        match &mut self.inner {
            TransactionInner::Sqlite(tx) => tx.find_one(collection, filter, options).await,
            TransactionInner::Surreal(tx) => tx.find_one(collection, filter, options).await,
        }
    }

    pub async fn find_by_id(&mut self, collection: &str, id: &str) -> DbResult<Option<Record>> {
        self.find_one(collection, &Filter::by_id(id), &QueryOptions::default())
            .await
    }

    pub async fn update(
        &mut self,
        collection: &str,
        filter: &Filter,
        patch: Record,
    ) -> DbResult<u64> {
        match &mut self.inner {
            TransactionInner::Sqlite(tx) => tx.update(collection, filter, patch).await,
            TransactionInner::Surreal(tx) => tx.update(collection, filter, patch).await,
        }
    }

    pub async fn update_by_id(
        &mut self,
        collection: &str,
        id: &str,
        patch: Record,
    ) -> DbResult<Option<Record>> {
        match &mut self.inner {
            TransactionInner::Sqlite(tx) => tx.update_by_id(collection, id, patch).await,
            TransactionInner::Surreal(tx) => tx.update_by_id(collection, id, patch).await,
        }
    }

    pub async fn delete(&mut self, collection: &str, filter: &Filter) -> DbResult<u64> {
        match &mut self.inner {
            TransactionInner::Sqlite(tx) => tx.delete(collection, filter).await,
            TransactionInner::Surreal(tx) => tx.delete(collection, filter).await,
        }
    }

    pub async fn delete_by_id(&mut self, collection: &str, id: &str) -> DbResult<bool> {
        Ok(self.delete(collection, &Filter::by_id(id)).await? > 0)
    }

    pub async fn count(&mut self, collection: &str, filter: &Filter) -> DbResult<u64> {
        match &mut self.inner {
            TransactionInner::Sqlite(tx) => tx.count(collection, filter).await,
            TransactionInner::Surreal(tx) => tx.count(collection, filter).await,
        }
    }
}
