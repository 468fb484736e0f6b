//! SQLite connection ownership and schema bootstrap.

use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use sqlx::sqlite::{
    SqliteConnectOptions, SqliteConnection, SqliteJournalMode, SqlitePool, SqlitePoolOptions,
};
use sqlx::ConnectOptions;
use tracing::{debug, info, instrument};

use super::records;
use super::transaction::SqliteTransaction;
use crate::config::SqliteConfig;
use crate::db::models::{CREATED_AT_FIELD, ID_FIELD, UPDATED_AT_FIELD};
use crate::db::schema::{Catalog, CollectionSchema};
use crate::db::translate::quote_sql;
use crate::db::{DbError, DbResult, Filter, QueryOptions, Record};

/// Relational adapter backed by a single SQLite connection.
///
/// The pool is capped at one connection, so statements are serialized on
/// one handle while the adapter itself stays safe to share across tasks.
pub(crate) struct SqliteAdapter {
    pool: SqlitePool,
    catalog: Arc<Catalog>,
}

impl SqliteAdapter {
    /// Open the database, then create any missing tables and indexes.
    #[instrument(skip_all, fields(path = %config.path.display()))]
    pub async fn connect(config: &SqliteConfig, catalog: Arc<Catalog>) -> DbResult<Self> {
        catalog.validate()?;

        let timeout = Duration::from_millis(config.connect_timeout_ms);
        let mut options = if config.path == Path::new(":memory:") {
            SqliteConnectOptions::from_str("sqlite::memory:").map_err(|e| {
                DbError::Connection {
                    message: e.to_string(),
                }
            })?
        } else {
            SqliteConnectOptions::new()
                .filename(&config.path)
                .create_if_missing(true)
                .journal_mode(SqliteJournalMode::Wal)
        };
        if !config.verbose {
            options = options.disable_statement_logging();
        }

        let connecting = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .acquire_timeout(timeout)
            .connect_with(options);

        let pool = tokio::time::timeout(timeout, connecting)
            .await
            .map_err(|_| DbError::Connection {
                message: format!(
                    "timed out after {}ms opening {}",
                    config.connect_timeout_ms,
                    config.path.display()
                ),
            })?
            .map_err(|e| DbError::Connection {
                message: e.to_string(),
            })?;

        let adapter = Self { pool, catalog };
        adapter.bootstrap().await?;
        info!("SQLite storage ready");
        Ok(adapter)
    }

    /// Create tables and indexes if absent. Safe to run repeatedly.
    async fn bootstrap(&self) -> DbResult<()> {
        let mut conn = self.pool.acquire().await?;
        for schema in self.catalog.iter() {
            bootstrap_collection(&mut conn, schema).await?;
        }
        Ok(())
    }

    pub async fn disconnect(&self) {
        self.pool.close().await;
        info!("SQLite storage closed");
    }

    #[cfg(test)]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn begin(&self) -> DbResult<SqliteTransaction> {
        let tx = self.pool.begin().await?;
        Ok(SqliteTransaction::new(tx, Arc::clone(&self.catalog)))
    }

    pub async fn create(&self, collection: &str, data: Record) -> DbResult<Record> {
        let schema = self.catalog.collection(collection)?;
        let mut conn = self.pool.acquire().await?;
        records::create(&mut conn, schema, data).await
    }

    pub async fn find(
        &self,
        collection: &str,
        filter: &Filter,
        options: &QueryOptions,
    ) -> DbResult<Vec<Record>> {
        let schema = self.catalog.collection(collection)?;
        let mut conn = self.pool.acquire().await?;
        records::find(&mut conn, schema, filter, options).await
    }

    pub async fn find_one(
        &self,
        collection: &str,
        filter: &Filter,
        options: &QueryOptions,
    ) -> DbResult<Option<Record>> {
        let schema = self.catalog.collection(collection)?;
        let mut conn = self.pool.acquire().await?;
        records::find_one(&mut conn, schema, filter, options).await
    }

    pub async fn update(&self, collection: &str, filter: &Filter, patch: Record) -> DbResult<u64> {
        let schema = self.catalog.collection(collection)?;
        let mut conn = self.pool.acquire().await?;
        records::update(&mut conn, schema, filter, patch).await
    }

    pub async fn update_by_id(
        &self,
        collection: &str,
        id: &str,
        patch: Record,
    ) -> DbResult<Option<Record>> {
        let schema = self.catalog.collection(collection)?;
        let mut conn = self.pool.acquire().await?;
        records::update_by_id(&mut conn, schema, id, patch).await
    }

    pub async fn delete(&self, collection: &str, filter: &Filter) -> DbResult<u64> {
        let schema = self.catalog.collection(collection)?;
        let mut conn = self.pool.acquire().await?;
        records::delete(&mut conn, schema, filter).await
    }

    pub async fn count(&self, collection: &str, filter: &Filter) -> DbResult<u64> {
        let schema = self.catalog.collection(collection)?;
        let mut conn = self.pool.acquire().await?;
        records::count(&mut conn, schema, filter).await
    }
}

async fn bootstrap_collection(
    conn: &mut SqliteConnection,
    schema: &CollectionSchema,
) -> DbResult<()> {
    let table = quote_sql(&schema.name);
    let schema_err = |e: sqlx::Error| DbError::Schema {
        message: format!("Failed to bootstrap '{}': {}", schema.name, e),
    };

    let mut columns = vec![format!("{} TEXT PRIMARY KEY", quote_sql(ID_FIELD))];
    columns.extend(
        schema
            .columns
            .iter()
            .map(|c| format!("{} {}", quote_sql(&c.name), c.ty.sql())),
    );
    columns.push(format!("{} TEXT NOT NULL", quote_sql(CREATED_AT_FIELD)));
    columns.push(format!("{} TEXT NOT NULL", quote_sql(UPDATED_AT_FIELD)));

    let create_table = format!(
        "CREATE TABLE IF NOT EXISTS {} ({})",
        table,
        columns.join(", ")
    );
    sqlx::query(&create_table)
        .execute(&mut *conn)
        .await
        .map_err(schema_err)?;

    // Tables created by an older catalog get the newly declared columns.
    let existing: Vec<String> = sqlx::query_scalar("SELECT name FROM pragma_table_info(?)")
        .bind(&schema.name)
        .fetch_all(&mut *conn)
        .await
        .map_err(schema_err)?;
    for column in &schema.columns {
        if existing.iter().any(|name| name == &column.name) {
            continue;
        }
        debug!(collection = %schema.name, column = %column.name, "Adding missing column");
        let alter = format!(
            "ALTER TABLE {} ADD COLUMN {} {}",
            table,
            quote_sql(&column.name),
            column.ty.sql()
        );
        sqlx::query(&alter)
            .execute(&mut *conn)
            .await
            .map_err(schema_err)?;
    }

    for index in &schema.indexes {
        let create_index = format!(
            "CREATE {}INDEX IF NOT EXISTS {} ON {} ({})",
            if index.unique { "UNIQUE " } else { "" },
            quote_sql(&format!("idx_{}_{}", schema.name, index.field)),
            table,
            quote_sql(&index.field)
        );
        sqlx::query(&create_index)
            .execute(&mut *conn)
            .await
            .map_err(schema_err)?;
    }

    Ok(())
}
