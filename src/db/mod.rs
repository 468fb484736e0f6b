//! Storage abstraction layer.
//!
//! The rest of the application reads and writes records through
//! [`Storage`] using backend-neutral [`Filter`]s and [`QueryOptions`].
//! Two interchangeable backends sit behind it: a relational one
//! (SQLite via sqlx) and a document one (SurrealDB). Which one runs is a
//! configuration choice made once at startup.
//!
//! # Architecture
//!
//! - `error`: Storage-agnostic error types
//! - `models`: Records and query options
//! - `filter`: Filter expressions
//! - `schema`: Collection catalog (columns, composite/boolean fields, indexes)
//! - `translate`: Filter → SQL / SurrealQL translation
//! - `codec`: Record ↔ relational row conversion
//! - `storage`: The facade and transaction coordinator

pub mod codec;
mod error;
mod filter;
mod models;
mod schema;
mod sqlite;
mod storage;
mod surreal;
pub mod translate;
pub mod utils;
mod write;

#[cfg(test)]
mod error_test;
#[cfg(test)]
mod filter_test;
#[cfg(test)]
mod models_test;
#[cfg(test)]
mod schema_test;

pub use error::{DbError, DbResult};
pub use filter::{Clause, Condition, Filter};
pub use models::*;
pub use schema::{Catalog, Column, ColumnType, CollectionSchema, Index, Relation, RESERVED_FIELDS};
pub use storage::{Storage, Transaction};
