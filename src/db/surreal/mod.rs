//! SurrealDB implementation of the storage contract.
//!
//! Each collection is a schemaless table; values are stored natively, so no
//! codec is involved. Record ids are kept as plain string keys at the API.

mod connection;
mod records;
mod transaction;

#[cfg(test)]
mod connection_test;

pub(crate) use connection::SurrealAdapter;
pub(crate) use transaction::SurrealTransaction;
