//! SQLite implementation of the storage contract.
//!
//! Records map onto one typed table per collection; see
//! [`crate::db::codec`] for how values are stored.

mod connection;
mod records;
mod transaction;

#[cfg(test)]
mod connection_test;
#[cfg(test)]
mod records_test;

pub(crate) use connection::SqliteAdapter;
pub(crate) use transaction::SqliteTransaction;
