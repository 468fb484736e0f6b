//! Storage error types.
//!
//! This module provides the error taxonomy shared by both backends.
//! It uses miette for fancy diagnostic output and thiserror for derive macros.
//! Callers never see a backend-specific error type.

use miette::Diagnostic;
use thiserror::Error;

/// Storage operation errors.
#[derive(Error, Diagnostic, Debug)]
pub enum DbError {
    #[error("Connection error: {message}")]
    #[diagnostic(code(showroom::db::connection_error))]
    Connection { message: String },

    #[error("Filter translation error: {message}")]
    #[diagnostic(
        code(showroom::db::translation_error),
        help("Supported operators are eq, in, like, gt, gte, lt and lte")
    )]
    Translation { message: String },

    #[error("Constraint violation: {message}")]
    #[diagnostic(code(showroom::db::constraint))]
    Constraint { message: String },

    #[error("Invalid data: {message} (hint: {help})")]
    #[diagnostic(code(showroom::db::invalid_data))]
    InvalidData { message: String, help: String },

    #[error("Unsupported operation: {message}")]
    #[diagnostic(code(showroom::db::unsupported))]
    Unsupported { message: String },

    #[error("Schema error: {message}")]
    #[diagnostic(code(showroom::db::schema_error))]
    Schema { message: String },

    #[error("Database error: {message}")]
    #[diagnostic(code(showroom::db::database_error))]
    Database { message: String },

    #[error("Storage is already initialized")]
    #[diagnostic(code(showroom::db::already_initialized))]
    AlreadyInitialized,

    #[error("Storage has not been initialized")]
    #[diagnostic(
        code(showroom::db::not_initialized),
        help("Call Storage::install during startup before using Storage::global")
    )]
    NotInitialized,
}

impl DbError {
    pub(crate) fn translation(message: impl Into<String>) -> Self {
        DbError::Translation {
            message: message.into(),
        }
    }

    pub(crate) fn invalid(message: impl Into<String>, help: impl Into<String>) -> Self {
        DbError::InvalidData {
            message: message.into(),
            help: help.into(),
        }
    }
}

impl From<sqlx::Error> for DbError {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => DbError::Constraint {
                message: db_err.message().to_string(),
            },
            sqlx::Error::PoolClosed | sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) => {
                DbError::Connection {
                    message: e.to_string(),
                }
            }
            _ => DbError::Database {
                message: e.to_string(),
            },
        }
    }
}

impl From<surrealdb::Error> for DbError {
    fn from(e: surrealdb::Error) -> Self {
        let message = e.to_string();
        if message.contains("already exists") || message.contains("already contains") {
            DbError::Constraint { message }
        } else {
            DbError::Database { message }
        }
    }
}

/// Result type for storage operations.
pub type DbResult<T> = Result<T, DbError>;
