//! Tests for storage error types.

use crate::db::{DbError, DbResult};

#[test]
fn connection_error_displays_correctly() {
    let err = DbError::Connection {
        message: "unable to open database".to_string(),
    };
    assert_eq!(err.to_string(), "Connection error: unable to open database");
}

#[test]
fn translation_error_displays_correctly() {
    let err = DbError::translation("unknown operator 'regex' on field 'make'");
    assert_eq!(
        err.to_string(),
        "Filter translation error: unknown operator 'regex' on field 'make'"
    );
}

#[test]
fn invalid_data_error_displays_hint() {
    let err = DbError::invalid("unknown field 'wheels'", "declare it in the catalog");
    assert_eq!(
        err.to_string(),
        "Invalid data: unknown field 'wheels' (hint: declare it in the catalog)"
    );
}

#[test]
fn constraint_error_displays_correctly() {
    let err = DbError::Constraint {
        message: "UNIQUE constraint failed: users.email".to_string(),
    };
    assert_eq!(
        err.to_string(),
        "Constraint violation: UNIQUE constraint failed: users.email"
    );
}

#[test]
fn pool_closed_maps_to_connection_error() {
    let err: DbError = sqlx::Error::PoolClosed.into();
    assert!(matches!(err, DbError::Connection { .. }));
}

#[test]
fn row_not_found_maps_to_database_error() {
    let err: DbError = sqlx::Error::RowNotFound.into();
    assert!(matches!(err, DbError::Database { .. }));
}

#[test]
fn lifecycle_errors_display_correctly() {
    assert_eq!(
        DbError::AlreadyInitialized.to_string(),
        "Storage is already initialized"
    );
    assert_eq!(
        DbError::NotInitialized.to_string(),
        "Storage has not been initialized"
    );
}

#[test]
fn db_result_err_returns_error() {
    let result: DbResult<i32> = Err(DbError::Unsupported {
        message: "relations".to_string(),
    });
    assert!(result.is_err());
}
