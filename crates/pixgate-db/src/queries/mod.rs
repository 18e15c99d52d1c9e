//! Database query modules.
//!
//! This module organizes all database operations into logical groups:
//! - tokens: upload-token lifecycle (issue, consume, complete, clean up)
//! - image_cache: rendered-image cache lookups and inserts
//! - app_migrations: application-level migration ledger

pub mod app_migrations;
pub mod image_cache;
pub mod tokens;

use pixgate_common::Error;

/// Convert a rusqlite error into the common error type, surfacing
/// uniqueness violations as the typed `Conflict` outcome.
///
/// Detection is by SQLite error code, never by matching message text.
pub(crate) fn map_db_err(e: rusqlite::Error) -> Error {
    match &e {
        rusqlite::Error::SqliteFailure(err, _)
            if err.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            Error::conflict(e.to_string())
        }
        _ => Error::database(e.to_string()),
    }
}
