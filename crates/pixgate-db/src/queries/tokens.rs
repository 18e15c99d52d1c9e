//! Upload-token database queries.
//!
//! This module implements the token lifecycle against the `tokens` table:
//! issue, consume, mark completed, and the cleanup paths. All
//! correctness-critical transitions are single conditional statements so
//! race arbitration happens in SQLite, not in application code.

use chrono::{DateTime, Duration, Utc};
use pixgate_common::{Error, Result};
use rusqlite::Connection;

use crate::models::{CompletedUpload, PendingUpload, Token};
use crate::queries::map_db_err;
use crate::timefmt::{fmt_ts, ts_column};

/// Maximum number of rows returned by the backfill query.
pub const BACKFILL_BATCH: u32 = 2500;

/// Insert a new unused token for an image.
///
/// A partial unique index allows at most one unused token per `image_id`;
/// an expired leftover must not block re-issuance, so it is deleted in the
/// same transaction before the insert. A live pending token surfaces as
/// `Error::Conflict`.
///
/// # Arguments
///
/// * `conn` - Database connection
/// * `image_id` - Image identifier the token authorizes
/// * `token` - The token value to insert
/// * `ttl` - Validity window, added to the current time
///
/// # Returns
///
/// * `Ok(())` - The token was inserted
/// * `Err(Error::Conflict)` - An unexpired unused token already exists
/// * `Err(Error)` - If a database error occurs
pub fn create(conn: &Connection, image_id: &str, token: &str, ttl: Duration) -> Result<()> {
    if image_id.is_empty() {
        return Err(Error::invalid_input("image_id must not be empty"));
    }

    let now = Utc::now();
    let tx = conn.unchecked_transaction().map_err(map_db_err)?;

    tx.execute(
        "DELETE FROM tokens WHERE image_id = :image_id AND used = 0 AND valid_until < :now",
        rusqlite::named_params! {
            ":image_id": image_id,
            ":now": fmt_ts(now),
        },
    )
    .map_err(map_db_err)?;

    tx.execute(
        "INSERT INTO tokens (id, image_id, valid_until, used) VALUES (:id, :image_id, :valid_until, 0)",
        rusqlite::named_params! {
            ":id": token,
            ":image_id": image_id,
            ":valid_until": fmt_ts(now + ttl),
        },
    )
    .map_err(map_db_err)?;

    tx.commit().map_err(map_db_err)?;
    Ok(())
}

/// Get a token by value.
///
/// # Returns
///
/// * `Ok(Some(Token))` - The token if found
/// * `Ok(None)` - If the token does not exist
/// * `Err(Error)` - If a database error occurs
pub fn get(conn: &Connection, token: &str) -> Result<Option<Token>> {
    let result = conn.query_row(
        "SELECT id, image_id, valid_until, used, uploaded_at FROM tokens WHERE id = :id",
        rusqlite::named_params! { ":id": token },
        |row| {
            Ok(Token {
                id: row.get(0)?,
                image_id: row.get(1)?,
                valid_until: ts_column(row, 2)?,
                used: row.get::<_, i64>(3)? != 0,
                uploaded_at: match row.get::<_, Option<String>>(4)? {
                    Some(_) => Some(ts_column(row, 4)?),
                    None => None,
                },
            })
        },
    );

    match result {
        Ok(token) => Ok(Some(token)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(map_db_err(e)),
    }
}

/// Atomically consume a token.
///
/// The row transitions from unused to used only if token and image match,
/// the validity window has not passed, and it has not been consumed
/// before. Check and update are one statement, so concurrent consumers
/// cannot both win.
///
/// # Returns
///
/// * `Ok(true)` - Exactly one row transitioned
/// * `Ok(false)` - Unknown token, wrong image, expired, or already used
/// * `Err(Error)` - If a database error occurs
pub fn consume(conn: &Connection, token: &str, image_id: &str) -> Result<bool> {
    let affected = conn
        .execute(
            "UPDATE tokens SET used = 1
             WHERE id = :id AND image_id = :image_id AND valid_until >= :now AND used = 0",
            rusqlite::named_params! {
                ":id": token,
                ":image_id": image_id,
                ":now": fmt_ts(Utc::now()),
            },
        )
        .map_err(map_db_err)?;

    Ok(affected == 1)
}

/// Record upload completion on a consumed token.
///
/// Only unexpired, already-consumed rows qualify.
///
/// # Returns
///
/// * `Ok(true)` - Exactly one row updated
/// * `Ok(false)` - No matching consumed, unexpired row
/// * `Err(Error)` - If a database error occurs
pub fn mark_completed(conn: &Connection, token: &str, image_id: &str) -> Result<bool> {
    let now = Utc::now();
    let affected = conn
        .execute(
            "UPDATE tokens SET uploaded_at = :uploaded_at
             WHERE id = :id AND image_id = :image_id AND valid_until >= :now AND used = 1",
            rusqlite::named_params! {
                ":id": token,
                ":image_id": image_id,
                ":now": fmt_ts(now),
                ":uploaded_at": fmt_ts(now),
            },
        )
        .map_err(map_db_err)?;

    Ok(affected == 1)
}

/// Delete abandoned uploads for an image: consumed tokens whose upload
/// never completed.
///
/// # Returns
///
/// * `Ok(usize)` - Number of rows deleted
/// * `Err(Error)` - If a database error occurs
pub fn delete_for_image(conn: &Connection, image_id: &str) -> Result<usize> {
    conn.execute(
        "DELETE FROM tokens WHERE used = 1 AND uploaded_at IS NULL AND image_id = :image_id",
        rusqlite::named_params! { ":image_id": image_id },
    )
    .map_err(map_db_err)
}

/// Delete expired tokens that were never consumed.
///
/// # Returns
///
/// * `Ok(usize)` - Number of rows deleted
/// * `Err(Error)` - If a database error occurs
pub fn cleanup_expired(conn: &Connection) -> Result<usize> {
    conn.execute(
        "DELETE FROM tokens WHERE valid_until < :now AND used = 0",
        rusqlite::named_params! { ":now": fmt_ts(Utc::now()) },
    )
    .map_err(map_db_err)
}

/// List uploads completed after the given threshold.
///
/// Read-only; consumed by the external reconciliation job.
pub fn completed_after(conn: &Connection, threshold: DateTime<Utc>) -> Result<Vec<CompletedUpload>> {
    let mut stmt = conn
        .prepare(
            "SELECT image_id, uploaded_at FROM tokens
             WHERE uploaded_at IS NOT NULL AND uploaded_at > :threshold AND used = 1",
        )
        .map_err(map_db_err)?;

    let rows = stmt
        .query_map(
            rusqlite::named_params! { ":threshold": fmt_ts(threshold) },
            |row| {
                Ok(CompletedUpload {
                    image_id: row.get(0)?,
                    uploaded_at: ts_column(row, 1)?,
                })
            },
        )
        .map_err(map_db_err)?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(map_db_err)?;

    Ok(rows)
}

/// List up to [`BACKFILL_BATCH`] consumed tokens whose upload has not been
/// marked completed yet.
pub fn without_uploaded_at(conn: &Connection) -> Result<Vec<PendingUpload>> {
    let mut stmt = conn
        .prepare(
            "SELECT id, image_id FROM tokens
             WHERE uploaded_at IS NULL AND used = 1 LIMIT :limit",
        )
        .map_err(map_db_err)?;

    let rows = stmt
        .query_map(rusqlite::named_params! { ":limit": BACKFILL_BATCH }, |row| {
            Ok(PendingUpload {
                token: row.get(0)?,
                image_id: row.get(1)?,
            })
        })
        .map_err(map_db_err)?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(map_db_err)?;

    Ok(rows)
}

/// Set `uploaded_at` for an image only where it is still unset.
///
/// Idempotent, so the backfill job can be retried or run concurrently
/// with itself.
///
/// # Returns
///
/// * `Ok(usize)` - Number of rows updated (0 if already set)
/// * `Err(Error)` - If a database error occurs
pub fn set_uploaded_at_if_empty(
    conn: &Connection,
    image_id: &str,
    value: DateTime<Utc>,
) -> Result<usize> {
    conn.execute(
        "UPDATE tokens SET uploaded_at = :uploaded_at
         WHERE image_id = :image_id AND uploaded_at IS NULL",
        rusqlite::named_params! {
            ":image_id": image_id,
            ":uploaded_at": fmt_ts(value),
        },
    )
    .map_err(map_db_err)
}
