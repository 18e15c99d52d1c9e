//! Application-level migration ledger queries.
//!
//! Unlike schema migrations, these are named one-off maintenance steps
//! (backfills, re-renders) the service works through one at a time:
//! fetch the oldest pending name, run the step, mark it completed.

use chrono::Utc;
use pixgate_common::Result;
use rusqlite::Connection;

use crate::queries::map_db_err;
use crate::timefmt::fmt_ts;

/// Register a named application migration as pending.
///
/// Re-registering an existing name surfaces as `Error::Conflict`.
pub fn record(conn: &Connection, name: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO appchangelog (name, created_at) VALUES (:name, :created_at)",
        rusqlite::named_params! {
            ":name": name,
            ":created_at": fmt_ts(Utc::now()),
        },
    )
    .map_err(map_db_err)?;

    Ok(())
}

/// Get the oldest pending application migration, if any.
///
/// # Returns
///
/// * `Ok(Some(name))` - The next step to run
/// * `Ok(None)` - Nothing pending
/// * `Err(Error)` - If a database error occurs
pub fn next_pending(conn: &Connection) -> Result<Option<String>> {
    let result = conn.query_row(
        "SELECT name FROM appchangelog WHERE completed_at IS NULL
         ORDER BY created_at ASC LIMIT 1",
        [],
        |row| row.get::<_, String>(0),
    );

    match result {
        Ok(name) => Ok(Some(name)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(map_db_err(e)),
    }
}

/// Mark a pending application migration as completed.
///
/// Conditioned on `completed_at` still being unset, so re-running is a
/// no-op.
///
/// # Returns
///
/// * `Ok(usize)` - Number of rows updated (0 if unknown or already done)
/// * `Err(Error)` - If a database error occurs
pub fn mark_completed(conn: &Connection, name: &str) -> Result<usize> {
    conn.execute(
        "UPDATE appchangelog SET completed_at = :completed_at
         WHERE completed_at IS NULL AND name = :name",
        rusqlite::named_params! {
            ":name": name,
            ":completed_at": fmt_ts(Utc::now()),
        },
    )
    .map_err(map_db_err)
}
