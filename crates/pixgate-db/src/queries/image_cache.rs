//! Rendered-image cache queries.
//!
//! Maps a full rendering-parameter tuple to a previously rendered URL.
//! The tuple is unique; when two concurrent renders race, only one row
//! persists and the loser sees a typed `Conflict`.

use chrono::{DateTime, Utc};
use pixgate_common::{ImageParams, Result};
use rusqlite::Connection;

use crate::queries::map_db_err;
use crate::timefmt::fmt_ts;

/// Insert a cache entry for a rendered image.
///
/// # Arguments
///
/// * `conn` - Database connection
/// * `params` - The rendering-parameter tuple keying the entry
/// * `url` - URL of the rendered asset
/// * `rendered_at` - When the render finished
///
/// # Returns
///
/// * `Ok(())` - The entry was inserted
/// * `Err(Error::Conflict)` - An entry for this tuple already exists
/// * `Err(Error)` - If a database error occurs
pub fn add(
    conn: &Connection,
    params: &ImageParams,
    url: &str,
    rendered_at: DateTime<Utc>,
) -> Result<()> {
    conn.execute(
        "INSERT INTO images (name, x, y, fit, file_type, url, blur, quality, rendered_at)
         VALUES (:name, :x, :y, :fit, :file_type, :url, :blur, :quality, :rendered_at)",
        rusqlite::named_params! {
            ":name": &params.name,
            ":x": params.width,
            ":y": params.height,
            ":fit": &params.fit,
            ":file_type": &params.mime,
            ":url": url,
            ":blur": params.blur,
            ":quality": params.quality,
            ":rendered_at": fmt_ts(rendered_at),
        },
    )
    .map_err(map_db_err)?;

    Ok(())
}

/// Look up a cached URL by the full parameter tuple.
///
/// # Returns
///
/// * `Ok(Some(url))` - Cache hit
/// * `Ok(None)` - Cache miss
/// * `Err(Error)` - If a database error occurs
pub fn get(conn: &Connection, params: &ImageParams) -> Result<Option<String>> {
    let result = conn.query_row(
        "SELECT url FROM images
         WHERE name = :name AND x = :x AND y = :y AND fit = :fit
           AND file_type = :file_type AND blur = :blur AND quality = :quality",
        rusqlite::named_params! {
            ":name": &params.name,
            ":x": params.width,
            ":y": params.height,
            ":fit": &params.fit,
            ":file_type": &params.mime,
            ":blur": params.blur,
            ":quality": params.quality,
        },
        |row| row.get::<_, String>(0),
    );

    match result {
        Ok(url) => Ok(Some(url)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(map_db_err(e)),
    }
}
