//! Timestamp formatting for storage.
//!
//! Timestamps are stored as fixed-width RFC 3339 text (microsecond
//! precision, `Z` suffix) so that SQL string comparison matches
//! chronological order.

use chrono::{DateTime, SecondsFormat, Utc};

/// Format a timestamp for storage and SQL comparison.
pub(crate) fn fmt_ts(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Read a stored timestamp column, converting parse failures into a
/// rusqlite conversion error instead of panicking in the row mapper.
pub(crate) fn ts_column(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_fixed_width_ordering() {
        // Sub-second timestamps must still compare correctly as strings.
        let early = Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap();
        let late = early + chrono::Duration::milliseconds(500);

        let a = fmt_ts(early);
        let b = fmt_ts(late);
        assert!(a < b);
        assert_eq!(a.len(), b.len());
    }

    #[test]
    fn test_roundtrip_through_column() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        let now = Utc::now();
        let stored = fmt_ts(now);

        let read: chrono::DateTime<Utc> = conn
            .query_row("SELECT ?", [&stored], |row| ts_column(row, 0))
            .unwrap();

        // Microsecond precision survives the roundtrip
        assert_eq!(fmt_ts(read), stored);
    }
}
