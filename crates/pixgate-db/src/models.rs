//! Internal Rust models matching the database schema.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Upload token model.
///
/// Lifecycle: issued unused, consumed exactly once within its validity
/// window, then optionally marked uploaded.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Token {
    /// Random token value, primary key.
    pub id: String,
    /// Image identifier this token authorizes an upload for.
    pub image_id: String,
    /// Issuance time plus the configured TTL.
    pub valid_until: DateTime<Utc>,
    /// Set on successful consumption.
    pub used: bool,
    /// Set once the associated upload completes.
    pub uploaded_at: Option<DateTime<Utc>>,
}

/// A completed upload, as returned by the reconciliation query.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CompletedUpload {
    pub image_id: String,
    pub uploaded_at: DateTime<Utc>,
}

/// A consumed token whose upload has not been marked completed yet.
/// Returned in bounded batches for the backfill workflow.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PendingUpload {
    pub token: String,
    pub image_id: String,
}

/// Connection pool gauges, reported for operational dashboards.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PoolStats {
    pub max_count: u32,
    pub total_count: u32,
    pub idle_count: u32,
    pub in_use_ratio: f64,
    pub idle_ratio: f64,
}
