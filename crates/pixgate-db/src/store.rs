//! The `TokenStore` façade.
//!
//! This is the boundary the HTTP layer talks to. Every method catches
//! store faults, logs them, and returns a neutral value (`None`, `false`,
//! an empty list); raw database errors never cross this boundary. Typed
//! conflicts are mapped to their domain meaning: a pending token denies
//! issuance, a cache-insert race counts as success.

use chrono::{DateTime, Duration, Utc};
use pixgate_common::{Error, ImageParams, Result};
use rand::Rng;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::StoreConfig;
use crate::metrics::QueryTimer;
use crate::migrations;
use crate::models::{CompletedUpload, PendingUpload, PoolStats};
use crate::pool::{get_conn, init_pool, DbPool, PooledConnection};
use crate::queries::{app_migrations, image_cache, tokens};

/// Durable, race-safe token issuance/consumption and render-cache access.
///
/// Owns a bounded connection pool with an explicit `open`/`close`
/// lifecycle. Safe to share across request handlers; all race arbitration
/// is pushed to the storage layer.
pub struct TokenStore {
    pool: DbPool,
    config: StoreConfig,
}

impl TokenStore {
    /// Open a store: validate the configuration, build the pool, and run
    /// pending schema migrations.
    pub fn open(config: StoreConfig) -> Result<Self> {
        config.validate()?;
        let pool = init_pool(&config.db_path, config.pool_size)?;
        Ok(Self { pool, config })
    }

    /// Build a store over an existing pool.
    ///
    /// Useful for tests and for callers that manage the pool themselves.
    /// Migrations are assumed to have run when the pool was initialized.
    pub fn from_pool(pool: DbPool, config: StoreConfig) -> Self {
        Self { pool, config }
    }

    /// Issue a new single-use upload token for an image.
    ///
    /// Returns `None` when an unexpired unused token already exists for
    /// this image ("request already pending"), when `image_id` is empty,
    /// or on any store fault. Afterwards, with the configured probability,
    /// runs an inline cleanup of expired tokens; its outcome cannot change
    /// the already-determined result.
    pub fn create_token(&self, image_id: &str) -> Option<String> {
        if image_id.is_empty() {
            warn!("rejected token request without an image id");
            return None;
        }

        let created = {
            let _timer = QueryTimer::start("create_token");
            let token = Uuid::new_v4().to_string();
            match self
                .conn()
                .and_then(|conn| tokens::create(&conn, image_id, &token, self.ttl()))
            {
                Ok(()) => {
                    debug!(image_id, "issued upload token");
                    Some(token)
                }
                Err(Error::Conflict(_)) => {
                    warn!(image_id, "upload already pending, denying token");
                    None
                }
                Err(Error::InvalidInput(msg)) => {
                    warn!(image_id, %msg, "rejected token request");
                    None
                }
                Err(e) => {
                    error!(image_id, error = %e, "token creation failed");
                    None
                }
            }
        };

        if self.should_run_cleanup() {
            debug!("running sampled token cleanup");
            self.cleanup_tokens();
        }

        created
    }

    /// Consume a token, authorizing exactly one upload.
    ///
    /// True iff exactly one row transitioned from unused to used. False
    /// collapses unknown token, wrong image, expired, and already-used;
    /// callers cannot tell which precondition failed.
    pub fn consume_token(&self, token: &str, image_id: &str) -> bool {
        let _timer = QueryTimer::start("consume_token");
        match self
            .conn()
            .and_then(|conn| tokens::consume(&conn, token, image_id))
        {
            Ok(consumed) => consumed,
            Err(e) => {
                error!(image_id, error = %e, "token consumption failed");
                false
            }
        }
    }

    /// Record that the upload authorized by a consumed token completed.
    pub fn mark_upload_completed(&self, token: &str, image_id: &str) -> bool {
        let _timer = QueryTimer::start("mark_upload_completed");
        match self
            .conn()
            .and_then(|conn| tokens::mark_completed(&conn, token, image_id))
        {
            Ok(marked) => marked,
            Err(e) => {
                error!(image_id, error = %e, "marking upload completed failed");
                false
            }
        }
    }

    /// Delete abandoned uploads for an image (consumed, never completed).
    /// Best-effort.
    pub fn delete_token_for_image(&self, image_id: &str) {
        let _timer = QueryTimer::start("delete_token_for_image");
        if let Err(e) = self
            .conn()
            .and_then(|conn| tokens::delete_for_image(&conn, image_id))
        {
            error!(image_id, error = %e, "deleting abandoned tokens failed");
        }
    }

    /// Delete expired tokens that were never consumed.
    ///
    /// Housekeeping; failure is logged and swallowed so it can never fail
    /// the request path that triggered it.
    pub fn cleanup_tokens(&self) {
        let _timer = QueryTimer::start("cleanup_tokens");
        match self.conn().and_then(|conn| tokens::cleanup_expired(&conn)) {
            Ok(removed) => info!(removed, "cleaned expired tokens"),
            Err(e) => error!(error = %e, "token cleanup failed"),
        }
    }

    /// Look up a previously rendered URL by the full parameter tuple.
    /// `None` is a cache miss, not an error.
    pub fn get_from_cache(&self, params: &ImageParams) -> Option<String> {
        let _timer = QueryTimer::start("get_from_cache");
        match self.conn().and_then(|conn| image_cache::get(&conn, params)) {
            Ok(url) => url,
            Err(e) => {
                error!(name = %params.name, error = %e, "cache lookup failed");
                None
            }
        }
    }

    /// Cache a rendered URL for a parameter tuple.
    ///
    /// A uniqueness conflict means two renders raced and one row already
    /// persists, which is success from the caller's perspective.
    pub fn add_to_cache(&self, params: &ImageParams, url: &str, rendered_at: DateTime<Utc>) -> bool {
        let _timer = QueryTimer::start("add_to_cache");
        match self
            .conn()
            .and_then(|conn| image_cache::add(&conn, params, url, rendered_at))
        {
            Ok(()) => true,
            Err(Error::Conflict(_)) => {
                debug!(name = %params.name, "two renders raced to cache, kept one");
                true
            }
            Err(e) => {
                error!(name = %params.name, error = %e, "caching rendered image failed");
                false
            }
        }
    }

    /// Uploads completed after `threshold`, for the reconciliation job.
    pub fn images_completed_after(&self, threshold: DateTime<Utc>) -> Vec<CompletedUpload> {
        let _timer = QueryTimer::start("images_completed_after");
        match self
            .conn()
            .and_then(|conn| tokens::completed_after(&conn, threshold))
        {
            Ok(rows) => rows,
            Err(e) => {
                error!(error = %e, "listing completed uploads failed");
                Vec::new()
            }
        }
    }

    /// A bounded batch of consumed tokens still missing `uploaded_at`,
    /// for the backfill workflow.
    pub fn tokens_without_uploaded_at(&self) -> Vec<PendingUpload> {
        let _timer = QueryTimer::start("tokens_without_uploaded_at");
        match self
            .conn()
            .and_then(|conn| tokens::without_uploaded_at(&conn))
        {
            Ok(rows) => rows,
            Err(e) => {
                error!(error = %e, "listing unmarked uploads failed");
                Vec::new()
            }
        }
    }

    /// Backfill `uploaded_at` for an image where still unset. Idempotent.
    pub fn set_uploaded_at(&self, image_id: &str, value: DateTime<Utc>) {
        let _timer = QueryTimer::start("set_uploaded_at");
        if let Err(e) = self
            .conn()
            .and_then(|conn| tokens::set_uploaded_at_if_empty(&conn, image_id, value))
        {
            error!(image_id, error = %e, "backfilling uploaded_at failed");
        }
    }

    /// Name of the oldest pending application migration, if any.
    pub fn next_pending_app_migration(&self) -> Option<String> {
        let _timer = QueryTimer::start("next_pending_app_migration");
        match self.conn().and_then(|conn| app_migrations::next_pending(&conn)) {
            Ok(name) => name,
            Err(e) => {
                error!(error = %e, "reading app migration ledger failed");
                None
            }
        }
    }

    /// Mark a pending application migration as completed.
    pub fn mark_app_migration_completed(&self, name: &str) {
        let _timer = QueryTimer::start("mark_app_migration_completed");
        if let Err(e) = self
            .conn()
            .and_then(|conn| app_migrations::mark_completed(&conn, name).map(|_| ()))
        {
            error!(name, error = %e, "marking app migration completed failed");
        }
    }

    /// Apply pending schema migrations, returning how many ran.
    pub fn migrate(&self) -> Result<usize> {
        let _timer = QueryTimer::start("migrate");
        let conn = self.conn()?;
        migrations::run_migrations(&conn).map_err(|e| Error::database(e.to_string()))
    }

    /// Run a trivial test query against the pool.
    pub fn is_alive(&self) -> bool {
        let _timer = QueryTimer::start("is_alive");
        let probe = self
            .conn()
            .and_then(|conn| {
                conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
                    .map_err(|e| Error::database(e.to_string()))
            });
        matches!(probe, Ok(1))
    }

    /// Current pool gauges.
    pub fn stats(&self) -> PoolStats {
        let state = self.pool.state();
        let max = self.pool.max_size();
        PoolStats {
            max_count: max,
            total_count: state.connections,
            idle_count: state.idle_connections,
            in_use_ratio: f64::from(state.connections) / f64::from(max),
            idle_ratio: f64::from(state.idle_connections) / f64::from(max),
        }
    }

    /// End the store's lifecycle, dropping the pool and its connections.
    pub fn close(self) {
        drop(self.pool);
        info!("token store closed");
    }

    fn conn(&self) -> Result<PooledConnection> {
        get_conn(&self.pool)
    }

    fn ttl(&self) -> Duration {
        Duration::minutes(self.config.token_ttl_minutes)
    }

    fn should_run_cleanup(&self) -> bool {
        let p = self.config.cleanup_probability;
        p > 0.0 && rand::thread_rng().gen_bool(p.min(1.0))
    }
}
