//! Store configuration.
//!
//! Deserializable from TOML so the embedding service can load it from its
//! own config file; `Default` carries the documented defaults.

use pixgate_common::{Error, Result};
use serde::{Deserialize, Serialize};

/// Configuration for a [`crate::store::TokenStore`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Path to the SQLite database file.
    pub db_path: String,

    /// Maximum number of pooled connections.
    pub pool_size: u32,

    /// How long an issued token stays valid, in minutes.
    pub token_ttl_minutes: i64,

    /// Probability (0.0 - 1.0) that a successful or failed token creation
    /// triggers an inline cleanup of expired tokens. Set to 0.0 to disable
    /// sampled cleanup entirely, 1.0 to run it on every creation.
    pub cleanup_probability: f64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            db_path: "pixgate.sqlite".to_string(),
            pool_size: 4,
            token_ttl_minutes: 15,
            cleanup_probability: 0.1,
        }
    }
}

impl StoreConfig {
    /// Validate configuration before a pool is built from it.
    pub fn validate(&self) -> Result<()> {
        if self.pool_size == 0 {
            return Err(Error::invalid_input("pool_size cannot be 0"));
        }
        if self.token_ttl_minutes <= 0 {
            return Err(Error::invalid_input("token_ttl_minutes must be positive"));
        }
        if !(0.0..=1.0).contains(&self.cleanup_probability) {
            return Err(Error::invalid_input(
                "cleanup_probability must be within 0.0..=1.0",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = StoreConfig::default();
        assert_eq!(config.pool_size, 4);
        assert_eq!(config.token_ttl_minutes, 15);
        assert_eq!(config.cleanup_probability, 0.1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_overrides() {
        let config: StoreConfig = toml::from_str(
            r#"
            db_path = "/var/lib/pixgate/db.sqlite"
            pool_size = 8
            "#,
        )
        .unwrap();

        assert_eq!(config.db_path, "/var/lib/pixgate/db.sqlite");
        assert_eq!(config.pool_size, 8);
        // Unspecified fields fall back to defaults
        assert_eq!(config.token_ttl_minutes, 15);
        assert_eq!(config.cleanup_probability, 0.1);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = StoreConfig {
            pool_size: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        config.pool_size = 4;
        config.cleanup_probability = 1.5;
        assert!(config.validate().is_err());

        config.cleanup_probability = 0.5;
        config.token_ttl_minutes = 0;
        assert!(config.validate().is_err());
    }
}
