//! Pixgate-DB: upload-token lifecycle and render-cache persistence
//!
//! This crate provides the storage layer for pixgate using SQLite with
//! rusqlite and r2d2 connection pooling. It owns two tables: `tokens`,
//! holding short-lived single-use upload tokens, and `images`, mapping
//! rendering-parameter tuples to previously rendered URLs.
//!
//! # Modules
//!
//! - `migrations` - Database schema migrations
//! - `pool` - Connection pool management
//! - `models` - Rust models matching database schema
//! - `queries` - Database query operations
//! - `store` - The `TokenStore` façade consumed by the HTTP layer
//! - `config` - Store configuration
//! - `metrics` - Query timing side channel
//!
//! # Example
//!
//! ```no_run
//! use pixgate_db::config::StoreConfig;
//! use pixgate_db::store::TokenStore;
//!
//! let store = TokenStore::open(StoreConfig::default()).unwrap();
//!
//! if let Some(token) = store.create_token("img1") {
//!     assert!(store.consume_token(&token, "img1"));
//! }
//! ```

pub mod config;
pub mod metrics;
pub mod migrations;
pub mod models;
pub mod pool;
pub mod queries;
pub mod store;

mod timefmt;

pub use config::StoreConfig;
pub use store::TokenStore;
