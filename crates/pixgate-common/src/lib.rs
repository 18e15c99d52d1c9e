//! Shared types for pixgate.
//!
//! This crate provides the common error type used across the workspace and
//! the rendering-parameter tuple that keys the image cache.

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::ImageParams;
