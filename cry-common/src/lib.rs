//! # Cry AI Common Library
//!
//! Shared code for the cry classification service:
//! - Common error type
//! - Bootstrap TOML configuration and config file discovery
//! - Timestamp helpers

pub mod config;
pub mod error;
pub mod time;

pub use error::{Error, Result};
