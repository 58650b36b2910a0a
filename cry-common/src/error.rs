//! Common error types for Cry AI

use thiserror::Error;

/// Common result type for Cry AI operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types shared by the Cry AI crates
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),
}
