//! Error Types
//!
//! One error enum for the whole engine.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Invalid measure name, threshold outside the measure's range, or bad settings
    #[error("Configuration error: {0}")]
    Configuration(String),
    /// Word or index not present in the vocabulary
    #[error("Not found: {0}")]
    NotFound(String),
    /// The acceleration backend is not compiled in or not installed
    #[error("Missing dependency: {0}")]
    MissingDependency(&'static str),
    /// Query element that cannot be interpreted against this vector space
    #[error("Invalid query: {0}")]
    InvalidQuery(String),
    #[error("Invalid vector space: {0}")]
    InvalidVectorSpace(String),
    /// Background task panicked or was cancelled
    #[error("Task failed: {0}")]
    TaskFailed(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn configuration(msg: impl Into<String>) -> Self {
        Error::Configuration(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Error::NotFound(msg.into())
    }
}
