//! Crate-level error type for start-up, seeding and serving
//!
//! Request failures never reach this type: handlers return
//! [`ApiError`](crate::handlers::ApiError), which renders itself.

use std::path::PathBuf;

use thiserror::Error;

use crate::repository::RepositoryError;

/// Result type alias using the crate's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised outside the request path
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration could not be loaded or extracted
    #[error("Configuration error: {0}")]
    Config(Box<figment::Error>),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error outside a seed file
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A seed file was unreadable or rejected
    #[error("Seed error in {}: {message}", file.display())]
    Seed { file: PathBuf, message: String },

    /// Storage failure
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    /// Internal server error
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl Error {
    /// A seed failure for `file`.
    pub fn seed(file: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Seed {
            file: file.into(),
            message: message.into(),
        }
    }
}

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Error::Config(Box::new(err))
    }
}
