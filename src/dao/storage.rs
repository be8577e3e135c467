use std::error::Error;
use thiserror::Error;

/// Result alias for remote store operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Error raised by remote document stores regardless of the backend.
///
/// Permission failures, connectivity loss and malformed documents all collapse into
/// this single variant: callers only ever need to know that the authoritative copy
/// could not be consulted.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The store could not be consulted.
    #[error("remote store unavailable: {message}")]
    Unavailable {
        /// Backend specific description.
        message: String,
        /// Backend error.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
}

impl StorageError {
    /// Construct an unavailable error from any backend failure.
    pub fn unavailable(message: String, source: impl Error + Send + Sync + 'static) -> Self {
        StorageError::Unavailable {
            message,
            source: Box::new(source),
        }
    }

    /// Human readable description without the source chain.
    pub fn message(&self) -> &str {
        match self {
            StorageError::Unavailable { message, .. } => message,
        }
    }
}
