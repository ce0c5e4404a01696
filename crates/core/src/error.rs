//! Unified error types for the cache gateway.

use tokio_rusqlite::rusqlite;

/// Unified error type shared by the cache store, fetch layer, and gateway.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid input parameters (e.g., empty URL).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// Invalid or unparseable URL.
    #[error("INVALID_URL: {0}")]
    InvalidUrl(String),

    /// Transport-level network failure (DNS, connect, timeout, reset).
    #[error("NETWORK_ERROR: {0}")]
    Network(String),

    /// A precache manifest entry could not be fetched during install.
    #[error("PRECACHE_FAILED: {0}")]
    PrecacheFailed(String),

    /// Database operation failed.
    #[error("CACHE_ERROR: {0}")]
    Database(tokio_rusqlite::Error),

    /// Migration failed to apply.
    #[error("CACHE_ERROR: migration failed: {0}")]
    MigrationFailed(String),

    /// Operation attempted in the wrong lifecycle state.
    #[error("LIFECYCLE_ERROR: {0}")]
    Lifecycle(String),
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
            tokio_rusqlite::Error::Close(c) => Error::Database(tokio_rusqlite::Error::Close(c)),
            _ => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::Database(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(tokio_rusqlite::Error::Error(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::PrecacheFailed("/assets/logo.svg".to_string());
        assert!(err.to_string().contains("PRECACHE_FAILED"));
        assert!(err.to_string().contains("/assets/logo.svg"));
    }

    #[test]
    fn test_network_error_display() {
        let err = Error::Network("connection refused".to_string());
        assert!(err.to_string().starts_with("NETWORK_ERROR"));
    }
}
