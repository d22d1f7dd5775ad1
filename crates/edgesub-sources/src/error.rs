//! Error types for outbound fetches.

use std::time::Duration;

use edgesub_core::SourceError;
use thiserror::Error;

/// Errors raised while fetching an upstream document.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("upstream answered with status {0}")]
    Status(u16),

    #[error("response body exceeds {limit} bytes")]
    TooLarge { limit: usize },

    #[error("request timed out after {0:?}")]
    Timeout(Duration),
}

/// Result type for fetch operations.
pub type Result<T> = std::result::Result<T, FetchError>;

impl From<FetchError> for SourceError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::Timeout(after) => SourceError::Timeout(after),
            other => SourceError::Fetch(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_maps_to_source_timeout() {
        let err: SourceError = FetchError::Timeout(Duration::from_secs(3)).into();
        assert!(matches!(err, SourceError::Timeout(d) if d == Duration::from_secs(3)));
    }

    #[test]
    fn status_maps_to_fetch_failure() {
        let err: SourceError = FetchError::Status(503).into();
        assert!(matches!(err, SourceError::Fetch(ref msg) if msg.contains("503")));
    }
}
