//! Error types for the client pipeline
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Api Error Enum ==
/// Unified error type for the request/cache/offline layer.
///
/// The enum is `Clone` because de-duplicated concurrent requests all settle
/// with the same outcome: the leader's error is handed to every waiter.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// No response was received at all (connection refused, DNS failure,
    /// timeout at the transport layer). This is the only variant that
    /// triggers the offline fallbacks.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The server responded with a non-success HTTP status. Propagated to
    /// the caller unchanged; the client never retries these.
    #[error("HTTP {code}: {message}")]
    Status { code: u16, message: String },

    /// Durable offline-queue storage failed. Constructed from the store's
    /// error at the queue boundary, where it is logged and degraded to a
    /// `false`/empty result; callers of the queue never see it directly.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Internal invariant violation (e.g. an in-flight request channel was
    /// dropped before settling).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    // == Connectivity Check ==
    /// True when the failure looks like a connectivity failure: no response
    /// object was ever received. Status errors have a response and are not
    /// eligible for offline queueing or stale-cache fallback.
    pub fn is_connectivity_failure(&self) -> bool {
        matches!(self, ApiError::Transport(_))
    }
}

// == Storage Conversion ==
/// Errors crossing the durable-storage seam become `Storage`. The message
/// keeps the root cause; the structured error chain ends here.
impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::Storage(err.to_string())
    }
}

// == Result Type Alias ==
/// Convenience Result type for the client pipeline.
pub type Result<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_is_connectivity_failure() {
        let err = ApiError::Transport("connection refused".to_string());
        assert!(err.is_connectivity_failure());
    }

    #[test]
    fn test_status_is_not_connectivity_failure() {
        let err = ApiError::Status {
            code: 500,
            message: "internal".to_string(),
        };
        assert!(!err.is_connectivity_failure());
    }

    #[test]
    fn test_anyhow_degrades_to_storage() {
        let err: ApiError = anyhow::anyhow!("disk full").into();
        assert_eq!(err, ApiError::Storage("disk full".to_string()));
        assert!(!err.is_connectivity_failure());
    }

    #[test]
    fn test_error_display() {
        let err = ApiError::Status {
            code: 404,
            message: "not found".to_string(),
        };
        assert_eq!(err.to_string(), "HTTP 404: not found");
    }
}
