use std::error::Error as StdError;
use thiserror::Error;

/// Result type alias for forwarder operations
pub type Result<T> = std::result::Result<T, ForwarderError>;

/// Errors that can occur while normalizing and forwarding an event
#[derive(Debug, Error)]
pub enum ForwarderError {
    /// Inbound event was not a valid Sensu event document
    #[error("Failed to parse monitoring event: {0}")]
    InvalidEvent(#[source] serde_json::Error),

    /// Failed to build HTTP client
    #[error("Failed to build HTTP client: {0}")]
    BuildHttpClient(#[source] reqwest::Error),

    /// The proxy address could not be turned into a client proxy
    #[error("Invalid proxy address: {0}")]
    InvalidProxy(#[source] reqwest::Error),

    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Request(#[source] reqwest_middleware::Error),

    /// Failed to serialize the alert payload
    #[error("Failed to serialize alert payload: {0}")]
    Serialize(#[source] serde_json::Error),

    /// Queue service returned an error response
    #[error("Queue API error: HTTP {status} - {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Error message from the queue service
        message: String,
    },
}

impl ForwarderError {
    /// Check if the error is retryable
    ///
    /// Returns `true` for:
    /// - Network/connection errors
    /// - Timeout errors
    /// - Server errors (5xx status codes)
    ///
    /// The forwarder itself never retries; this classification is for the
    /// caller or transport layer.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Request(source) => {
                if let Some(reqwest_err) = StdError::source(source) {
                    if let Some(err) = reqwest_err.downcast_ref::<reqwest::Error>() {
                        return err.is_connect() || err.is_timeout();
                    }
                }
                false
            }
            Self::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }
}
