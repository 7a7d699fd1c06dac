//! Error types for the statistics client.

use std::time::Duration;

/// Errors that can occur when using the statistics client.
///
/// Every failure the client surfaces is one of these variants, so callers
/// can handle the whole family through `Result<T, ClientError>` or match
/// a single variant.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Mutually exclusive or malformed arguments, detected before any request
    #[error("Validation error: {0}")]
    Validation(String),

    /// A dynamic filter value that is not an integer, string, or sequence of those
    #[error("Invalid filter type: {0}")]
    InvalidFilterType(String),

    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Rate limited (429)
    #[error("API rate limit exceeded, retry after {retry_after:?}")]
    RateLimited {
        /// Optional retry-after duration from server
        retry_after: Option<Duration>,
    },

    /// Any other failing status, or a transport failure after the retry budget
    #[error("Request failed{}: {message}", .status.map(|s| format!(" with status {s}")).unwrap_or_default())]
    RequestFailed {
        /// HTTP status code, `None` for transport-level failures
        status: Option<u16>,
        /// Response body or failure reason
        message: String,
    },

    /// Invalid response from server
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Building the HTTP client failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ClientError {
    /// Returns the HTTP status code if the error came from a response.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::NotFound(_) => Some(404),
            ClientError::RateLimited { .. } => Some(429),
            ClientError::RequestFailed { status, .. } => *status,
            _ => None,
        }
    }

    /// Returns true if the error was raised from the caller's arguments,
    /// before any request was sent.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            ClientError::Validation(_) | ClientError::InvalidFilterType(_)
        )
    }
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;
