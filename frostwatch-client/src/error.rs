//! Error types for backend access.

use thiserror::Error;

/// Errors that can occur when talking to the fleet backend.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// Failed to parse a response body.
    #[error("Failed to parse response: {0}")]
    Parse(String),

    /// Response body had none of the accepted shapes.
    #[error("Unrecognized response shape: {0}")]
    Shape(String),

    /// The backend's envelope reported a failure.
    #[error("Backend reported failure: {0}")]
    Backend(String),

    /// Connection failed.
    #[error("Connection failed: {0}")]
    Connection(String),

    /// Timeout waiting for response.
    #[error("Request timed out")]
    Timeout,
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Timeout
        } else if err.is_connect() {
            ApiError::Connection(err.to_string())
        } else {
            ApiError::Http(err.to_string())
        }
    }
}
