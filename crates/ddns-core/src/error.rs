//! Error types for the DDNS system
//!
//! This module defines all error types used throughout the crate.

use thiserror::Error;

/// Result type alias for DDNS operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the DDNS system
#[derive(Error, Debug)]
pub enum Error {
    /// IP source-related errors (lookup failed, malformed answer)
    #[error("IP source error: {0}")]
    IpSource(String),

    /// State store-related errors
    #[error("State store error: {0}")]
    StateStore(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Transport-level HTTP failures (connect, TLS, timeout, body read)
    #[error("HTTP error: {0}")]
    Http(String),

    /// Authentication errors
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Rate limiting errors
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Record or zone not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// The provider answered with a status the operation does not accept
    #[error("Unexpected status {status} from {operation}: {body}")]
    UnexpectedStatus {
        /// Operation that was attempted (list, delete, create)
        operation: &'static str,
        /// HTTP status code
        status: u16,
        /// Response body, as returned by the provider
        body: String,
    },

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl Error {
    /// Create an IP source error
    pub fn ip_source(msg: impl Into<String>) -> Self {
        Self::IpSource(msg.into())
    }

    /// Create a state store error
    pub fn state_store(msg: impl Into<String>) -> Self {
        Self::StateStore(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an HTTP error
    pub fn http(msg: impl Into<String>) -> Self {
        Self::Http(msg.into())
    }

    /// Create an authentication error
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Authentication(msg.into())
    }

    /// Create a rate limit error
    pub fn rate_limited(msg: impl Into<String>) -> Self {
        Self::RateLimited(msg.into())
    }

    /// Create a "not found" error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create an unexpected-status error
    pub fn unexpected_status(operation: &'static str, status: u16, body: impl Into<String>) -> Self {
        Self::UnexpectedStatus {
            operation,
            status,
            body: body.into(),
        }
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Whether repeating the same operation later can succeed.
    ///
    /// Credentials, configuration and input problems will fail the same way
    /// on every attempt; everything else (transport failures, server errors,
    /// rate limits, a record vanishing between list and delete) may clear up.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            Self::Authentication(_) | Self::Config(_) | Self::InvalidInput(_)
        )
    }
}
