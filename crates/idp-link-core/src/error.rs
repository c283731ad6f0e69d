//! Error types for identity provider link management
//!
//! This module defines all error types used throughout the crate.

use thiserror::Error;

/// Result type alias for link operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for link management
#[derive(Error, Debug)]
pub enum Error {
    /// Required field missing or malformed, detected before any remote call
    #[error("Configuration error: {0}")]
    Config(String),

    /// The directory service declined an operation
    #[error("Failed to {operation} ({link}): {message}")]
    Remote {
        /// Lifecycle operation that issued the call (e.g. "link users")
        operation: String,
        /// Identifiers of the link the call was made for
        link: String,
        /// Remote failure, verbatim
        message: String,
    },

    /// Operation the resource deliberately does not support
    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    /// The caller's deadline expired while a remote call was in flight
    #[error("Timed out during {operation} ({link}) after {limit:?}; remote outcome is unknown")]
    Timeout {
        /// Lifecycle operation that was abandoned
        operation: String,
        /// Identifiers of the link the call was made for
        link: String,
        /// Configured deadline
        limit: std::time::Duration,
    },

    /// State store-related errors
    #[error("State store error: {0}")]
    StateStore(String),

    /// Filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP transport errors (from the directory client)
    #[error("HTTP error: {0}")]
    Http(String),

    /// Authentication errors
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Throttling errors
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// User, pool or identity not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Directory-specific error
    #[error("Directory error ({directory}): {message}")]
    Provider {
        /// Directory client name
        directory: String,
        /// Error message
        message: String,
    },

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a remote rejection error
    pub fn remote(
        operation: impl Into<String>,
        link: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Remote {
            operation: operation.into(),
            link: link.into(),
            message: message.into(),
        }
    }

    /// Create an unsupported operation error
    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported(msg.into())
    }

    /// Create a timeout error
    pub fn timeout(
        operation: impl Into<String>,
        link: impl Into<String>,
        limit: std::time::Duration,
    ) -> Self {
        Self::Timeout {
            operation: operation.into(),
            link: link.into(),
            limit,
        }
    }

    /// Create a state store error
    pub fn state_store(msg: impl Into<String>) -> Self {
        Self::StateStore(msg.into())
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

    /// Create a directory-specific error
    pub fn provider(directory: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            directory: directory.into(),
            message: message.into(),
        }
    }

    /// Whether this error was raised before any remote call was attempted
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_error_carries_operation_context() {
        let err = Error::remote("link users", "pool-1:dest-42:src-99", "AliasExistsException");
        assert_eq!(
            err.to_string(),
            "Failed to link users (pool-1:dest-42:src-99): AliasExistsException"
        );
    }

    #[test]
    fn timeout_mentions_unknown_outcome() {
        let err = Error::timeout(
            "create",
            "pool-1:dest-42:src-99",
            std::time::Duration::from_millis(20),
        );
        assert_eq!(
            err.to_string(),
            "Timed out during create (pool-1:dest-42:src-99) after 20ms; remote outcome is unknown"
        );
        assert!(!err.is_config());
    }
}
