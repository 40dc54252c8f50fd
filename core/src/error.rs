//! Error types for the Apolearn API client.
//!
//! # Design
//! Ordinary request outcomes never become errors: whatever JSON the server
//! returns, including 4xx/5xx bodies, is handed back to the caller as data.
//! Only three things are errors: the request never completed, `login` was
//! rejected, or configuration could not be assembled.

use thiserror::Error;

/// Errors returned by `ApolearnClient` operations.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The HTTP round-trip failed before a response body was read
    /// (connect failure, timeout, broken body stream).
    #[error("transport failure: {0}")]
    Transport(String),

    /// `auth.gettoken` answered, but not with `status == 0` and a token.
    #[error("authentication failed (status {status:?}): {}", message.as_deref().unwrap_or("no token returned"))]
    AuthenticationFailed {
        status: Option<i64>,
        message: Option<String>,
    },

    /// A required environment variable was not set.
    #[error("missing configuration: {0}")]
    MissingConfig(&'static str),
}
