//! Error types for session credential operations

/// Errors from the auth endpoints and session persistence.
///
/// Payloads are plain strings so the error can be cloned and handed to every
/// caller waiting on the same refresh.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Login endpoint refused the email/password (user-correctable)
    #[error("login rejected: {0}")]
    AuthRejected(String),

    /// Refresh token is invalid, expired or revoked; the session must end
    #[error("refresh token rejected: {0}")]
    RefreshRejected(String),

    /// Transport error, timeout, unexpected status or undecodable body
    #[error("network failure: {0}")]
    NetworkFailure(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("session parse error: {0}")]
    SessionParse(String),
}

/// Result alias for session credential operations.
pub type Result<T> = std::result::Result<T, Error>;
