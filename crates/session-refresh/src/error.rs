//! Error types for refresh coordination

use std::time::Duration;

/// Why a refresh (or login) did not produce a usable access token.
///
/// Cloned to every caller queued on the same refresh.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Auth(#[from] session_auth::Error),

    #[error("no refresh token in session")]
    MissingRefreshToken,

    #[error("token refresh timed out after {}s", .0.as_secs())]
    RefreshTimeout(Duration),

    /// The session was replaced by login or logout while the caller waited.
    #[error("session ended while waiting for token refresh")]
    SessionEnded,
}

/// Result alias for coordinator operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_errors_display_transparently() {
        let err = Error::from(session_auth::Error::RefreshRejected("expired".into()));
        assert_eq!(err.to_string(), "refresh token rejected: expired");
    }

    #[test]
    fn timeout_reports_seconds() {
        let err = Error::RefreshTimeout(Duration::from_secs(30));
        assert_eq!(err.to_string(), "token refresh timed out after 30s");
    }
}
