//! Error types for API calls

/// Errors surfaced to callers of `ApiClient`.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Non-success HTTP status. A 401 here means the session could not be
    /// recovered (or the retry failed again).
    #[error("request failed with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("network failure: {0}")]
    Network(String),

    #[error("invalid response body: {0}")]
    Decode(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl Error {
    /// True for a 401 that made it all the way to the caller.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Error::Status { status: 401, .. })
    }
}

/// Result alias for API calls.
pub type Result<T> = std::result::Result<T, Error>;
