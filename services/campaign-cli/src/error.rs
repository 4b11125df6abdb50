//! Command-level error types

use thiserror::Error;

/// Failures a command reports to the user.
///
/// Setup failures (config, HTTP client) go through `anyhow` in `main`
/// instead; these are the ones the user can act on.
#[derive(Error, Debug)]
pub enum Error {
    #[error("{0}\n\nusage: campaign-cli [--config PATH] <login [EMAIL] | whoami | get PATH | logout>")]
    Usage(String),

    #[error("no email given: pass one to `login` or set [login].email")]
    MissingEmail,

    #[error("no password: set CAMPAIGN_PASSWORD or [login].password_file")]
    MissingPassword,

    /// Nowhere to keep the session, so a login would end with this process.
    #[error("no session file: set [session].file so the login outlives this command")]
    NoSessionFile,

    #[error("not signed in, run `campaign-cli login` first")]
    NotSignedIn,

    /// The session is gone and could not be recovered.
    #[error("session expired, run `campaign-cli login` to sign in again")]
    SessionExpired,

    #[error(transparent)]
    Session(#[from] session_refresh::Error),

    #[error(transparent)]
    Api(api_client::Error),
}

impl From<api_client::Error> for Error {
    fn from(err: api_client::Error) -> Self {
        if err.is_unauthorized() {
            Error::SessionExpired
        } else {
            Error::Api(err)
        }
    }
}

/// Result alias using command Error
pub type Result<T> = std::result::Result<T, Error>;
