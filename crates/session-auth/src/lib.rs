//! Session credentials for the campaign REST API
//!
//! Holds the access/refresh token pair, talks to the three unauthenticated
//! auth endpoints, and optionally persists the pair between runs. The refresh
//! coordination itself lives in `session-refresh`; this crate has no notion of
//! concurrent callers.
//!
//! Token lifecycle:
//! 1. `token::login()` exchanges email + password for an access/refresh pair
//! 2. `Session::set_tokens()` installs the pair
//! 3. `token::refresh_token()` trades the refresh token for a new pair
//! 4. `token::revoke()` invalidates the refresh token server-side (best effort)
//! 5. `Session::clear()` drops both tokens together

pub mod constants;
pub mod error;
pub mod session;
pub mod store;
pub mod token;

pub use constants::*;
pub use error::{Error, Result};
pub use session::Session;
pub use store::{PersistedSession, SessionStore};
pub use token::{
    BoxFuture, CredentialService, HttpCredentialService, TokenResponse, login, refresh_token,
    revoke,
};
