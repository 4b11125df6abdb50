//! In-memory session state
//!
//! The session is the single source of truth for which tokens go on the wire.
//! It is plain data: the refresh coordinator wraps it in a lock and is the only
//! writer besides explicit login/logout, so every mutation here is a single
//! step from the caller's point of view.

use common::Secret;

use crate::store::PersistedSession;

/// Current access/refresh tokens plus the refresh-in-flight flag.
///
/// Both tokens are installed and cleared together. `refreshing` is true only
/// while exactly one refresh call is outstanding; any call to `set_tokens`
/// (including `clear`) ends that window.
#[derive(Debug, Default, Clone)]
pub struct Session {
    access: Option<Secret<String>>,
    refresh: Option<Secret<String>>,
    refreshing: bool,
}

impl Session {
    /// Empty session, nobody signed in.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a session from what was persisted on a previous run.
    pub fn from_persisted(persisted: PersistedSession) -> Self {
        let mut session = Self::new();
        session.set_tokens(persisted.access_token, persisted.refresh_token);
        session
    }

    /// Overwrite both tokens and leave the refresh window.
    pub fn set_tokens(&mut self, access: Option<String>, refresh: Option<String>) {
        self.access = access.map(Secret::new);
        self.refresh = refresh.map(Secret::new);
        self.refreshing = false;
    }

    pub fn clear(&mut self) {
        self.set_tokens(None, None);
    }

    /// Enter the refresh window. Tokens are left as they are.
    pub fn mark_refreshing(&mut self) {
        self.refreshing = true;
    }

    pub fn access_token(&self) -> Option<&str> {
        self.access.as_ref().map(|s| s.expose().as_str())
    }

    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh.as_ref().map(|s| s.expose().as_str())
    }

    pub fn is_refreshing(&self) -> bool {
        self.refreshing
    }

    pub fn is_authenticated(&self) -> bool {
        self.access.is_some()
    }
}

impl From<&Session> for PersistedSession {
    fn from(session: &Session) -> Self {
        PersistedSession {
            access_token: session.access_token().map(str::to_owned),
            refresh_token: session.refresh_token().map(str::to_owned),
        }
    }
}
