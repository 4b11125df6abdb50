//! Refresh coordinator state machine
//!
//! Two states, carried by `Session::is_refreshing()`:
//! - Idle: the next caller that needs a new access token starts a refresh
//! - Refreshing: callers are queued and wait for the in-flight refresh
//!
//! Every caller, including the one that starts the refresh, gets a oneshot
//! handle in a FIFO queue. The refresh itself runs in a spawned task, so a
//! caller that gives up cannot leave the session stuck in Refreshing. When the
//! task finishes it updates the session and completes every handle in enqueue
//! order with the same `RefreshOutcome`.
//!
//! Login and logout start a new session epoch. A refresh that finishes after
//! its epoch has ended is discarded; the callers it would have served were
//! already failed with `SessionEnded`.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use common::Secret;
use session_auth::{CredentialService, PersistedSession, Session, SessionStore};
use tokio::sync::{Mutex, oneshot, watch};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::metrics::{record_queued, record_refresh, record_reused};

/// Upper bound on a single refresh call when the caller doesn't choose one.
pub const DEFAULT_REFRESH_TIMEOUT: Duration = Duration::from_secs(30);

/// Session status broadcast to whoever drives navigation.
///
/// `Expired` means a refresh failed and the user has to log in again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    SignedOut,
    SignedIn,
    Expired,
}

impl SessionStatus {
    pub fn label(&self) -> &'static str {
        match self {
            SessionStatus::SignedOut => "signed_out",
            SessionStatus::SignedIn => "signed_in",
            SessionStatus::Expired => "expired",
        }
    }
}

/// Result of one refresh, handed to every caller queued on it.
#[derive(Debug, Clone)]
pub enum RefreshOutcome {
    Success {
        access: Secret<String>,
        refresh: Secret<String>,
    },
    Failure(Error),
}

struct State {
    session: Session,
    waiters: VecDeque<oneshot::Sender<RefreshOutcome>>,
    epoch: u64,
}

/// Owner of the session and of the single-flight refresh.
///
/// Constructed once per process and shared via `Arc`. The `Mutex` makes
/// "check the flag, read the refresh token, set the flag" one step, and is
/// held across persistence so two windows never interleave their writes.
pub struct RefreshCoordinator {
    state: Mutex<State>,
    service: Arc<dyn CredentialService>,
    store: Option<SessionStore>,
    refresh_timeout: Duration,
    status: watch::Sender<SessionStatus>,
}

impl RefreshCoordinator {
    pub fn new(service: Arc<dyn CredentialService>, refresh_timeout: Duration) -> Self {
        let (status, _) = watch::channel(SessionStatus::SignedOut);
        Self {
            state: Mutex::new(State {
                session: Session::new(),
                waiters: VecDeque::new(),
                epoch: 0,
            }),
            service,
            store: None,
            refresh_timeout,
            status,
        }
    }

    /// Persist every session change to `store`.
    pub fn with_store(mut self, store: SessionStore) -> Self {
        self.store = Some(store);
        self
    }

    /// Load the session saved by a previous run, if a store is configured.
    pub async fn restore(&self) -> Result<()> {
        let Some(store) = &self.store else {
            return Ok(());
        };
        let persisted = store.load().await?;

        let mut state = self.state.lock().await;
        start_epoch(&mut state, Error::SessionEnded);
        state.session = Session::from_persisted(persisted);
        let status = if state.session.refresh_token().is_some() {
            SessionStatus::SignedIn
        } else {
            SessionStatus::SignedOut
        };
        self.status.send_replace(status);
        info!(status = status.label(), "session restored");
        Ok(())
    }

    /// Exchange email + password for a token pair and install it.
    ///
    /// Login failures are returned as-is for the UI to show; the session is
    /// left untouched.
    pub async fn login(&self, email: &str, password: &str) -> Result<()> {
        let tokens = self.service.login(email, password).await?;

        let mut state = self.state.lock().await;
        start_epoch(&mut state, Error::SessionEnded);
        state
            .session
            .set_tokens(Some(tokens.access_token), Some(tokens.refresh_token));
        self.persist(&state.session).await;
        self.status.send_replace(SessionStatus::SignedIn);
        info!("signed in");
        Ok(())
    }

    /// End the session. Never fails.
    ///
    /// Local state is cleared first; revoking the refresh token server-side
    /// happens afterwards and its errors are swallowed.
    pub async fn logout(&self) {
        let refresh = {
            let mut state = self.state.lock().await;
            let refresh = state.session.refresh_token().map(str::to_owned);
            self.teardown(&mut state, Error::SessionEnded, SessionStatus::SignedOut)
                .await;
            refresh
        };
        info!("signed out");

        if let Some(refresh) = refresh {
            self.service.logout(&refresh).await;
        }
    }

    /// Get a fresh access token after a 401.
    ///
    /// `rejected` is the access token the failed request carried. When the
    /// session has already moved past it (a refresh finished, or someone logged
    /// in) the current token is returned and no refresh call is made.
    ///
    /// Otherwise starts a refresh if none is in flight, or joins the queue of
    /// the one that is. Returns the new access token, or the error that ended
    /// the session.
    pub async fn refresh_access_token(
        self: &Arc<Self>,
        rejected: Option<&str>,
    ) -> Result<String> {
        let (tx, rx) = oneshot::channel();

        let start = {
            let mut state = self.state.lock().await;

            if !state.session.is_refreshing() {
                if let Some(current) = state.session.access_token() {
                    if rejected != Some(current) {
                        debug!("access token replaced since the request was sent, reusing it");
                        record_reused();
                        return Ok(current.to_owned());
                    }
                }
            }

            state.waiters.push_back(tx);

            if state.session.is_refreshing() {
                debug!(queued = state.waiters.len(), "refresh in flight, waiting");
                record_queued();
                None
            } else if let Some(refresh) = state.session.refresh_token().map(str::to_owned) {
                state.session.mark_refreshing();
                Some((refresh, state.epoch))
            } else {
                // a caller who never signed in stays signed out
                let status = if state.session.access_token().is_some() {
                    SessionStatus::Expired
                } else {
                    self.status()
                };
                warn!(
                    status = status.label(),
                    "no refresh token in session, ending session"
                );
                record_refresh("missing_token");
                self.teardown(&mut state, Error::MissingRefreshToken, status)
                    .await;
                None
            }
        };

        if let Some((refresh, epoch)) = start {
            let this = Arc::clone(self);
            tokio::spawn(async move { this.run_refresh(refresh, epoch).await });
        }

        match rx.await {
            Ok(RefreshOutcome::Success { access, .. }) => Ok(access.expose().clone()),
            Ok(RefreshOutcome::Failure(e)) => Err(e),
            Err(_) => Err(Error::SessionEnded),
        }
    }

    /// The one refresh call of a coordination window.
    async fn run_refresh(&self, refresh: String, epoch: u64) {
        debug!("refreshing access token");
        let result =
            match tokio::time::timeout(self.refresh_timeout, self.service.refresh(&refresh)).await
            {
                Ok(Ok(tokens)) => Ok(tokens),
                Ok(Err(e)) => Err(Error::Auth(e)),
                Err(_) => Err(Error::RefreshTimeout(self.refresh_timeout)),
            };

        let mut state = self.state.lock().await;
        if state.epoch != epoch {
            debug!("session replaced during refresh, discarding result");
            return;
        }

        match result {
            Ok(tokens) => {
                state.session.set_tokens(
                    Some(tokens.access_token.clone()),
                    Some(tokens.refresh_token.clone()),
                );
                let released = release(
                    &mut state.waiters,
                    RefreshOutcome::Success {
                        access: Secret::new(tokens.access_token),
                        refresh: Secret::new(tokens.refresh_token),
                    },
                );
                self.persist(&state.session).await;
                self.status.send_replace(SessionStatus::SignedIn);
                record_refresh("success");
                info!(released, "token refresh succeeded");
            }
            Err(e) => {
                record_refresh(failure_label(&e));
                warn!(
                    error = %e,
                    released = state.waiters.len(),
                    "token refresh failed, ending session"
                );
                self.teardown(&mut state, e, SessionStatus::Expired).await;
                drop(state);
                self.service.logout(&refresh).await;
            }
        }
    }

    /// Current access token, for the request interceptor.
    pub async fn access_token(&self) -> Option<String> {
        let state = self.state.lock().await;
        state.session.access_token().map(str::to_owned)
    }

    /// Copy of the session as it is right now.
    pub async fn snapshot(&self) -> Session {
        self.state.lock().await.session.clone()
    }

    /// Callers waiting on the in-flight refresh.
    pub async fn pending_callers(&self) -> usize {
        self.state.lock().await.waiters.len()
    }

    pub fn status(&self) -> SessionStatus {
        *self.status.borrow()
    }

    /// Watch status changes, e.g. to send the user back to login on `Expired`.
    pub fn subscribe(&self) -> watch::Receiver<SessionStatus> {
        self.status.subscribe()
    }

    /// Clear both tokens, fail every waiter with `reason`, persist, announce.
    async fn teardown(&self, state: &mut State, reason: Error, status: SessionStatus) {
        state.session.clear();
        start_epoch(state, reason);
        self.persist(&state.session).await;
        self.status.send_replace(status);
    }

    async fn persist(&self, session: &Session) {
        let Some(store) = &self.store else {
            return;
        };
        if let Err(e) = store.save(&PersistedSession::from(session)).await {
            warn!(path = %store.path().display(), error = %e, "failed to persist session");
        }
    }
}

/// Begin a new epoch, failing whoever was waiting on the old one.
fn start_epoch(state: &mut State, reason: Error) {
    state.epoch += 1;
    let released = release(&mut state.waiters, RefreshOutcome::Failure(reason));
    if released > 0 {
        debug!(released, "released waiters from previous session");
    }
}

/// Complete every queued handle in FIFO order. Returns how many there were.
fn release(
    waiters: &mut VecDeque<oneshot::Sender<RefreshOutcome>>,
    outcome: RefreshOutcome,
) -> usize {
    let count = waiters.len();
    for waiter in waiters.drain(..) {
        // Err means the caller went away; nothing to deliver
        let _ = waiter.send(outcome.clone());
    }
    count
}

fn failure_label(err: &Error) -> &'static str {
    match err {
        Error::Auth(session_auth::Error::RefreshRejected(_)) => "rejected",
        Error::RefreshTimeout(_) => "timeout",
        Error::MissingRefreshToken => "missing_token",
        _ => "network",
    }
}
