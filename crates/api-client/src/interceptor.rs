//! Request and response interception rules
//!
//! Pure decisions, no I/O: `authorize` runs before every dispatch and
//! `classify_response` after every response. `ApiClient` carries out what
//! they decide.

use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use session_auth::{REFRESH_PATH, UNAUTHENTICATED_PATHS};
use tracing::debug;

use crate::error::{Error, Result};
use crate::request::ApiRequest;

/// What to do with a completed response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseAction {
    /// Success, hand it to the caller unchanged
    Return,
    /// 401 on a protected call that has not been retried yet
    RefreshAndRetry,
    /// Surface as an error without touching the session
    Propagate,
}

/// Strip the query string so `/auth/login?next=x` still counts as login.
fn route(path: &str) -> &str {
    let path = path.split(['?', '#']).next().unwrap_or(path);
    path.trim_end_matches('/')
}

/// Login and refresh never carry a bearer token.
pub fn is_unauthenticated(path: &str) -> bool {
    let route = route(path);
    UNAUTHENTICATED_PATHS.iter().any(|p| *p == route)
}

/// Whether the call is the refresh call itself.
pub fn is_refresh_call(path: &str) -> bool {
    route(path) == REFRESH_PATH
}

/// Attach `Authorization: Bearer <access>` unless the path is exempt or there
/// is no token. Any caller-supplied authorization header is replaced.
pub fn authorize(headers: &mut HeaderMap, path: &str, access: Option<&str>) -> Result<()> {
    if is_unauthenticated(path) {
        debug!(path, "unauthenticated endpoint, no bearer token");
        return Ok(());
    }
    let Some(access) = access else {
        return Ok(());
    };

    let mut value = HeaderValue::from_str(&format!("Bearer {access}"))
        .map_err(|e| Error::InvalidRequest(format!("invalid token value: {e}")))?;
    value.set_sensitive(true);
    headers.insert(AUTHORIZATION, value);
    Ok(())
}

/// Decide what happens after a response comes back.
///
/// A 401 from the refresh endpoint is never answered with another refresh,
/// and a request that was already retried once is never retried again.
pub fn classify_response(status: StatusCode, request: &ApiRequest) -> ResponseAction {
    if status.is_success() {
        return ResponseAction::Return;
    }
    if status == StatusCode::UNAUTHORIZED
        && !is_refresh_call(request.path())
        && !request.is_retried()
    {
        return ResponseAction::RefreshAndRetry;
    }
    ResponseAction::Propagate
}
