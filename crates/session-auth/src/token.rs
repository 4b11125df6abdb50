//! Login, refresh and logout against the auth endpoints
//!
//! Three unauthenticated POSTs, each translated into a typed result:
//! 1. `login` trades email + password for a token pair
//! 2. `refresh_token` trades a refresh token for a new pair
//! 3. `revoke` invalidates a refresh token and never fails
//!
//! The free functions are stateless. `CredentialService` wraps them behind a
//! dyn-compatible trait so the refresh coordinator can be driven by a scripted
//! fake in tests.

use std::future::Future;
use std::pin::Pin;

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::constants::{LOGIN_PATH, LOGOUT_PATH, REFRESH_PATH, endpoint_url};
use crate::error::{Error, Result};

/// Token pair returned by both login and refresh.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

/// Exchange email + password for a token pair.
///
/// 401/403 mean the credentials were refused and map to `AuthRejected`.
/// Everything else that is not a token pair is a `NetworkFailure`.
pub async fn login(
    client: &reqwest::Client,
    base_url: &str,
    email: &str,
    password: &str,
) -> Result<TokenResponse> {
    let response = client
        .post(endpoint_url(base_url, LOGIN_PATH))
        .json(&LoginRequest { email, password })
        .send()
        .await
        .map_err(|e| Error::NetworkFailure(format!("login request failed: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        let body = read_detail(response).await;
        if is_rejection(status) {
            return Err(Error::AuthRejected(body));
        }
        return Err(Error::NetworkFailure(format!(
            "login endpoint returned {status}: {body}"
        )));
    }

    response
        .json::<TokenResponse>()
        .await
        .map_err(|e| Error::NetworkFailure(format!("invalid login response: {e}")))
}

/// Exchange a refresh token for a new token pair.
///
/// 401/403 mean the refresh token is expired or revoked and map to
/// `RefreshRejected`; the session cannot be saved after that.
pub async fn refresh_token(
    client: &reqwest::Client,
    base_url: &str,
    refresh: &str,
) -> Result<TokenResponse> {
    let response = client
        .post(endpoint_url(base_url, REFRESH_PATH))
        .json(&RefreshRequest {
            refresh_token: refresh,
        })
        .send()
        .await
        .map_err(|e| Error::NetworkFailure(format!("token refresh request failed: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        let body = read_detail(response).await;
        if is_rejection(status) {
            return Err(Error::RefreshRejected(format!(
                "refresh token rejected ({status}): {body}"
            )));
        }
        return Err(Error::NetworkFailure(format!(
            "token refresh returned {status}: {body}"
        )));
    }

    response
        .json::<TokenResponse>()
        .await
        .map_err(|e| Error::NetworkFailure(format!("invalid refresh response: {e}")))
}

/// Revoke a refresh token server-side.
///
/// Best effort: local teardown has already happened by the time this runs and
/// must not depend on the server being reachable, so every failure is logged
/// and dropped.
pub async fn revoke(client: &reqwest::Client, base_url: &str, refresh: &str) {
    let result = client
        .post(endpoint_url(base_url, LOGOUT_PATH))
        .json(&RefreshRequest {
            refresh_token: refresh,
        })
        .send()
        .await;

    match result {
        Ok(response) if response.status().is_success() => {
            debug!("refresh token revoked server-side");
        }
        Ok(response) => {
            let status = response.status();
            warn!(%status, "server-side logout failed, tokens cleared locally");
        }
        Err(e) => {
            warn!(error = %e, "server-side logout unreachable, tokens cleared locally");
        }
    }
}

fn is_rejection(status: StatusCode) -> bool {
    status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN
}

/// Pull the human-readable `detail` out of an error body, falling back to the
/// raw text.
async fn read_detail(response: reqwest::Response) -> String {
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| String::from("<no body>"));
    serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| v.get("detail").and_then(|d| d.as_str()).map(str::to_owned))
        .unwrap_or(body)
}

/// Boxed future returned by `CredentialService` methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The three auth calls as a seam the coordinator depends on.
///
/// Uses boxed futures for dyn-compatibility (`Arc<dyn CredentialService>`).
pub trait CredentialService: Send + Sync {
    fn login<'a>(
        &'a self,
        email: &'a str,
        password: &'a str,
    ) -> BoxFuture<'a, Result<TokenResponse>>;

    fn refresh<'a>(&'a self, refresh: &'a str) -> BoxFuture<'a, Result<TokenResponse>>;

    /// Always completes; failures are swallowed by the implementation.
    fn logout<'a>(&'a self, refresh: &'a str) -> BoxFuture<'a, ()>;
}

/// `CredentialService` backed by the real REST endpoints.
#[derive(Debug, Clone)]
pub struct HttpCredentialService {
    client: reqwest::Client,
    base_url: String,
}

impl HttpCredentialService {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

impl CredentialService for HttpCredentialService {
    fn login<'a>(
        &'a self,
        email: &'a str,
        password: &'a str,
    ) -> BoxFuture<'a, Result<TokenResponse>> {
        Box::pin(login(&self.client, &self.base_url, email, password))
    }

    fn refresh<'a>(&'a self, refresh: &'a str) -> BoxFuture<'a, Result<TokenResponse>> {
        Box::pin(refresh_token(&self.client, &self.base_url, refresh))
    }

    fn logout<'a>(&'a self, refresh: &'a str) -> BoxFuture<'a, ()> {
        Box::pin(revoke(&self.client, &self.base_url, refresh))
    }
}
