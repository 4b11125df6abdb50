//! REST endpoint paths of the campaign API
//!
//! Paths are relative to the configured base URL (which already carries the
//! `/api/v1` prefix).

/// Base URL used when the configuration does not name one
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/api/v1";

/// Exchange email + password for a token pair
pub const LOGIN_PATH: &str = "/auth/login";

/// Exchange a refresh token for a new token pair
pub const REFRESH_PATH: &str = "/auth/refresh";

/// Revoke a refresh token
pub const LOGOUT_PATH: &str = "/auth/logout";

/// Endpoints that must never carry a bearer token.
pub const UNAUTHENTICATED_PATHS: &[&str] = &[LOGIN_PATH, REFRESH_PATH];

/// Join the base URL and an endpoint path without doubling the slash.
pub fn endpoint_url(base_url: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
