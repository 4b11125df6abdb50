//! Authenticated client for the campaign REST API
//!
//! Wraps `reqwest` with the two interception points the session needs:
//! - before dispatch, attach the current bearer token (except on login/refresh)
//! - after a 401, have the refresh coordinator produce a new token and send
//!   the original request once more
//!
//! Non-auth failures are surfaced as they are. This is not a general retry
//! layer: a request is re-sent at most once, and only after a 401.

pub mod client;
pub mod error;
pub mod interceptor;
pub mod metrics;
pub mod request;

pub use client::ApiClient;
pub use error::{Error, Result};
pub use interceptor::{ResponseAction, authorize, classify_response, is_unauthenticated};
pub use request::{ApiRequest, ApiResponse};
