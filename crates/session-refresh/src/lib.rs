//! Single-flight token refresh for the campaign API session
//!
//! Owns the session and makes sure that however many requests fail with 401
//! at the same time, exactly one refresh call goes out. Everyone who asked
//! during that window gets the same outcome, in the order they asked.
//!
//! Session lifecycle:
//! 1. `login()` installs a token pair → `SignedIn`
//! 2. A 401 elsewhere calls `refresh_access_token()` → one refresh call, queue waits
//! 3. Refresh succeeds → new pair installed, queue released with the new token
//! 4. Refresh fails or times out → both tokens cleared, queue released with the error → `Expired`
//! 5. `logout()` clears locally, then revokes server-side best effort → `SignedOut`

pub mod coordinator;
pub mod error;
pub mod metrics;

pub use coordinator::{RefreshCoordinator, RefreshOutcome, SessionStatus};
pub use error::{Error, Result};
