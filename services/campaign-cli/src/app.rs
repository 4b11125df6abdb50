//! Command execution against a wired-up session

use api_client::{ApiClient, ApiRequest};
use common::Secret;
use session_refresh::SessionStatus;
use tracing::{info, warn};

use crate::command::Command;
use crate::error::{Error, Result};

/// Everything a command needs once config is resolved.
pub struct App {
    client: ApiClient,
    default_email: Option<String>,
    password: Option<Secret<String>>,
    ephemeral: bool,
}

impl App {
    pub fn new(
        client: ApiClient,
        default_email: Option<String>,
        password: Option<Secret<String>>,
    ) -> Self {
        Self {
            client,
            default_email,
            password,
            ephemeral: false,
        }
    }

    /// The session lives only as long as this process; `login` is refused.
    pub fn without_session_file(mut self) -> Self {
        self.ephemeral = true;
        self
    }

    /// Run one command. `Some` is JSON for stdout.
    pub async fn run(&self, command: Command) -> Result<Option<serde_json::Value>> {
        match command {
            Command::Login { email } => {
                if self.ephemeral {
                    return Err(Error::NoSessionFile);
                }
                let email = email
                    .or_else(|| self.default_email.clone())
                    .ok_or(Error::MissingEmail)?;
                let password = self.password.as_ref().ok_or(Error::MissingPassword)?;
                self.client
                    .coordinator()
                    .login(&email, password.expose())
                    .await?;
                info!(%email, "signed in");
                Ok(None)
            }
            Command::Whoami => self.get("/users/me").await.map(Some),
            Command::Get { path } => self.get(&path).await.map(Some),
            Command::Logout => {
                self.client.coordinator().logout().await;
                Ok(None)
            }
        }
    }

    async fn get(&self, path: &str) -> Result<serde_json::Value> {
        let coordinator = self.client.coordinator();
        if coordinator.access_token().await.is_none() {
            if coordinator.status() == SessionStatus::Expired {
                return Err(Error::SessionExpired);
            }
            warn!(path, "no session, calling without a token");
        }

        let response = match self.client.send(ApiRequest::get(path)).await {
            Err(e) if e.is_unauthorized() && coordinator.status() == SessionStatus::SignedOut => {
                return Err(Error::NotSignedIn);
            }
            result => result?,
        };
        if response.body.is_empty() {
            return Ok(serde_json::Value::Null);
        }
        Ok(response.json()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::Json;
    use axum::http::{HeaderMap, StatusCode};
    use axum::response::{IntoResponse, Response};
    use axum::routing::{get, post};
    use session_auth::{HttpCredentialService, SessionStore};
    use session_refresh::RefreshCoordinator;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::net::TcpListener;

    async fn login_handler(Json(body): Json<serde_json::Value>) -> Response {
        if body["email"] == "u@x.com" && body["password"] == "pw" {
            Json(serde_json::json!({
                "access_token": "A1",
                "refresh_token": "R1",
                "token_type": "bearer"
            }))
            .into_response()
        } else {
            (
                StatusCode::UNAUTHORIZED,
                Json(serde_json::json!({"detail": "Incorrect email or password"})),
            )
                .into_response()
        }
    }

    async fn refresh_handler() -> Response {
        (
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({"detail": "Invalid refresh token"})),
        )
            .into_response()
    }

    async fn me_handler(headers: HeaderMap) -> Response {
        match headers.get("authorization").and_then(|v| v.to_str().ok()) {
            Some("Bearer A1") => {
                Json(serde_json::json!({"id": 7, "email": "u@x.com"})).into_response()
            }
            _ => (
                StatusCode::UNAUTHORIZED,
                Json(serde_json::json!({"detail": "Could not validate credentials"})),
            )
                .into_response(),
        }
    }

    async fn start_api() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let app = axum::Router::new()
            .route("/api/v1/auth/login", post(login_handler))
            .route("/api/v1/auth/refresh", post(refresh_handler))
            .route("/api/v1/auth/logout", post(|| async { StatusCode::NO_CONTENT }))
            .route("/api/v1/users/me", get(me_handler))
            .route("/api/v1/admin", get(|| async { StatusCode::UNAUTHORIZED }))
            .route("/api/v1/ping", get(|| async { StatusCode::NO_CONTENT }));
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        format!("http://{addr}/api/v1")
    }

    fn app_for(base: &str, store: Option<SessionStore>, password: Option<&str>) -> App {
        let http = reqwest::Client::new();
        let service = Arc::new(HttpCredentialService::new(http.clone(), base));
        let mut coordinator = RefreshCoordinator::new(service, Duration::from_secs(5));
        if let Some(store) = store {
            coordinator = coordinator.with_store(store);
        }
        let client = ApiClient::new(http, base, Arc::new(coordinator));
        App::new(
            client,
            Some("u@x.com".into()),
            password.map(|p| Secret::new(p.to_string())),
        )
    }

    #[tokio::test]
    async fn login_then_whoami() {
        let base = start_api().await;
        let app = app_for(&base, None, Some("pw"));

        assert!(app.run(Command::Login { email: None }).await.unwrap().is_none());
        let me = app.run(Command::Whoami).await.unwrap().unwrap();
        assert_eq!(me["email"], "u@x.com");
    }

    #[tokio::test]
    async fn session_survives_between_runs() {
        let base = start_api().await;
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("session.json"));

        let first = app_for(&base, Some(store.clone()), Some("pw"));
        first.run(Command::Login { email: None }).await.unwrap();

        let second = app_for(&base, Some(store), None);
        second.client.coordinator().restore().await.unwrap();
        let me = second
            .run(Command::Get {
                path: "/users/me".into(),
            })
            .await
            .unwrap()
            .unwrap();
        assert_eq!(me["id"], 7);
    }

    #[tokio::test]
    async fn wrong_password_is_reported() {
        let base = start_api().await;
        let app = app_for(&base, None, Some("nope"));

        let err = app
            .run(Command::Login {
                email: Some("u@x.com".into()),
            })
            .await
            .unwrap_err();
        assert!(
            err.to_string().contains("Incorrect email or password"),
            "got: {err}"
        );
    }

    #[tokio::test]
    async fn login_without_password_fails_early() {
        let base = start_api().await;
        let app = app_for(&base, None, None);
        let err = app.run(Command::Login { email: None }).await.unwrap_err();
        assert!(matches!(err, Error::MissingPassword), "got: {err:?}");
    }

    #[tokio::test]
    async fn login_refused_without_session_file() {
        let base = start_api().await;
        let app = app_for(&base, None, Some("pw")).without_session_file();

        let err = app.run(Command::Login { email: None }).await.unwrap_err();
        assert!(matches!(err, Error::NoSessionFile), "got: {err:?}");
        assert!(app.client.coordinator().access_token().await.is_none());
    }

    #[tokio::test]
    async fn never_signed_in_is_not_called_expired() {
        let base = start_api().await;
        let app = app_for(&base, None, None);

        let err = app.run(Command::Whoami).await.unwrap_err();
        assert!(matches!(err, Error::NotSignedIn), "got: {err:?}");
        assert_eq!(app.client.coordinator().status(), SessionStatus::SignedOut);
    }

    #[tokio::test]
    async fn unrecoverable_401_asks_for_login() {
        let base = start_api().await;
        let app = app_for(&base, None, Some("pw"));
        app.run(Command::Login { email: None }).await.unwrap();

        // the mock refuses every refresh, so this 401 ends the session
        let err = app
            .run(Command::Get {
                path: "/admin".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::SessionExpired), "got: {err:?}");
        assert_eq!(app.client.coordinator().status(), SessionStatus::Expired);

        // once expired, commands fail without touching the API
        let err = app.run(Command::Whoami).await.unwrap_err();
        assert!(matches!(err, Error::SessionExpired), "got: {err:?}");
    }

    #[tokio::test]
    async fn non_auth_failure_is_not_a_login_prompt() {
        let base = start_api().await;
        let app = app_for(&base, None, Some("pw"));
        app.run(Command::Login { email: None }).await.unwrap();

        let err = app
            .run(Command::Get {
                path: "/campaigns/404".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Api(_)), "got: {err:?}");
    }

    #[tokio::test]
    async fn logout_always_succeeds() {
        let base = start_api().await;
        let app = app_for(&base, None, Some("pw"));

        assert!(app.run(Command::Logout).await.unwrap().is_none());
        app.run(Command::Login { email: None }).await.unwrap();
        assert!(app.run(Command::Logout).await.unwrap().is_none());
        assert_eq!(app.client.coordinator().status(), SessionStatus::SignedOut);
    }

    #[tokio::test]
    async fn empty_body_prints_null() {
        let base = start_api().await;
        let app = app_for(&base, None, Some("pw"));
        app.run(Command::Login { email: None }).await.unwrap();

        let value = app
            .run(Command::Get {
                path: "/ping".into(),
            })
            .await
            .unwrap()
            .unwrap();
        assert!(value.is_null());
    }
}
