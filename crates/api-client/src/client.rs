//! Authenticated API client
//!
//! Every call goes through the same pipeline:
//! 1. read the current access token from the coordinator
//! 2. `authorize` the request and dispatch it
//! 3. `classify_response`; on a first 401, ask the coordinator for a new
//!    token and dispatch the same request exactly once more
//!
//! When the refresh fails the caller gets the 401 that started it, not the
//! refresh error. The coordinator has already cleared the session by then.

use std::sync::Arc;

use reqwest::header::HeaderMap;
use serde::de::DeserializeOwned;
use session_auth::endpoint_url;
use session_refresh::RefreshCoordinator;
use tracing::{debug, instrument, warn};

use crate::error::{Error, Result};
use crate::interceptor::{ResponseAction, authorize, classify_response};
use crate::metrics::record_auth_retry;
use crate::request::{ApiRequest, ApiResponse};

/// HTTP client that attaches the session token and recovers from 401 once.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    coordinator: Arc<RefreshCoordinator>,
}

impl ApiClient {
    pub fn new(
        http: reqwest::Client,
        base_url: impl Into<String>,
        coordinator: Arc<RefreshCoordinator>,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            coordinator,
        }
    }

    pub fn coordinator(&self) -> &Arc<RefreshCoordinator> {
        &self.coordinator
    }

    /// Send a request, refreshing the session and retrying once on 401.
    pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
        let request_id = format!("req_{}", uuid::Uuid::new_v4().as_simple());
        self.send_intercepted(request, request_id).await
    }

    /// GET `path` and decode the JSON body.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.send(ApiRequest::get(path)).await?.json()
    }

    #[instrument(skip_all, fields(request_id = %request_id, method = %request.method(), path = %request.path()))]
    async fn send_intercepted(
        &self,
        mut request: ApiRequest,
        request_id: String,
    ) -> Result<ApiResponse> {
        let access = self.coordinator.access_token().await;
        let response = self.dispatch(&request, access.as_deref()).await?;

        match classify_response(response.status, &request) {
            ResponseAction::Return => Ok(response),
            ResponseAction::Propagate => Err(response.into_error()),
            ResponseAction::RefreshAndRetry => {
                request.mark_retried();
                debug!("401 on protected call, refreshing session");

                // the token this request was rejected with, so a late 401 can
                // pick up a refresh that already happened
                let rejected = access.as_deref();
                let access = match self.coordinator.refresh_access_token(rejected).await {
                    Ok(access) => access,
                    Err(e) => {
                        warn!(error = %e, "session could not be refreshed");
                        record_auth_retry("refresh_failed");
                        return Err(response.into_error());
                    }
                };

                let retried = self.dispatch(&request, Some(&access)).await?;
                match classify_response(retried.status, &request) {
                    ResponseAction::Return => {
                        record_auth_retry("success");
                        Ok(retried)
                    }
                    _ => {
                        warn!(status = %retried.status, "retried call failed again");
                        record_auth_retry("failed_again");
                        Err(retried.into_error())
                    }
                }
            }
        }
    }

    /// One round trip, with the request interceptor applied.
    async fn dispatch(&self, request: &ApiRequest, access: Option<&str>) -> Result<ApiResponse> {
        let mut headers = HeaderMap::new();
        authorize(&mut headers, request.path(), access)?;

        let mut builder = self
            .http
            .request(
                request.method().clone(),
                endpoint_url(&self.base_url, request.path()),
            )
            .headers(headers);
        if let Some(body) = request.body() {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| Error::Network(format!("request failed: {e}")))?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .bytes()
            .await
            .map_err(|e| Error::Network(format!("reading response body: {e}")))?;

        debug!(%status, bytes = body.len(), "response received");
        Ok(ApiResponse {
            status,
            headers,
            body,
        })
    }
}
