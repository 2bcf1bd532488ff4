//! HTTP client for the dashboard REST API.
//!
//! Every request carries the stored access token. A 401 triggers one refresh
//! exchange and one replay of the original request; anything that goes wrong
//! on that path clears the credential store and surfaces
//! [`ApiError::SessionExpired`].

use crate::config::ApiSettings;
use crate::error::{ApiError, ExpiryCause};
use crate::models::auth::{ErrorDetail, LoginRequest, RefreshRequest, RefreshResponse, TokenPair};
use crate::models::UserProfile;
use crate::services::metrics::ClientMetrics;
use crate::session::{CredentialSet, CredentialStore};
use reqwest::{Client, Method, Response, StatusCode};
use secrecy::{ExposeSecret, Secret};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use service_core::observability::TracedClientExt;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use uuid::Uuid;

pub const LOGIN_PATH: &str = "/api/auth/login/";
pub const LOGOUT_PATH: &str = "/api/auth/logout/";
pub const REFRESH_PATH: &str = "/api/auth/refresh/";
pub const ME_PATH: &str = "/api/users/me/";

const DEFAULT_LOGIN_ERROR: &str = "Unable to log in with the provided credentials";

/// A replayable description of one logical API call.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self, ApiError> {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self)
    }
}

/// Position of a send within a logical request. Only the first send may
/// trigger renewal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Attempt {
    Initial,
    Replay,
}

pub struct ApiClient {
    client: Client,
    base_url: String,
    store: Arc<dyn CredentialStore>,
    metrics: ClientMetrics,
    // Held across a refresh exchange so concurrent 401s on the same stale
    // token produce one exchange.
    renewal_lock: Mutex<()>,
}

impl ApiClient {
    pub fn new(settings: &ApiSettings, store: Arc<dyn CredentialStore>) -> Result<Self, ApiError> {
        let client = Client::builder().timeout(settings.timeout()).build()?;

        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            store,
            metrics: ClientMetrics::new(),
            renewal_lock: Mutex::new(()),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn store(&self) -> &Arc<dyn CredentialStore> {
        &self.store
    }

    pub fn metrics(&self) -> &ClientMetrics {
        &self.metrics
    }

    /// The persisted session, if any. Used at startup to restore login state.
    pub async fn session(&self) -> Option<CredentialSet> {
        self.store.load().await
    }

    /// Send `method path` with an optional JSON body through the renewal path.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Response, ApiError> {
        let mut request = ApiRequest::new(method, path);
        request.body = body;
        self.send(&request).await
    }

    /// Send an authenticated request, renewing the access token once on 401.
    ///
    /// Any non-401 response is returned as is, whatever its status.
    #[tracing::instrument(
        skip(self, request),
        fields(method = %request.method, path = %request.path, request_id)
    )]
    pub async fn send(&self, request: &ApiRequest) -> Result<Response, ApiError> {
        let request_id = Uuid::new_v4().to_string();
        tracing::Span::current().record("request_id", request_id.as_str());

        let mut token = self.store.load().await.map(|session| session.access_token);
        let mut attempt = Attempt::Initial;

        loop {
            let response = self.dispatch(request, token.as_ref(), &request_id).await?;
            if response.status() != StatusCode::UNAUTHORIZED {
                return Ok(response);
            }

            match attempt {
                Attempt::Replay => {
                    tracing::warn!("Renewed access token was rejected");
                    return Err(self.expire(ExpiryCause::RenewalLoop).await);
                }
                Attempt::Initial => {
                    tracing::info!("Access token rejected, renewing");
                    token = Some(self.renew(token.as_ref(), &request_id).await?);
                    attempt = Attempt::Replay;
                }
            }
        }
    }

    /// Send and decode a JSON body; non-2xx statuses become [`ApiError::Status`].
    pub async fn fetch_json<T: DeserializeOwned>(&self, request: &ApiRequest) -> Result<T, ApiError> {
        let response = self.send(request).await?;
        read_json(response).await
    }

    /// Send and only check for a 2xx status (e.g. `DELETE` returning 204).
    pub async fn execute(&self, request: &ApiRequest) -> Result<(), ApiError> {
        let response = self.send(request).await?;
        ensure_success(response).await.map(|_| ())
    }

    /// Exchange email and password for a session and persist it.
    ///
    /// A refusal from the server is `Err(InvalidCredentials)`, never a
    /// renewal attempt.
    pub async fn login(&self, identifier: &str, secret: &str) -> Result<UserProfile, ApiError> {
        let request_id = Uuid::new_v4().to_string();
        let request = ApiRequest::post(LOGIN_PATH).json(&LoginRequest {
            email: identifier,
            password: secret,
        })?;

        let response = self.dispatch(&request, None, &request_id).await?;
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::BAD_REQUEST {
            let body = response.bytes().await.unwrap_or_default();
            let detail = ErrorDetail::from_body(&body)
                .unwrap_or_else(|| DEFAULT_LOGIN_ERROR.to_string());
            tracing::info!(email = %identifier, %status, "Login rejected");
            return Err(ApiError::InvalidCredentials(detail));
        }
        let tokens: TokenPair = read_json(response).await?;

        let access_token = Secret::new(tokens.access);
        let response = self
            .dispatch(&ApiRequest::get(ME_PATH), Some(&access_token), &request_id)
            .await?;
        let profile: UserProfile = read_json(response).await?;

        self.store
            .save(CredentialSet {
                access_token,
                refresh_token: Secret::new(tokens.refresh),
                profile: profile.clone(),
            })
            .await?;

        tracing::info!(
            user_id = %profile.id,
            email = %profile.email,
            "User logged in successfully"
        );
        Ok(profile)
    }

    /// Tell the server to revoke the refresh token, then clear local state.
    ///
    /// Server-side failures are logged and ignored; the store is always cleared.
    pub async fn logout(&self) -> Result<(), ApiError> {
        if let Some(session) = self.store.load().await {
            let request_id = Uuid::new_v4().to_string();
            let notified = match ApiRequest::post(LOGOUT_PATH).json(&RefreshRequest {
                refresh: session.refresh_token(),
            }) {
                Ok(request) => {
                    self.dispatch(&request, Some(&session.access_token), &request_id)
                        .await
                }
                Err(e) => Err(e),
            };

            match notified {
                Ok(response) if response.status().is_success() => {
                    tracing::info!(user_id = %session.profile.id, "Refresh token revoked");
                }
                Ok(response) => {
                    tracing::warn!(status = %response.status(), "Server refused logout");
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to notify server of logout");
                }
            }
        }

        self.store.clear().await?;
        Ok(())
    }

    /// One raw send. No renewal, no retry.
    async fn dispatch(
        &self,
        request: &ApiRequest,
        token: Option<&Secret<String>>,
        request_id: &str,
    ) -> Result<Response, ApiError> {
        let url = format!("{}{}", self.base_url, request.path);
        let started = Instant::now();

        let mut traced = self.client.traced_request(request.method.clone(), &url);
        if !request.query.is_empty() {
            traced = traced.query(&request.query);
        }
        if let Some(body) = &request.body {
            traced = traced.json(body);
        }
        if let Some(token) = token {
            traced = traced.bearer_auth(token.expose_secret());
        }

        let result = traced.send_with_request_id(request_id).await;
        let elapsed = started.elapsed().as_secs_f64();

        match result {
            Ok(response) => {
                self.metrics.observe_request(
                    request.method.as_str(),
                    response.status().as_str(),
                    elapsed,
                );
                tracing::debug!(
                    url = %url,
                    status = %response.status(),
                    elapsed_ms = elapsed * 1000.0,
                    "API response"
                );
                Ok(response)
            }
            Err(e) => {
                self.metrics
                    .observe_request(request.method.as_str(), "error", elapsed);
                tracing::error!("Failed to send {} request to {}: {}", request.method, url, e);
                Err(ApiError::Http(e))
            }
        }
    }

    /// Obtain a usable access token after `stale` was rejected.
    async fn renew(
        &self,
        stale: Option<&Secret<String>>,
        request_id: &str,
    ) -> Result<Secret<String>, ApiError> {
        let _guard = self.renewal_lock.lock().await;

        let Some(session) = self.store.load().await else {
            tracing::warn!("No refresh token available");
            return Err(self.expire(ExpiryCause::MissingRenewalToken).await);
        };

        // Someone else renewed while this request waited for the lock.
        if stale.map(|s| s.expose_secret().as_str()) != Some(session.access_token()) {
            tracing::debug!("Access token already renewed by a concurrent request");
            return Ok(session.access_token);
        }

        match self
            .exchange_refresh_token(session.refresh_token(), request_id)
            .await
        {
            Ok(access) => {
                self.metrics.record_renewal("success");
                self.store
                    .replace_access_token(Secret::new(access.clone()))
                    .await?;
                tracing::info!(user_id = %session.profile.id, "Access token renewed");
                Ok(Secret::new(access))
            }
            Err(e) => {
                self.metrics.record_renewal("rejected");
                tracing::warn!(error = %e, "Token renewal failed");
                Err(self.expire(ExpiryCause::RenewalRejected).await)
            }
        }
    }

    async fn exchange_refresh_token(
        &self,
        refresh_token: &str,
        request_id: &str,
    ) -> Result<String, ApiError> {
        let request = ApiRequest::post(REFRESH_PATH).json(&RefreshRequest {
            refresh: refresh_token,
        })?;
        let response = self.dispatch(&request, None, request_id).await?;
        let renewed: RefreshResponse = read_json(response).await?;
        Ok(renewed.access)
    }

    /// Clear the store and build the error that sends the user back to login.
    async fn expire(&self, cause: ExpiryCause) -> ApiError {
        if let Err(e) = self.store.clear().await {
            tracing::error!(error = %e, "Failed to clear credential store");
        }
        tracing::warn!(%cause, "Session expired, credentials cleared");
        ApiError::SessionExpired(cause)
    }
}

async fn ensure_success(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.bytes().await.unwrap_or_default();
    Err(ApiError::Status {
        status,
        detail: ErrorDetail::from_body(&body),
    })
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    let response = ensure_success(response).await?;
    let body = response.bytes().await?;
    Ok(serde_json::from_slice(&body)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_builder_collects_query_and_body() {
        let request = ApiRequest::get("/api/receitas/")
            .query("ano", 2024)
            .query("mes", "3")
            .json(&serde_json::json!({ "valor": 10 }))
            .unwrap();

        assert_eq!(request.method, Method::GET);
        assert_eq!(
            request.query,
            vec![
                ("ano".to_string(), "2024".to_string()),
                ("mes".to_string(), "3".to_string())
            ]
        );
        assert_eq!(request.body, Some(serde_json::json!({ "valor": 10 })));
    }

    #[test]
    fn test_base_url_is_normalized() {
        let client = ApiClient::new(
            &ApiSettings {
                base_url: "http://localhost:8000/".to_string(),
                timeout_secs: 5,
            },
            Arc::new(crate::session::MemoryCredentialStore::new()),
        )
        .unwrap();

        assert_eq!(client.base_url(), "http://localhost:8000");
    }
}
