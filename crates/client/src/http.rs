//! The authenticated REST client every service goes through.
//!
//! Requests carry `Authorization: Bearer <token>` whenever a user is signed
//! in. Non-success responses are normalized into [`ClientError::Backend`];
//! for session-bound resources a 401/403 additionally signs the user out and
//! redirects to login (see [`AuthPolicy`]).

use std::sync::Arc;

use reqwest::{Method, StatusCode};
use secrecy::ExposeSecret;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, error, instrument};
use url::Url;

use crate::auth::AuthGate;
use crate::config::ClientConfig;
use crate::error::{ClientError, Result, backend_error};

/// How a 401/403 response is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthPolicy {
    /// The resource belongs to the session (cart, addresses, orders):
    /// rejection means the session is gone, so sign out and redirect.
    Session,
    /// Surface the backend error unchanged.
    Surface,
}

/// A request to the backend, built up before sending.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    method: Method,
    path: String,
    query: Vec<(&'static str, String)>,
    body: Option<serde_json::Value>,
    policy: AuthPolicy,
}

impl ApiRequest {
    fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            policy: AuthPolicy::Surface,
        }
    }

    #[must_use]
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    #[must_use]
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    #[must_use]
    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    #[must_use]
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Append a query parameter.
    #[must_use]
    pub fn query(mut self, key: &'static str, value: impl ToString) -> Self {
        self.query.push((key, value.to_string()));
        self
    }

    /// Attach a JSON body.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Decode` if the body cannot be serialized.
    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self> {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self)
    }

    /// Treat 401/403 as an expired session.
    #[must_use]
    pub const fn session(mut self) -> Self {
        self.policy = AuthPolicy::Session;
        self
    }

    #[must_use]
    pub const fn policy(&self) -> AuthPolicy {
        self.policy
    }
}

/// REST client for the marketplace backend.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    client: reqwest::Client,
    base_url: Url,
    auth: AuthGate,
}

impl ApiClient {
    /// Create a client for the configured backend.
    #[must_use]
    pub fn new(config: &ClientConfig, auth: AuthGate) -> Self {
        Self {
            inner: Arc::new(ApiClientInner {
                client: reqwest::Client::new(),
                base_url: config.api_base_url.clone(),
                auth,
            }),
        }
    }

    /// The auth gate whose credential this client sends.
    #[must_use]
    pub fn auth(&self) -> &AuthGate {
        &self.inner.auth
    }

    /// Resolve a request path against the base URL, keeping any base path
    /// prefix (`http://host/shop` + `/api/cart/1`).
    fn url(&self, path: &str, query: &[(&'static str, String)]) -> Result<Url> {
        let base = self.inner.base_url.as_str().trim_end_matches('/');
        let mut url = Url::parse(&format!("{base}{path}")).map_err(|e| {
            ClientError::Validation(format!("invalid request path {path}: {e}"))
        })?;
        if !query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(query.iter().map(|(k, v)| (*k, v.as_str())));
        }
        Ok(url)
    }

    /// Send a request and decode the JSON response.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::AuthRequired` for rejected sessions (under
    /// [`AuthPolicy::Session`]), `ClientError::Backend` for other non-success
    /// statuses, and transport or decoding errors.
    pub async fn send<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T> {
        let body = self.execute(request).await?;
        serde_json::from_str(&body).map_err(|e| {
            error!(
                error = %e,
                body = %body.chars().take(500).collect::<String>(),
                "failed to decode backend response"
            );
            ClientError::Decode(e)
        })
    }

    /// Send a request whose response body is irrelevant.
    ///
    /// # Errors
    ///
    /// Same as [`send`](Self::send), minus decoding.
    pub async fn send_empty(&self, request: ApiRequest) -> Result<()> {
        self.execute(request).await.map(drop)
    }

    #[instrument(skip(self, request), fields(method = %request.method, path = %request.path))]
    async fn execute(&self, request: ApiRequest) -> Result<String> {
        let url = self.url(&request.path, &request.query)?;
        let mut builder = self.inner.client.request(request.method.clone(), url);
        if let Some(token) = self.inner.auth.token() {
            builder = builder.bearer_auth(token.expose_secret());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if status.is_success() {
            debug!(status = %status, "backend request succeeded");
            return Ok(text);
        }

        if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN)
            && request.policy == AuthPolicy::Session
        {
            return Err(self.inner.auth.expire_session());
        }

        let err = backend_error(status, &text);
        error!(status = %status, error = %err, "backend returned non-success status");
        Err(err)
    }
}
