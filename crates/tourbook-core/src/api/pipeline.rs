//! The authenticated request pipeline.
//!
//! Every backend call goes through `RequestPipeline::send`, which runs the
//! same three steps:
//!
//! 1. Preparing: attach the session token as the `Authorization` header and
//!    refuse to send if the local expiry marker has passed.
//! 2. In flight: one HTTP exchange. No retries.
//! 3. Resolved: unwrap the `{code, data, message}` envelope, or classify the
//!    failure and apply its side effects (session clear, notice, redirect to
//!    the login route) before handing the error back to the caller.
//!
//! Classification is pure (see `error.rs`); side effects live only in
//! `apply_side_effects`.

use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use reqwest::{header, Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use super::envelope::Envelope;
use super::error::{classify_status, classify_transport, ApiError, ErrorKind};
use crate::auth::session::token_preview;
use crate::auth::SessionState;
use crate::config::Config;
use crate::notify::{Notice, Notifier};
use crate::router::{Navigator, LOGIN_PATH};

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// One backend call, described before it is sent.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
    /// Overrides the content type; JSON bodies default to `application/json`
    pub content_type: Option<&'static str>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            content_type: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self, ApiError> {
        let value = serde_json::to_value(body)
            .map_err(|e| ApiError::InvalidResponse(format!("Unserializable request body: {}", e)))?;
        self.body = Some(value);
        Ok(self)
    }

    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    /// Send the query as a form-encoded request, as the category delete
    /// endpoint expects
    pub fn form_encoded(mut self) -> Self {
        self.content_type = Some(FORM_CONTENT_TYPE);
        self
    }
}

/// HTTP client plus the session/notice/navigation policy around it.
pub struct RequestPipeline {
    client: Client,
    base_url: String,
    session: SessionState,
    navigator: Arc<dyn Navigator>,
    notifier: Arc<dyn Notifier>,
}

impl RequestPipeline {
    pub fn new(
        config: &Config,
        session: SessionState,
        navigator: Arc<dyn Navigator>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .cookie_store(true)
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            session,
            navigator,
            notifier,
        })
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    /// Run a request through the pipeline and return the envelope's payload.
    pub async fn send<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<Option<T>, ApiError> {
        let token = self.session.get_token();
        let outcome = match self.prepare(&request, &token) {
            Ok(builder) => self.dispatch(builder, &request).await,
            Err(err) => Err(err),
        };
        match outcome {
            Ok(data) => Ok(data),
            Err(err) => {
                self.apply_side_effects(&err, &token);
                Err(err)
            }
        }
    }

    /// Run a request and hand back the envelope as received.
    ///
    /// Transport and HTTP status failures are classified and reported as in
    /// `send`. A non-200 envelope code is left for the caller to inspect.
    pub async fn execute_raw<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<Envelope<T>, ApiError> {
        let token = self.session.get_token();
        let outcome = match self.prepare(&request, &token) {
            Ok(builder) => self.dispatch_envelope(builder, &request).await,
            Err(err) => Err(err),
        };
        outcome.inspect_err(|err| self.apply_side_effects(err, &token))
    }

    /// Like `send`, but a missing `data` field is an error.
    pub async fn fetch<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ApiError> {
        let path = request.path.clone();
        match self.send(request).await? {
            Some(data) => Ok(data),
            None => Err(ApiError::InvalidResponse(format!("No data in response from {}", path))),
        }
    }

    /// Preparing: build the outgoing request or refuse to send it.
    fn prepare(&self, request: &ApiRequest, token: &str) -> Result<RequestBuilder, ApiError> {
        if self.session.take_expired(Utc::now()) {
            info!(path = %request.path, "Token expired, request not sent");
            return Err(ApiError::ClientSideExpired);
        }

        let url = self.url(&request.path);
        let mut builder = self.client.request(request.method.clone(), &url);

        if !token.is_empty() {
            let value = header::HeaderValue::from_str(token).map_err(|_| ApiError::InvalidHeader)?;
            builder = builder.header(header::AUTHORIZATION, value);
            debug!(token = %token_preview(token), "Attached credential header");
        }
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(ref body) = request.body {
            builder = builder.json(body);
        }
        if let Some(content_type) = request.content_type {
            builder = builder.header(header::CONTENT_TYPE, content_type);
        }

        debug!(method = %request.method, url = %url, "Sending request");
        Ok(builder)
    }

    /// In flight through resolution. Produces the payload or a classified error.
    async fn dispatch<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
        request: &ApiRequest,
    ) -> Result<Option<T>, ApiError> {
        self.dispatch_envelope(builder, request).await?.into_result()
    }

    async fn dispatch_envelope<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
        request: &ApiRequest,
    ) -> Result<Envelope<T>, ApiError> {
        let response = builder.send().await.map_err(classify_transport)?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status, &body));
        }

        let text = response.text().await.map_err(ApiError::Transport)?;
        debug!(path = %request.path, status = %status, "Response received");

        serde_json::from_str(&text).map_err(|e| {
            ApiError::InvalidResponse(format!("Failed to parse response from {}: {}", request.path, e))
        })
    }

    /// Side effects for a classified failure. `token` is the value attached
    /// when the request was prepared.
    fn apply_side_effects(&self, err: &ApiError, token: &str) {
        match err.kind() {
            ErrorKind::ClientSideExpired => {
                // the session was already cleared while preparing
                self.notifier.notify(Notice::error(err.user_message()));
                self.navigator.navigate(LOGIN_PATH);
            }
            ErrorKind::SessionInvalid => {
                if token.is_empty() {
                    // nothing to clear, e.g. a rejected login
                    warn!("Unauthorized response without a session");
                    self.notifier.notify(Notice::error(err.user_message()));
                    self.navigator.navigate(LOGIN_PATH);
                } else if self.session.invalidate(token) {
                    warn!("Token rejected by server, logging out");
                    self.notifier.notify(Notice::error(err.user_message()));
                    self.navigator.navigate(LOGIN_PATH);
                } else {
                    debug!(token = %token_preview(token), "Unauthorized response for a session that is already gone");
                }
            }
            ErrorKind::NetworkUnreachable => {
                error!(error = %err, "Network error");
                self.notifier.notify(Notice::error(err.user_message()));
            }
            ErrorKind::ServerError => {
                error!(error = %err, status = ?err.status(), "Request failed");
                self.notifier.notify(Notice::error(err.user_message()));
            }
        }
    }
}
