//! Authenticated JSON request client for the ideas backend.
//!
//! [`ApiClient::call`] performs exactly one HTTP exchange and classifies the outcome into the
//! crate [`Error`] taxonomy. There are no retries here; callers own retry policy.

use reqwest::header::CONTENT_TYPE;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::session::Session;

/// Longest slice of a non-JSON body kept in a `MalformedResponse`.
const BODY_PREVIEW_LEN: usize = 200;

#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    session: Session,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, session: Session) -> Result<Self> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| Error::Unreachable(format!("failed to build HTTP client: {e}")))?;
        Ok(Self::with_http(http, base_url, session))
    }

    pub fn with_http(http: reqwest::Client, base_url: impl Into<String>, session: Session) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            http,
            base_url,
            session,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// `true` when the base URL points at a backend on this machine.
    pub fn is_local_backend(&self) -> bool {
        self.base_url.contains("localhost") || self.base_url.contains("127.0.0.1")
    }

    /// Issue one request and return the decoded JSON body.
    pub async fn call(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&Value>,
    ) -> Result<Value> {
        let url = format!("{}{}", self.base_url, endpoint);
        let mut request = self.http.request(method.clone(), &url);

        match self.session.token() {
            Some(token) => request = request.bearer_auth(token),
            None => warn!(%method, endpoint, "request without authentication token"),
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        debug!(%method, %url, "sending request");
        let response = request
            .send()
            .await
            .map_err(|e| Error::Unreachable(e.to_string()))?;

        let status = response.status();
        debug!(%method, endpoint, status = status.as_u16(), "response received");

        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.contains("application/json"));

        if !is_json {
            let text = response.text().await.unwrap_or_default();
            let preview: String = text.chars().take(BODY_PREVIEW_LEN).collect();
            warn!(endpoint, status = status.as_u16(), body = %preview, "non-JSON response");
            return Err(Error::MalformedResponse {
                status: status.as_u16(),
                detail: if preview.is_empty() {
                    status_text(status)
                } else {
                    preview
                },
            });
        }

        if !status.is_success() {
            let body: Value = response.json().await.unwrap_or(Value::Null);
            let detail = error_detail(&body).unwrap_or_else(|| status_text(status));
            warn!(endpoint, status = status.as_u16(), %detail, "request rejected");
            return Err(Error::RemoteRejected {
                status: status.as_u16(),
                detail,
            });
        }

        response.json().await.map_err(|e| Error::MalformedResponse {
            status: status.as_u16(),
            detail: format!("invalid JSON body: {e}"),
        })
    }

    /// [`call`](Self::call) and decode the body into `T`.
    pub async fn call_as<T: DeserializeOwned>(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&Value>,
    ) -> Result<T> {
        let value = self.call(method, endpoint, body).await?;
        decode(value)
    }
}

/// Decode a successful body, treating shape mismatches as malformed.
pub fn decode<T: DeserializeOwned>(value: Value) -> Result<T> {
    serde_json::from_value(value).map_err(|e| Error::MalformedResponse {
        status: 200,
        detail: format!("unexpected response shape: {e}"),
    })
}

/// Pull a human-readable message out of an error body.
///
/// FastAPI-style backends put it under `detail`, either as a string or as a list of
/// validation errors.
fn error_detail(body: &Value) -> Option<String> {
    match body.get("detail")? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

fn status_text(status: StatusCode) -> String {
    status
        .canonical_reason()
        .map(str::to_string)
        .unwrap_or_else(|| format!("HTTP {}", status.as_u16()))
}
