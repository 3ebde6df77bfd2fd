//! Subscription checkout.
//!
//! The request client never retries; this is the one flow that does, up to a caller-chosen
//! number of attempts. An unauthenticated session is never retried.

use reqwest::Method;
use serde::Deserialize;

use crate::client::ApiClient;
use crate::error::{Error, Result};

pub const DEFAULT_MAX_ATTEMPTS: u32 = 2;

#[derive(Debug, Deserialize)]
struct CheckoutSession {
    #[serde(default)]
    url: Option<String>,
}

/// Ask the backend for a checkout session and return the URL to open.
pub async fn start_checkout(client: &ApiClient, max_attempts: u32) -> Result<String> {
    let max_attempts = max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match request_checkout(client).await {
            Ok(url) => return Ok(url),
            Err(Error::Unauthenticated) => return Err(Error::Unauthenticated),
            Err(e) if attempt >= max_attempts => return Err(e),
            Err(e) => {
                tracing::warn!(attempt, max_attempts, error = %e, "checkout failed, retrying");
                attempt += 1;
            }
        }
    }
}

async fn request_checkout(client: &ApiClient) -> Result<String> {
    if !client.session().is_authenticated() {
        return Err(Error::Unauthenticated);
    }
    let session: CheckoutSession = client
        .call_as(Method::POST, "/stripe/checkout-session", None)
        .await
        .map_err(Error::authenticated)?;

    session
        .url
        .filter(|url| url.starts_with("http"))
        .ok_or_else(|| Error::MalformedResponse {
            status: 200,
            detail: "checkout returned an invalid URL".into(),
        })
}

#[derive(Debug, Deserialize)]
struct AccountStatus {
    #[serde(default)]
    trial_expira_em: Option<String>,
}

/// When the free trial ends or ended, from `GET /auth/me`. Best effort.
pub async fn trial_expiry(client: &ApiClient) -> Option<String> {
    match client
        .call_as::<AccountStatus>(Method::GET, "/auth/me", None)
        .await
    {
        Ok(status) => status.trial_expira_em,
        Err(e) => {
            tracing::debug!(error = %e, "could not read trial expiry");
            None
        }
    }
}

/// Message for a 402: the backend's own `detail` when it sent one, otherwise a message built
/// from the trial expiry date.
pub fn trial_expired_notice(detail: Option<&str>, expired_at: Option<&str>) -> String {
    match detail.map(str::trim).filter(|d| !d.is_empty()) {
        Some(detail) => detail.to_string(),
        None => trial_expired_message(expired_at),
    }
}

/// User-facing message for an expired trial.
pub fn trial_expired_message(expired_at: Option<&str>) -> String {
    let formatted = expired_at
        .and_then(|value| chrono::DateTime::parse_from_rfc3339(value).ok())
        .map(|dt| dt.format("%d/%m/%Y %H:%M").to_string());
    match formatted {
        Some(when) => format!("Your free trial ended on {when}."),
        None => "Your free trial has ended.".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trial_message_with_and_without_date() {
        assert_eq!(
            trial_expired_message(Some("2025-03-01T12:30:00+00:00")),
            "Your free trial ended on 01/03/2025 12:30."
        );
        assert_eq!(trial_expired_message(Some("garbage")), "Your free trial has ended.");
        assert_eq!(trial_expired_message(None), "Your free trial has ended.");
    }

    #[test]
    fn notice_prefers_backend_detail() {
        assert_eq!(
            trial_expired_notice(Some("Trial expirado. Ative o plano Pro para continuar."), None),
            "Trial expirado. Ative o plano Pro para continuar."
        );
        assert_eq!(
            trial_expired_notice(Some("  "), Some("2025-03-01T12:30:00+00:00")),
            "Your free trial ended on 01/03/2025 12:30."
        );
        assert_eq!(trial_expired_notice(None, None), "Your free trial has ended.");
    }
}
