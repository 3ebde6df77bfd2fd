//! Session context carrying the bearer token.
//!
//! A [`Session`] is created once, handed to the [`ApiClient`](crate::client::ApiClient) at
//! construction, and driven by the login/logout lifecycle through [`Session::init`] and
//! [`Session::clear`]. Clones share the same underlying credential.

use std::sync::{Arc, RwLock};

#[derive(Debug, Clone, Default)]
pub struct Session {
    token: Arc<RwLock<Option<String>>>,
}

impl Session {
    /// A session with no credential. Requests go out without `Authorization`.
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        let session = Self::default();
        session.init(token);
        session
    }

    /// Install a token (login). Blank tokens clear the session instead.
    pub fn init(&self, token: impl Into<String>) {
        let token = token.into();
        let token = token.trim();
        let mut guard = self.token.write().unwrap_or_else(|e| e.into_inner());
        if token.is_empty() {
            *guard = None;
        } else {
            *guard = Some(token.to_string());
            tracing::info!(token = %redact(token), "session initialized");
        }
    }

    /// Drop the token (logout).
    pub fn clear(&self) {
        let mut guard = self.token.write().unwrap_or_else(|e| e.into_inner());
        if guard.take().is_some() {
            tracing::info!("session cleared");
        }
    }

    pub fn token(&self) -> Option<String> {
        self.token
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.token
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
    }
}

/// First few characters of a token, for logs.
pub fn redact(token: &str) -> String {
    let prefix: String = token.chars().take(8).collect();
    format!("{prefix}…")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_and_clear_lifecycle() {
        let session = Session::anonymous();
        assert!(!session.is_authenticated());

        session.init("abc.def.ghi");
        assert_eq!(session.token().as_deref(), Some("abc.def.ghi"));

        session.clear();
        assert!(session.token().is_none());
    }

    #[test]
    fn clones_share_the_credential() {
        let session = Session::anonymous();
        let handle = session.clone();
        session.init("tok");
        assert_eq!(handle.token().as_deref(), Some("tok"));
        handle.clear();
        assert!(!session.is_authenticated());
    }

    #[test]
    fn blank_token_means_logged_out() {
        let session = Session::with_token("tok");
        session.init("   ");
        assert!(!session.is_authenticated());
    }

    #[test]
    fn redact_keeps_only_a_prefix() {
        assert_eq!(redact("eyJhbGciOiJIUzI1NiJ9.payload"), "eyJhbGci…");
    }
}
