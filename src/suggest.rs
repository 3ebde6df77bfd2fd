//! Debounced, single-flight AI suggestion query for the "forgot the idea?" helper.
//!
//! Every call to [`SuggestionDebouncer::submit_text`] invalidates whatever came before it by
//! bumping a request token. A submission waits out [`DEBOUNCE_INTERVAL`], issues one request
//! stamped with its token, and only applies the response if no newer submission happened in
//! the meantime. Result application therefore follows submission order, not response order.
//!
//! ```text
//! Idle ─submit─▶ Pending ─timer─▶ InFlight ─▶ Resolved | Failed
//!   ▲                                              │
//!   └──────────── submit("") / next submit ◀───────┘
//! ```

use std::sync::{Arc, Mutex};
use std::time::Duration;

use reqwest::Method;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::{mpsc, watch};
use tracing::{debug, warn};

use crate::client::ApiClient;
use crate::error::Error;
use crate::ideas::IdeaDraft;

pub const DEBOUNCE_INTERVAL: Duration = Duration::from_millis(800);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Pending,
    InFlight,
    Resolved,
    Failed,
}

/// Snapshot published to subscribers after every transition.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SuggestionState {
    pub phase: Phase,
    pub loading: bool,
    pub results: Vec<String>,
    pub error: Option<String>,
}

impl SuggestionState {
    fn with_phase(phase: Phase) -> Self {
        Self {
            phase,
            loading: matches!(phase, Phase::Pending | Phase::InFlight),
            ..Self::default()
        }
    }

    fn resolved(results: Vec<String>) -> Self {
        Self {
            phase: Phase::Resolved,
            loading: false,
            results,
            error: None,
        }
    }

    fn failed(error: String) -> Self {
        Self {
            phase: Phase::Failed,
            loading: false,
            results: Vec::new(),
            error: Some(error),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.phase, Phase::Idle | Phase::Resolved | Phase::Failed)
    }
}

#[derive(Debug, Deserialize)]
struct SuggestionResponse {
    #[serde(default)]
    sugestoes: Vec<String>,
}

/// Updates for one submission. Ends after a terminal state, or early when a newer
/// submission supersedes this one.
#[derive(Debug)]
pub struct SuggestionStream {
    rx: mpsc::UnboundedReceiver<SuggestionState>,
}

impl SuggestionStream {
    pub async fn next(&mut self) -> Option<SuggestionState> {
        self.rx.recv().await
    }

    /// Drain the stream and return the last update it carried.
    pub async fn last(mut self) -> Option<SuggestionState> {
        let mut last = None;
        while let Some(state) = self.rx.recv().await {
            last = Some(state);
        }
        last
    }
}

struct Inner {
    client: ApiClient,
    /// Token of the latest submission. Checked and published under the same lock.
    latest: Mutex<u64>,
    state: watch::Sender<SuggestionState>,
}

impl Inner {
    /// Publish `state` for `token` unless a newer submission exists. Returns whether it was
    /// applied.
    fn publish(
        &self,
        token: u64,
        state: SuggestionState,
        tx: &mpsc::UnboundedSender<SuggestionState>,
    ) -> bool {
        let latest = self.latest.lock().unwrap_or_else(|e| e.into_inner());
        if *latest != token {
            return false;
        }
        self.state.send_replace(state.clone());
        let _ = tx.send(state);
        true
    }

    async fn fetch(&self, term: &str) -> Result<Vec<String>, Error> {
        let body = json!({ "texto": term });
        let response: SuggestionResponse = self
            .client
            .call_as(Method::POST, "/lembrancas/sugerir", Some(&body))
            .await
            .map_err(Error::authenticated)?;
        Ok(response.sugestoes)
    }
}

#[derive(Clone)]
pub struct SuggestionDebouncer {
    inner: Arc<Inner>,
}

impl SuggestionDebouncer {
    pub fn new(client: ApiClient) -> Self {
        let (state, _) = watch::channel(SuggestionState::default());
        Self {
            inner: Arc::new(Inner {
                client,
                latest: Mutex::new(0),
                state,
            }),
        }
    }

    /// Current state, as last applied.
    pub fn current(&self) -> SuggestionState {
        self.inner.state.borrow().clone()
    }

    /// Follow every applied state across submissions.
    pub fn subscribe(&self) -> watch::Receiver<SuggestionState> {
        self.inner.state.subscribe()
    }

    /// Feed the latest input text.
    ///
    /// Blank input resets to `Idle` before returning and issues no request. Anything else
    /// goes `Pending` immediately and is queried after [`DEBOUNCE_INTERVAL`] unless superseded.
    /// Must be called from within a Tokio runtime.
    pub fn submit_text(&self, text: &str) -> SuggestionStream {
        let (tx, rx) = mpsc::unbounded_channel();
        let term = text.trim().to_string();

        let token = {
            let mut latest = self.inner.latest.lock().unwrap_or_else(|e| e.into_inner());
            *latest += 1;
            let token = *latest;
            let state = if term.is_empty() {
                SuggestionState::default()
            } else {
                SuggestionState::with_phase(Phase::Pending)
            };
            self.inner.state.send_replace(state.clone());
            let _ = tx.send(state);
            token
        };

        if term.is_empty() {
            debug!(token, "suggestion input cleared");
            return SuggestionStream { rx };
        }

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            tokio::time::sleep(DEBOUNCE_INTERVAL).await;
            if !inner.publish(token, SuggestionState::with_phase(Phase::InFlight), &tx) {
                debug!(token, "suggestion superseded before request");
                return;
            }

            let outcome = inner.fetch(&term).await;
            let state = match outcome {
                Ok(results) => SuggestionState::resolved(results),
                Err(e) => {
                    warn!(token, error = %e, "suggestion request failed");
                    SuggestionState::failed(e.to_string())
                }
            };
            if !inner.publish(token, state, &tx) {
                debug!(token, "discarding suggestion response for superseded input");
            }
        });

        SuggestionStream { rx }
    }
}

/// Split a picked suggestion into draft fields.
///
/// Parts are separated by `,` or `.`: the first becomes the title, the second the tag, and the
/// rest the body. With fewer than three parts the whole suggestion is kept as the body.
pub fn split_suggestion(suggestion: &str) -> IdeaDraft {
    let parts: Vec<&str> = suggestion
        .split([',', '.'])
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();

    let titulo = parts.first().copied().unwrap_or("");
    let tag = parts.get(1).copied();
    let ideia = if parts.len() > 2 {
        parts[2..].join(", ")
    } else {
        suggestion.trim().to_string()
    };
    IdeaDraft::new(titulo, tag, &ideia)
}
