//! Similarity search over the user's ideas.
//!
//! The backend embeds the query term itself and ranks by cosine similarity, falling back to
//! a substring match when no vector is close enough. Hits from the textual fallback carry a
//! similarity of `0.0`.

use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::types::IdeaId;
use crate::client::ApiClient;
use crate::error::{Error, Result};

pub const DEFAULT_SEARCH_LIMIT: usize = 10;
/// Upper bound the backend enforces anyway.
pub const MAX_SEARCH_LIMIT: usize = 50;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: IdeaId,
    pub titulo: String,
    #[serde(default)]
    pub tag: Option<String>,
    pub ideia: String,
    #[serde(default)]
    pub data: String,
    #[serde(default)]
    pub similarity: f64,
}

impl SearchHit {
    /// `true` for hits that came from the textual fallback rather than vector search.
    pub fn is_textual(&self) -> bool {
        self.similarity <= 0.0
    }
}

pub fn clamp_limit(limit: Option<usize>) -> usize {
    limit
        .unwrap_or(DEFAULT_SEARCH_LIMIT)
        .clamp(1, MAX_SEARCH_LIMIT)
}

/// `POST /ideias/buscar`. An empty term returns no hits without a request.
pub async fn search_similar(
    client: &ApiClient,
    term: &str,
    limit: Option<usize>,
) -> Result<Vec<SearchHit>> {
    let term = term.trim();
    if term.is_empty() {
        return Ok(Vec::new());
    }

    let body = json!({ "termo": term, "limite": clamp_limit(limit) });
    let hits: Vec<SearchHit> = client
        .call_as(Method::POST, "/ideias/buscar", Some(&body))
        .await
        .map_err(Error::authenticated)?;

    tracing::debug!(term, hits = hits.len(), "similarity search");
    Ok(hits)
}
