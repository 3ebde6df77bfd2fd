//! Create/update/delete contract against the remote store.
//!
//! The [`Reconciler`] is the only writer of the [`LocalMirror`]. Writes that could mint
//! phantom records (`create`) fail loudly; writes that only risk cosmetic staleness (`update`,
//! `remove`) and the full fetch (`list_all`) degrade to the mirror and say so through
//! [`Synced::stale`].

use std::sync::atomic::{AtomicBool, Ordering};

use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, error, info, warn};

use super::mirror::LocalMirror;
use super::types::{Idea, IdeaDraft, IdeaId};
use crate::client::{decode, ApiClient};
use crate::error::{Error, Result};

/// A result that may have been served from the local mirror.
#[derive(Debug, Clone, PartialEq)]
pub struct Synced<T> {
    pub value: T,
    /// `true` when the backend could not confirm this result.
    pub stale: bool,
}

impl<T> Synced<T> {
    fn fresh(value: T) -> Self {
        Self {
            value,
            stale: false,
        }
    }

    fn stale(value: T) -> Self {
        Self { value, stale: true }
    }
}

/// Lenient view of a create/update response. Only `id` decides validity; a field with an
/// unexpected type is treated as absent and falls back to the draft.
#[derive(Debug, Default)]
struct RemoteRecord {
    id: Option<i64>,
    titulo: Option<String>,
    tag: Option<String>,
    ideia: Option<String>,
    data: Option<String>,
    embedding: Option<Vec<f32>>,
}

impl RemoteRecord {
    fn from_value(value: &Value) -> Self {
        let text = |key: &str| value.get(key).and_then(Value::as_str).map(str::to_string);
        Self {
            id: value.get("id").and_then(Value::as_i64).filter(|n| *n > 0),
            titulo: text("titulo"),
            tag: text("tag"),
            ideia: text("ideia"),
            data: text("data"),
            embedding: value.get("embedding").and_then(vector),
        }
    }

    fn into_idea(self, id: IdeaId, draft: &IdeaDraft) -> Idea {
        Idea {
            id,
            titulo: self.titulo.unwrap_or_else(|| draft.titulo.clone()),
            tag: self.tag.or_else(|| draft.tag.clone()),
            ideia: self.ideia.unwrap_or_else(|| draft.ideia.clone()),
            data: self
                .data
                .unwrap_or_else(|| chrono::Utc::now().to_rfc3339()),
            embedding: self.embedding,
        }
    }
}

fn vector(value: &Value) -> Option<Vec<f32>> {
    value
        .as_array()?
        .iter()
        .map(|n| n.as_f64().map(|n| n as f32))
        .collect()
}

#[derive(Debug)]
pub struct Reconciler {
    client: ApiClient,
    mirror: LocalMirror,
    stale: AtomicBool,
}

impl Reconciler {
    pub fn new(client: ApiClient, mirror: LocalMirror) -> Self {
        Self {
            client,
            mirror,
            stale: AtomicBool::new(false),
        }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    /// Read access to the mirror. Mutation goes through the reconciler's operations.
    pub fn mirror(&self) -> &LocalMirror {
        &self.mirror
    }

    /// `true` after any degraded operation, until the next successful [`list_all`](Self::list_all).
    pub fn is_stale(&self) -> bool {
        self.stale.load(Ordering::SeqCst)
    }

    /// Persist a new idea and return it carrying the backend-assigned id.
    ///
    /// A response without an id is [`Error::PersistenceUnconfirmed`] and leaves the mirror
    /// untouched. An id in the provisional range is logged as a suspected fallback id and
    /// returned as [`IdeaId::Provisional`].
    pub async fn create(&self, draft: &IdeaDraft) -> Result<Idea> {
        draft.validate()?;
        let provisional = IdeaId::provisional_now();

        let (endpoint, body) = match &draft.embedding {
            Some(embedding) => (
                "/ideias/com-embedding",
                json!({ "ideia": draft.payload(), "embedding": embedding }),
            ),
            None => ("/ideias", draft.payload()),
        };
        debug!(%provisional, endpoint, "creating idea");

        let response = self
            .client
            .call(Method::POST, endpoint, Some(&body))
            .await
            .map_err(Error::authenticated)?;

        let record = RemoteRecord::from_value(&response);
        let Some(remote) = record.id else {
            error!(%provisional, "create succeeded without a confirmed id");
            return Err(Error::PersistenceUnconfirmed);
        };

        let id = IdeaId::from(remote);
        if id.is_provisional() {
            warn!(%id, "SuspectedFallbackId: backend returned a timestamp-range id");
        }

        let idea = record.into_idea(id, draft);
        if let Err(e) = self.mirror.upsert(&idea) {
            warn!(%id, error = %e, "failed to mirror created idea");
        }
        info!(%provisional, %id, "idea created");
        Ok(idea)
    }

    /// Update an idea by id. Falls back to an in-place mirror merge when the backend cannot be
    /// reached or answers with garbage.
    pub async fn update(&self, id: IdeaId, draft: &IdeaDraft) -> Result<Synced<Idea>> {
        draft.validate()?;
        if id.is_provisional() {
            warn!(%id, "updating an idea whose id was never confirmed");
        }

        let endpoint = format!("/ideias/{id}");
        let result = self
            .client
            .call(Method::PUT, &endpoint, Some(&draft.payload()))
            .await
            .map_err(Error::authenticated);

        match result {
            Ok(response) => {
                let mut idea = RemoteRecord::from_value(&response).into_idea(id, draft);
                // Any vector echoed back was computed from the old text.
                idea.embedding = None;
                if let Err(e) = self.mirror.upsert(&idea) {
                    warn!(%id, error = %e, "failed to mirror updated idea");
                }
                debug!(%id, "idea updated");
                Ok(Synced::fresh(idea))
            }
            Err(e) if e.is_network_failure() => match self.mirror.merge_edit(id, draft)? {
                Some(merged) => {
                    warn!(%id, error = %e, "update degraded to local mirror");
                    self.mark_stale();
                    Ok(Synced::stale(merged))
                }
                None => Err(e),
            },
            Err(e) => Err(e),
        }
    }

    /// Delete an idea. The mirror copy is removed even when the backend call fails; the
    /// result is then flagged stale until the next full fetch reconciles it.
    pub async fn remove(&self, id: IdeaId) -> Result<Synced<()>> {
        let endpoint = format!("/ideias/{id}");
        let result = self
            .client
            .call(Method::DELETE, &endpoint, None)
            .await
            .map_err(Error::authenticated);

        match result {
            Ok(_) => {
                self.mirror.remove(id)?;
                info!(%id, "idea deleted");
                Ok(Synced::fresh(()))
            }
            Err(Error::Unauthenticated) => Err(Error::Unauthenticated),
            Err(e) => {
                self.mirror.remove(id)?;
                warn!(%id, error = %e, "delete not confirmed remotely, removed locally");
                self.mark_stale();
                Ok(Synced::stale(()))
            }
        }
    }

    /// Fetch every idea of the current user and replace the mirror with them. On a network
    /// failure, serve the mirror instead and flag the result stale.
    pub async fn list_all(&self) -> Result<Synced<Vec<Idea>>> {
        match self.fetch_remote().await {
            Ok(ideas) => {
                self.mirror.replace_all(&ideas)?;
                self.stale.store(false, Ordering::SeqCst);
                debug!(count = ideas.len(), "ideas fetched");
                Ok(Synced::fresh(ideas))
            }
            Err(e) if e.is_network_failure() => {
                let ideas = self.mirror.all()?;
                warn!(error = %e, count = ideas.len(), "listing degraded to local mirror");
                self.mark_stale();
                Ok(Synced::stale(ideas))
            }
            Err(e) => Err(e),
        }
    }

    /// `GET /ideias` without touching the mirror.
    pub async fn fetch_remote(&self) -> Result<Vec<Idea>> {
        let response = self
            .client
            .call(Method::GET, "/ideias", None)
            .await
            .map_err(Error::authenticated)?;

        if !response.is_array() {
            return Err(Error::MalformedResponse {
                status: 200,
                detail: "expected an array of ideas".into(),
            });
        }
        let ideas: Vec<Idea> = decode(response)?;

        let provisional = ideas.iter().filter(|i| i.id.is_provisional()).count();
        if provisional > 0 {
            warn!(provisional, "backend listed ideas with timestamp-range ids");
        }
        Ok(ideas)
    }

    /// Fetch one idea, falling back to the mirror copy on a network failure.
    pub async fn get(&self, id: IdeaId) -> Result<Synced<Idea>> {
        let endpoint = format!("/ideias/{id}");
        match self
            .client
            .call_as::<Idea>(Method::GET, &endpoint, None)
            .await
            .map_err(Error::authenticated)
        {
            Ok(idea) => Ok(Synced::fresh(idea)),
            Err(e) if e.is_network_failure() => match self.mirror.get(id)? {
                Some(idea) => {
                    warn!(%id, error = %e, "get degraded to local mirror");
                    Ok(Synced::stale(idea))
                }
                None => Err(e),
            },
            Err(e) => Err(e),
        }
    }

    /// Drop the mirrored embedding of `id` ahead of an edit.
    pub fn invalidate_embedding(&self, id: IdeaId) -> Result<bool> {
        self.mirror.clear_embedding(id)
    }

    /// Drop the mirrored vector of `id` and remember that the backend has none either.
    pub fn record_missing_embedding(&self, id: IdeaId) -> Result<()> {
        self.mirror.clear_embedding(id)?;
        self.mirror.record_missing_embedding(id)
    }

    /// `PUT /ideias/{id}/embedding`, then record the vector in the mirror.
    pub async fn update_embedding(&self, id: IdeaId, embedding: &[f32]) -> Result<()> {
        let endpoint = format!("/ideias/{id}/embedding");
        self.client
            .call(Method::PUT, &endpoint, Some(&json!({ "embedding": embedding })))
            .await
            .map_err(Error::authenticated)?;
        self.mirror.set_embedding(id, embedding)?;
        self.mirror.resolve_missing_embedding(id)?;
        debug!(%id, dimensions = embedding.len(), "embedding stored");
        Ok(())
    }

    /// Forget everything mirrored for the current user (logout, user switch).
    pub fn reset_mirror(&self) -> Result<()> {
        self.mirror.clear()?;
        self.stale.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn mark_stale(&self) {
        self.stale.store(true, Ordering::SeqCst);
    }
}
