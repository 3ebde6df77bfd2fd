//! Keeps an idea's vector consistent with its text across create and edit.
//!
//! On create the backend computes the vector atomically with the insert, so the pipeline only
//! forwards to [`Reconciler::create`]. On edit the old vector is dropped first, the text is made
//! durable, and a fresh vector is computed and uploaded on a best-effort basis. If any of the
//! embedding steps fail the record is left with no vector at all, never with the old one.

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::EmbeddingProvider;
use crate::error::Result;
use crate::ideas::{Idea, IdeaDraft, IdeaId, Reconciler};

/// What happened to the vector during an edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddingStatus {
    /// A vector computed from the new text was stored.
    Refreshed,
    /// The record has no vector until something recomputes it.
    Cleared,
}

#[derive(Debug, Clone)]
pub struct EditOutcome {
    pub idea: Idea,
    /// The text update was only applied to the local mirror.
    pub stale: bool,
    pub embedding: EmbeddingStatus,
}

pub struct EmbeddingPipeline {
    reconciler: Arc<Reconciler>,
    provider: Option<Arc<dyn EmbeddingProvider>>,
}

impl EmbeddingPipeline {
    pub fn new(reconciler: Arc<Reconciler>, provider: Option<Arc<dyn EmbeddingProvider>>) -> Self {
        Self {
            reconciler,
            provider,
        }
    }

    pub fn reconciler(&self) -> &Arc<Reconciler> {
        &self.reconciler
    }

    pub fn has_provider(&self) -> bool {
        self.provider.is_some()
    }

    /// Create an idea. The backend attaches the vector server-side; a draft that already
    /// carries a vector is stored with it.
    ///
    /// Blocks until the backend confirms an id; an unconfirmed create is an error.
    pub async fn attach_on_create(&self, draft: &IdeaDraft) -> Result<Idea> {
        let idea = self.reconciler.create(draft).await?;
        if idea.embedding.is_none() {
            debug!(id = %idea.id, "created without vector in response; backend attaches it");
        }
        Ok(idea)
    }

    /// Edit an idea and regenerate its vector.
    ///
    /// 1. drop the mirrored vector
    /// 2. update the text (errors here abort the edit)
    /// 3. embed the new text
    /// 4. upload the new vector
    ///
    /// Failures in steps 1, 3 and 4 are logged and leave the record without a vector.
    pub async fn refresh_on_edit(&self, id: IdeaId, draft: &IdeaDraft) -> Result<EditOutcome> {
        if let Err(e) = self.reconciler.invalidate_embedding(id) {
            warn!(%id, error = %e, "failed to drop mirrored embedding before edit");
        }

        let synced = self.reconciler.update(id, draft).await?;
        let mut idea = synced.value;
        // Whatever came back was computed from the pre-edit text or not at all.
        idea.embedding = None;

        let embedding = match self.regenerate(id, draft).await {
            Some(vector) => {
                idea.embedding = Some(vector);
                EmbeddingStatus::Refreshed
            }
            None => {
                if let Err(e) = self.reconciler.record_missing_embedding(id) {
                    warn!(%id, error = %e, "failed to record missing embedding after edit");
                }
                EmbeddingStatus::Cleared
            }
        };

        Ok(EditOutcome {
            idea,
            stale: synced.stale,
            embedding,
        })
    }

    async fn regenerate(&self, id: IdeaId, draft: &IdeaDraft) -> Option<Vec<f32>> {
        let Some(provider) = &self.provider else {
            info!(%id, "no embedding provider configured; idea left without vector");
            return None;
        };

        let vector = match provider.embed(&draft.embedding_text()).await {
            Ok(vector) => vector,
            Err(e) => {
                warn!(%id, error = %e, "embedding regeneration failed");
                return None;
            }
        };

        match self.reconciler.update_embedding(id, &vector).await {
            Ok(()) => {
                debug!(%id, model = provider.model_name(), "embedding refreshed");
                Some(vector)
            }
            Err(e) => {
                warn!(%id, error = %e, "embedding upload failed");
                None
            }
        }
    }

    /// Ideas whose last edit left them without a vector, and therefore invisible to
    /// similarity search.
    pub fn missing_embeddings(&self) -> Result<Vec<IdeaId>> {
        self.reconciler.mirror().missing_embeddings()
    }
}
