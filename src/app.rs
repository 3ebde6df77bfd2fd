//! Wiring of the sync layer from configuration.
//!
//! [`App::open`] opens the mirror database, restores the session token, builds the request
//! client, and hands out the reconciler, the embedding pipeline and the suggestion debouncer.

use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use rusqlite::Connection;

use crate::client::ApiClient;
use crate::config::SacolaConfig;
use crate::db;
use crate::embedding::{self, EmbeddingPipeline, EmbeddingProvider};
use crate::ideas::{LocalMirror, Reconciler};
use crate::session::Session;
use crate::suggest::SuggestionDebouncer;

pub struct App {
    pub config: Arc<SacolaConfig>,
    pub session: Session,
    pub reconciler: Arc<Reconciler>,
    pub pipeline: EmbeddingPipeline,
    pub suggestions: SuggestionDebouncer,
    db: Arc<Mutex<Connection>>,
}

impl App {
    /// Open the on-disk mirror from `config` and build everything on top of it.
    pub fn open(config: SacolaConfig) -> Result<Self> {
        let path = config.resolved_mirror_path();
        let conn = db::open_database(&path)?;
        tracing::info!(mirror = %path.display(), "mirror ready");
        Self::with_connection(config, conn)
    }

    pub fn with_connection(config: SacolaConfig, conn: Connection) -> Result<Self> {
        let session = Session::anonymous();
        match crate::config::env_token() {
            Some(token) => session.init(token),
            None => {
                if let Some(token) = db::credentials::load_token(&conn)? {
                    session.init(token);
                }
            }
        }

        let client = ApiClient::new(config.api.base_url.clone(), session.clone())
            .context("failed to build request client")?;
        if client.is_local_backend() {
            tracing::warn!(url = %client.base_url(), "using a local backend");
        }

        let db = Arc::new(Mutex::new(conn));
        let mirror = LocalMirror::from_shared(Arc::clone(&db));
        let reconciler = Arc::new(Reconciler::new(client.clone(), mirror));

        let provider: Option<Arc<dyn EmbeddingProvider>> =
            embedding::create_provider(&config.embedding)?.map(Arc::from);
        if provider.is_some() {
            tracing::info!(model = %config.embedding.model, "embedding provider ready");
        }
        let pipeline = EmbeddingPipeline::new(Arc::clone(&reconciler), provider);
        let suggestions = SuggestionDebouncer::new(client);

        Ok(Self {
            config: Arc::new(config),
            session,
            reconciler,
            pipeline,
            suggestions,
            db,
        })
    }

    /// Start a session for `token`. The mirror is wiped since it may hold another user's ideas.
    pub fn login(&self, token: &str) -> Result<()> {
        anyhow::ensure!(!token.trim().is_empty(), "token must not be empty");
        {
            let conn = self.lock_db()?;
            db::credentials::store_token(&conn, token.trim())?;
        }
        self.reconciler.reset_mirror()?;
        self.session.init(token);
        Ok(())
    }

    /// End the session and forget the mirrored ideas.
    pub fn logout(&self) -> Result<()> {
        {
            let conn = self.lock_db()?;
            db::credentials::clear_token(&conn)?;
        }
        self.reconciler.reset_mirror()?;
        self.session.clear();
        Ok(())
    }

    fn lock_db(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.db
            .lock()
            .map_err(|e| anyhow::anyhow!("db lock poisoned: {e}"))
    }
}
