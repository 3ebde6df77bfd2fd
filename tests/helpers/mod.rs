#![allow(dead_code)]

use std::sync::Arc;

use sacola::client::ApiClient;
use sacola::db;
use sacola::ideas::{Idea, IdeaId, LocalMirror, Reconciler};
use sacola::session::Session;
use serde_json::{json, Value};

pub const TEST_TOKEN: &str = "test-token-123";

/// Fresh in-memory mirror with schema and migrations applied.
pub fn test_mirror() -> LocalMirror {
    LocalMirror::new(db::open_memory_database().unwrap())
}

pub fn test_client(base_url: &str) -> ApiClient {
    ApiClient::new(base_url, Session::with_token(TEST_TOKEN)).unwrap()
}

/// Reconciler talking to `base_url` with an authenticated session and an empty mirror.
pub fn test_reconciler(base_url: &str) -> Arc<Reconciler> {
    Arc::new(Reconciler::new(test_client(base_url), test_mirror()))
}

/// A base URL nothing is listening on.
pub fn unreachable_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{port}/api")
}

/// Backend JSON for one idea.
pub fn idea_json(id: i64, titulo: &str, ideia: &str) -> Value {
    json!({
        "id": id,
        "titulo": titulo,
        "tag": null,
        "ideia": ideia,
        "data": "2025-01-01T10:00:00",
        "created_at": "2025-01-01T10:00:00",
        "updated_at": "2025-01-01T10:00:00"
    })
}

pub fn idea(id: i64, titulo: &str, ideia: &str) -> Idea {
    Idea {
        id: IdeaId::from(id),
        titulo: titulo.into(),
        tag: None,
        ideia: ideia.into(),
        data: "2025-01-01T10:00:00".into(),
        embedding: None,
    }
}

pub fn raw_ids(ids: &[IdeaId]) -> Vec<i64> {
    ids.iter().map(|id| id.value()).collect()
}
