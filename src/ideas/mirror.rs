//! Local mirror of the last known remote idea set.
//!
//! The mirror is a disposable cache used only when the backend cannot be reached. It is
//! replaced wholesale after every successful fetch and never merged incrementally with remote
//! data. Row order (`position`) preserves the order the backend returned.

use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::{params, Connection, OptionalExtension, Row};

use super::types::{Idea, IdeaDraft, IdeaId};
use crate::error::{Error, Result};

#[derive(Debug, Clone)]
pub struct LocalMirror {
    conn: Arc<Mutex<Connection>>,
}

impl LocalMirror {
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    pub fn from_shared(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// Shared handle to the underlying connection (credentials live in the same file).
    pub fn connection(&self) -> Arc<Mutex<Connection>> {
        Arc::clone(&self.conn)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| Error::MirrorPoisoned)
    }

    /// All mirrored ideas in backend order.
    pub fn all(&self) -> Result<Vec<Idea>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, titulo, tag, ideia, data, embedding FROM ideas ORDER BY position, id",
        )?;
        let rows = stmt
            .query_map([], row_to_parts)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.into_iter().map(IdeaParts::into_idea).collect()
    }

    pub fn ids(&self) -> Result<Vec<IdeaId>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT id FROM ideas ORDER BY position, id")?;
        let ids = stmt
            .query_map([], |row| row.get::<_, i64>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(ids.into_iter().map(IdeaId::from).collect())
    }

    pub fn get(&self, id: IdeaId) -> Result<Option<Idea>> {
        let conn = self.lock()?;
        let parts = conn
            .query_row(
                "SELECT id, titulo, tag, ideia, data, embedding FROM ideas WHERE id = ?1",
                params![id.value()],
                row_to_parts,
            )
            .optional()?;
        parts.map(IdeaParts::into_idea).transpose()
    }

    pub fn len(&self) -> Result<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM ideas", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Replace the whole mirror with `ideas`, in one transaction.
    pub fn replace_all(&self, ideas: &[Idea]) -> Result<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM ideas", [])?;
        for (position, idea) in ideas.iter().enumerate() {
            insert_row(&tx, idea, position as i64)?;
        }
        tx.commit()?;
        tracing::debug!(count = ideas.len(), "mirror replaced");
        Ok(())
    }

    /// Insert or overwrite one record. New records go to the top.
    pub fn upsert(&self, idea: &Idea) -> Result<()> {
        let conn = self.lock()?;
        let existing: Option<i64> = conn
            .query_row(
                "SELECT position FROM ideas WHERE id = ?1",
                params![idea.id.value()],
                |row| row.get(0),
            )
            .optional()?;
        let position = match existing {
            Some(position) => position,
            None => conn.query_row("SELECT COALESCE(MIN(position), 0) - 1 FROM ideas", [], |row| {
                row.get(0)
            })?,
        };
        insert_row(&conn, idea, position)?;
        Ok(())
    }

    /// Apply an offline edit: overwrite the text fields, bump `data`, drop the embedding.
    ///
    /// Returns the merged record, or `None` if the id is not mirrored.
    pub fn merge_edit(&self, id: IdeaId, draft: &IdeaDraft) -> Result<Option<Idea>> {
        let Some(mut idea) = self.get(id)? else {
            return Ok(None);
        };
        idea.titulo = draft.titulo.trim().to_string();
        idea.tag = draft.tag.clone();
        idea.ideia = draft.ideia.trim().to_string();
        idea.data = chrono::Utc::now().to_rfc3339();
        idea.embedding = None;
        self.upsert(&idea)?;
        Ok(Some(idea))
    }

    /// Returns `true` if a row was deleted.
    pub fn remove(&self, id: IdeaId) -> Result<bool> {
        let conn = self.lock()?;
        conn.execute("DELETE FROM embedding_debt WHERE id = ?1", params![id.value()])?;
        let removed = conn.execute("DELETE FROM ideas WHERE id = ?1", params![id.value()])?;
        Ok(removed > 0)
    }

    pub fn clear_embedding(&self, id: IdeaId) -> Result<bool> {
        let conn = self.lock()?;
        let changed = conn.execute(
            "UPDATE ideas SET embedding = NULL WHERE id = ?1",
            params![id.value()],
        )?;
        Ok(changed > 0)
    }

    pub fn set_embedding(&self, id: IdeaId, embedding: &[f32]) -> Result<bool> {
        let encoded = serde_json::to_string(embedding)?;
        let conn = self.lock()?;
        let changed = conn.execute(
            "UPDATE ideas SET embedding = ?1 WHERE id = ?2",
            params![encoded, id.value()],
        )?;
        Ok(changed > 0)
    }

    /// Note that `id` was left without a vector after an edit.
    pub fn record_missing_embedding(&self, id: IdeaId) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT OR REPLACE INTO embedding_debt (id, recorded_at) VALUES (?1, ?2)",
            params![id.value(), chrono::Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    /// Returns `true` if `id` was recorded as missing its vector.
    pub fn resolve_missing_embedding(&self, id: IdeaId) -> Result<bool> {
        let conn = self.lock()?;
        let removed = conn.execute(
            "DELETE FROM embedding_debt WHERE id = ?1",
            params![id.value()],
        )?;
        Ok(removed > 0)
    }

    /// Ideas known to have no vector, oldest first.
    pub fn missing_embeddings(&self) -> Result<Vec<IdeaId>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT id FROM embedding_debt ORDER BY recorded_at, id")?;
        let ids = stmt
            .query_map([], |row| row.get::<_, i64>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(ids.into_iter().map(IdeaId::from).collect())
    }

    /// Drop every mirrored idea and the vector bookkeeping (logout).
    pub fn clear(&self) -> Result<()> {
        let conn = self.lock()?;
        conn.execute_batch("DELETE FROM ideas; DELETE FROM embedding_debt;")?;
        Ok(())
    }
}

struct IdeaParts {
    id: i64,
    titulo: String,
    tag: Option<String>,
    ideia: String,
    data: String,
    embedding: Option<String>,
}

impl IdeaParts {
    fn into_idea(self) -> Result<Idea> {
        let embedding = self
            .embedding
            .as_deref()
            .map(serde_json::from_str::<Vec<f32>>)
            .transpose()?;
        Ok(Idea {
            id: IdeaId::from(self.id),
            titulo: self.titulo,
            tag: self.tag,
            ideia: self.ideia,
            data: self.data,
            embedding,
        })
    }
}

fn row_to_parts(row: &Row<'_>) -> rusqlite::Result<IdeaParts> {
    Ok(IdeaParts {
        id: row.get(0)?,
        titulo: row.get(1)?,
        tag: row.get(2)?,
        ideia: row.get(3)?,
        data: row.get(4)?,
        embedding: row.get(5)?,
    })
}

fn insert_row(conn: &Connection, idea: &Idea, position: i64) -> Result<()> {
    let embedding = idea
        .embedding
        .as_ref()
        .map(serde_json::to_string)
        .transpose()?;
    conn.execute(
        "INSERT OR REPLACE INTO ideas (id, position, titulo, tag, ideia, data, embedding) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            idea.id.value(),
            position,
            idea.titulo,
            idea.tag,
            idea.ideia,
            idea.data,
            embedding,
        ],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mirror() -> LocalMirror {
        LocalMirror::new(crate::db::open_memory_database().unwrap())
    }

    fn idea(id: i64, titulo: &str) -> Idea {
        Idea {
            id: IdeaId::from(id),
            titulo: titulo.into(),
            tag: None,
            ideia: format!("body of {titulo}"),
            data: "2025-01-01T00:00:00Z".into(),
            embedding: None,
        }
    }

    #[test]
    fn replace_all_drops_leftovers_and_keeps_order() {
        let m = mirror();
        m.replace_all(&[idea(1, "a"), idea(2, "b")]).unwrap();
        m.replace_all(&[idea(9, "z"), idea(3, "c")]).unwrap();

        let ids: Vec<i64> = m.ids().unwrap().into_iter().map(IdeaId::value).collect();
        assert_eq!(ids, vec![9, 3]);
    }

    #[test]
    fn upsert_puts_new_records_first() {
        let m = mirror();
        m.replace_all(&[idea(1, "a"), idea(2, "b")]).unwrap();
        m.upsert(&idea(5, "new")).unwrap();
        let ids: Vec<i64> = m.ids().unwrap().into_iter().map(IdeaId::value).collect();
        assert_eq!(ids, vec![5, 1, 2]);

        // Overwrite keeps position
        let mut edited = idea(2, "b2");
        edited.tag = Some("t".into());
        m.upsert(&edited).unwrap();
        let all = m.all().unwrap();
        assert_eq!(all[2].titulo, "b2");
        assert_eq!(all[2].tag.as_deref(), Some("t"));
    }

    #[test]
    fn merge_edit_overwrites_text_and_drops_embedding() {
        let m = mirror();
        let mut original = idea(4, "old");
        original.embedding = Some(vec![0.1, 0.2]);
        m.replace_all(&[original]).unwrap();

        let merged = m
            .merge_edit(IdeaId::Remote(4), &IdeaDraft::new("new", Some("tag"), "new body"))
            .unwrap()
            .unwrap();
        assert_eq!(merged.titulo, "new");
        assert!(merged.embedding.is_none());
        assert_eq!(m.get(IdeaId::Remote(4)).unwrap().unwrap(), merged);
    }

    #[test]
    fn merge_edit_of_unknown_id_is_none() {
        let m = mirror();
        let merged = m
            .merge_edit(IdeaId::Remote(99), &IdeaDraft::new("t", None, "b"))
            .unwrap();
        assert!(merged.is_none());
        assert!(m.is_empty().unwrap());
    }

    #[test]
    fn embedding_set_and_clear() {
        let m = mirror();
        m.upsert(&idea(1, "a")).unwrap();
        assert!(m.set_embedding(IdeaId::Remote(1), &[0.5, -0.5]).unwrap());
        assert_eq!(
            m.get(IdeaId::Remote(1)).unwrap().unwrap().embedding,
            Some(vec![0.5, -0.5])
        );
        assert!(m.clear_embedding(IdeaId::Remote(1)).unwrap());
        assert!(m.get(IdeaId::Remote(1)).unwrap().unwrap().embedding.is_none());
        assert!(!m.set_embedding(IdeaId::Remote(2), &[1.0]).unwrap());
    }

    #[test]
    fn remove_and_clear() {
        let m = mirror();
        m.replace_all(&[idea(1, "a"), idea(2, "b")]).unwrap();
        assert!(m.remove(IdeaId::Remote(1)).unwrap());
        assert!(!m.remove(IdeaId::Remote(1)).unwrap());
        assert_eq!(m.len().unwrap(), 1);
        m.clear().unwrap();
        assert!(m.is_empty().unwrap());
    }

    #[test]
    fn provisional_ids_roundtrip_through_storage() {
        let m = mirror();
        m.upsert(&idea(1_712_000_000_000, "p")).unwrap();
        assert_eq!(m.ids().unwrap(), vec![IdeaId::Provisional(1_712_000_000_000)]);
    }

    #[test]
    fn missing_embeddings_are_tracked_until_resolved() {
        let m = mirror();
        m.upsert(&idea(1, "a")).unwrap();
        m.upsert(&idea(2, "b")).unwrap();
        m.record_missing_embedding(IdeaId::Remote(1)).unwrap();
        m.record_missing_embedding(IdeaId::Remote(2)).unwrap();
        m.record_missing_embedding(IdeaId::Remote(1)).unwrap();
        assert_eq!(m.missing_embeddings().unwrap().len(), 2);

        assert!(m.resolve_missing_embedding(IdeaId::Remote(1)).unwrap());
        assert!(!m.resolve_missing_embedding(IdeaId::Remote(1)).unwrap());
        assert_eq!(m.missing_embeddings().unwrap(), vec![IdeaId::Remote(2)]);

        // Survives a wholesale replace; gone once the idea is deleted.
        m.replace_all(&[idea(2, "b")]).unwrap();
        assert_eq!(m.missing_embeddings().unwrap(), vec![IdeaId::Remote(2)]);
        m.remove(IdeaId::Remote(2)).unwrap();
        assert!(m.missing_embeddings().unwrap().is_empty());
    }
}
