//! Idea record and identifier types.
//!
//! [`IdeaId`] separates backend-assigned ids from provisional timestamp ids at the type level,
//! so call sites match on the variant instead of comparing against a magic number.
//! [`IdeaDraft`] is the user-editable part of an idea, validated before any write.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Ids above this value are millisecond timestamps minted before the backend confirmed
/// persistence.
pub const PROVISIONAL_ID_THRESHOLD: i64 = 1_000_000_000_000;

/// Identifier of an idea.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "i64", into = "i64")]
pub enum IdeaId {
    /// Assigned by the remote store.
    Remote(i64),
    /// Timestamp placeholder; not yet durably stored.
    Provisional(i64),
}

impl IdeaId {
    /// Mint a provisional id from the current wall-clock time.
    pub fn provisional_now() -> Self {
        Self::Provisional(chrono::Utc::now().timestamp_millis())
    }

    pub fn value(self) -> i64 {
        match self {
            Self::Remote(n) | Self::Provisional(n) => n,
        }
    }

    pub fn is_provisional(self) -> bool {
        matches!(self, Self::Provisional(_))
    }
}

impl From<i64> for IdeaId {
    fn from(n: i64) -> Self {
        if n > PROVISIONAL_ID_THRESHOLD {
            Self::Provisional(n)
        } else {
            Self::Remote(n)
        }
    }
}

impl From<IdeaId> for i64 {
    fn from(id: IdeaId) -> Self {
        id.value()
    }
}

impl std::fmt::Display for IdeaId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.value())
    }
}

impl std::str::FromStr for IdeaId {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        s.trim()
            .parse::<i64>()
            .map(Self::from)
            .map_err(|_| format!("invalid idea id: {s}"))
    }
}

/// An idea as stored remotely and mirrored locally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Idea {
    pub id: IdeaId,
    /// Short display title.
    pub titulo: String,
    /// Optional free-text label.
    #[serde(default)]
    pub tag: Option<String>,
    /// Body text.
    pub ideia: String,
    /// ISO 8601 timestamp. Ordering only, never identity.
    #[serde(default)]
    pub data: String,
    /// Similarity-search vector. `None` means "not computed", never a zero vector.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

/// User-supplied fields for a create or an edit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IdeaDraft {
    pub titulo: String,
    pub tag: Option<String>,
    pub ideia: String,
    /// Vector computed ahead of time; routes a create through `/ideias/com-embedding`.
    pub embedding: Option<Vec<f32>>,
}

impl IdeaDraft {
    /// Build a draft, trimming every field. An empty tag becomes `None`.
    pub fn new(titulo: &str, tag: Option<&str>, ideia: &str) -> Self {
        Self {
            titulo: titulo.trim().to_string(),
            tag: tag
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string),
            ideia: ideia.trim().to_string(),
            embedding: None,
        }
    }

    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }

    /// Title and body are required.
    pub fn validate(&self) -> Result<()> {
        if self.titulo.trim().is_empty() {
            return Err(Error::InvalidIdea("titulo must not be empty".into()));
        }
        if self.ideia.trim().is_empty() {
            return Err(Error::InvalidIdea("ideia must not be empty".into()));
        }
        Ok(())
    }

    /// JSON body for create and update calls.
    pub fn payload(&self) -> serde_json::Value {
        serde_json::json!({
            "titulo": self.titulo.trim(),
            "tag": self.tag.as_deref().map(str::trim).filter(|t| !t.is_empty()),
            "ideia": self.ideia.trim(),
        })
    }

    /// Text fed to the embedding model: title, tag and body joined by spaces.
    pub fn embedding_text(&self) -> String {
        [
            self.titulo.trim(),
            self.tag.as_deref().unwrap_or("").trim(),
            self.ideia.trim(),
        ]
        .iter()
        .filter(|part| !part.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(" ")
    }

    /// Start an edit from an existing record.
    pub fn from_idea(idea: &Idea) -> Self {
        Self::new(&idea.titulo, idea.tag.as_deref(), &idea.ideia)
    }
}
