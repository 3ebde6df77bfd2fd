//! Error taxonomy shared by the request client, the reconciler and everything built on them.

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// No response reached the client (DNS, refused connection, reset, transport timeout).
    #[error("backend unreachable: {0}")]
    Unreachable(String),

    /// A response arrived but was not the JSON we expected.
    #[error("malformed response (HTTP {status}): {detail}")]
    MalformedResponse { status: u16, detail: String },

    /// The backend answered with a non-2xx JSON body.
    #[error("backend rejected request (HTTP {status}): {detail}")]
    RemoteRejected { status: u16, detail: String },

    /// A create call succeeded without returning the id of the stored record.
    #[error("backend did not confirm persistence: no id in create response")]
    PersistenceUnconfirmed,

    #[error("not authenticated")]
    Unauthenticated,

    #[error("invalid idea: {0}")]
    InvalidIdea(String),

    #[error("local mirror error: {0}")]
    Mirror(#[from] rusqlite::Error),

    #[error("encoding error: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("local mirror lock poisoned")]
    MirrorPoisoned,
}

impl Error {
    /// `true` when nothing trustworthy came back from the backend. These are the failures
    /// that `update` and `list_all` absorb by falling back to the local mirror.
    pub fn is_network_failure(&self) -> bool {
        matches!(self, Self::Unreachable(_) | Self::MalformedResponse { .. })
    }

    /// HTTP 402 is how the backend signals an expired trial with no active subscription.
    pub fn is_trial_expired(&self) -> bool {
        matches!(self, Self::RemoteRejected { status: 402, .. })
    }

    /// HTTP status carried by the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::MalformedResponse { status, .. } | Self::RemoteRejected { status, .. } => {
                Some(*status)
            }
            Self::Unauthenticated => Some(401),
            _ => None,
        }
    }

    /// Reclassify a 401 rejection as [`Error::Unauthenticated`].
    ///
    /// The request client only classifies transport outcomes; callers decide what a 401 means.
    pub fn authenticated(self) -> Self {
        match self {
            Self::RemoteRejected { status: 401, .. } => Self::Unauthenticated,
            other => other,
        }
    }
}
