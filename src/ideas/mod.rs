//! Idea records, the local mirror, and the reconciler that keeps them honest.

pub mod mirror;
pub mod search;
pub mod sync;
pub mod types;

pub use mirror::LocalMirror;
pub use sync::{Reconciler, Synced};
pub use types::{Idea, IdeaDraft, IdeaId, PROVISIONAL_ID_THRESHOLD};
