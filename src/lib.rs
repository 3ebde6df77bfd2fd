//! Local-first synchronization layer for a personal bag of ideas.
//!
//! Short "idea" notes live in a remote store reached over authenticated JSON HTTP. This crate
//! sits between a UI and that store: it writes through to the backend, keeps a disposable
//! local mirror for when the backend is briefly unreachable, keeps similarity-search vectors
//! consistent with idea text, and runs a debounced single-flight suggestion query.
//!
//! | Operation | Backend down | Missing id in response |
//! |-----------|--------------|------------------------|
//! | `create` | error | [`Error::PersistenceUnconfirmed`] |
//! | `update` | merged into mirror, `stale` | n/a |
//! | `remove` | removed from mirror, `stale` | n/a |
//! | `list_all` | mirror contents, `stale` | n/a |
//!
//! # Modules
//!
//! - [`client`]: Authenticated JSON request client and response classification
//! - [`ideas`]: Idea types, the local mirror, the reconciler, and similarity search
//! - [`embedding`]: Embedding providers and the create/edit embedding pipeline
//! - [`suggest`]: Debounced, cancellable AI suggestion query
//! - [`diagnostics`]: Read-only mirror vs. remote audit
//! - [`checkout`]: Subscription checkout with retry
//! - [`config`]: Configuration loading from TOML files and environment variables
//! - [`db`]: SQLite file backing the mirror and the stored session token

pub mod app;
pub mod checkout;
pub mod cli;
pub mod client;
pub mod config;
pub mod db;
pub mod diagnostics;
pub mod embedding;
pub mod error;
pub mod ideas;
pub mod session;
pub mod suggest;

pub use error::{Error, Result};
