//! Read-only audit of the local mirror against the remote store.
//!
//! [`diagnose`] snapshots the mirror, fetches the remote set without replacing the mirror,
//! and reports ids present on one side only plus any id in the provisional range.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::error::Result;
use crate::ideas::{IdeaId, Reconciler};

#[derive(Debug, Clone, Serialize)]
pub struct DiagnosticReport {
    pub api_base_url: String,
    /// The base URL points at `localhost`/`127.0.0.1`.
    pub local_backend: bool,
    pub authenticated: bool,
    pub mirror_count: usize,
    /// `None` when the remote fetch failed.
    pub remote_count: Option<usize>,
    pub remote_error: Option<String>,
    pub only_in_mirror: Vec<IdeaId>,
    pub only_in_remote: Vec<IdeaId>,
    /// Provisional-range ids found on either side.
    pub provisional_ids: Vec<IdeaId>,
    /// Ideas whose last edit left them without a vector. The listing endpoint never carries
    /// vectors, so this comes from the local record kept by the embedding pipeline.
    pub missing_embeddings: Vec<IdeaId>,
    /// The reconciler has served degraded results since its last full fetch.
    pub reconciler_stale: bool,
}

impl DiagnosticReport {
    /// Both sides were compared and agree, with no provisional ids anywhere.
    pub fn is_consistent(&self) -> bool {
        self.remote_error.is_none()
            && self.only_in_mirror.is_empty()
            && self.only_in_remote.is_empty()
            && self.provisional_ids.is_empty()
    }
}

/// Run the audit. Never mutates the mirror or the remote store.
///
/// A failed remote fetch is reported in [`DiagnosticReport::remote_error`]; only a mirror read
/// failure is returned as an error.
pub async fn diagnose(reconciler: &Reconciler) -> Result<DiagnosticReport> {
    let client = reconciler.client();
    let mirror_ids = reconciler.mirror().ids()?;
    let missing_embeddings = reconciler.mirror().missing_embeddings()?;

    let mut report = DiagnosticReport {
        api_base_url: client.base_url().to_string(),
        local_backend: client.is_local_backend(),
        authenticated: client.session().is_authenticated(),
        mirror_count: mirror_ids.len(),
        remote_count: None,
        remote_error: None,
        only_in_mirror: Vec::new(),
        only_in_remote: Vec::new(),
        provisional_ids: Vec::new(),
        missing_embeddings: Vec::new(),
        reconciler_stale: reconciler.is_stale(),
    };

    let remote = match reconciler.fetch_remote().await {
        Ok(ideas) => ideas,
        Err(e) => {
            tracing::warn!(error = %e, "diagnostics could not fetch remote ideas");
            report.remote_error = Some(e.to_string());
            report.provisional_ids = provisional(mirror_ids.iter().copied());
            report.missing_embeddings = missing_embeddings;
            return Ok(report);
        }
    };

    let remote_ids: Vec<IdeaId> = remote.iter().map(|idea| idea.id).collect();
    let mirror_set: BTreeSet<i64> = mirror_ids.iter().map(|id| id.value()).collect();
    let remote_set: BTreeSet<i64> = remote_ids.iter().map(|id| id.value()).collect();

    report.remote_count = Some(remote_ids.len());
    report.only_in_mirror = mirror_set
        .difference(&remote_set)
        .map(|n| IdeaId::from(*n))
        .collect();
    report.only_in_remote = remote_set
        .difference(&mirror_set)
        .map(|n| IdeaId::from(*n))
        .collect();
    report.provisional_ids = provisional(mirror_ids.into_iter().chain(remote_ids));
    report.missing_embeddings = missing_embeddings
        .into_iter()
        .filter(|id| remote_set.contains(&id.value()))
        .collect();

    if !report.is_consistent() {
        tracing::warn!(
            only_in_mirror = report.only_in_mirror.len(),
            only_in_remote = report.only_in_remote.len(),
            provisional = report.provisional_ids.len(),
            "mirror and remote store disagree"
        );
    }
    Ok(report)
}

fn provisional(ids: impl Iterator<Item = IdeaId>) -> Vec<IdeaId> {
    let unique: BTreeSet<i64> = ids.filter(|id| id.is_provisional()).map(IdeaId::value).collect();
    unique.into_iter().map(IdeaId::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provisional_dedups_and_sorts() {
        let ids = vec![
            IdeaId::from(1_800_000_000_000),
            IdeaId::from(3),
            IdeaId::from(1_700_000_000_000),
            IdeaId::from(1_800_000_000_000),
        ];
        assert_eq!(
            provisional(ids.into_iter()),
            vec![
                IdeaId::Provisional(1_700_000_000_000),
                IdeaId::Provisional(1_800_000_000_000)
            ]
        );
    }
}
