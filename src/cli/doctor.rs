//! CLI `doctor` command: compares the local mirror with the remote store and prints a report.

use anyhow::Result;

use crate::app::App;
use crate::diagnostics::diagnose;
use crate::ideas::IdeaId;

pub async fn doctor(app: &App) -> Result<()> {
    let report = diagnose(&app.reconciler).await?;

    println!("Sacola Sync Report");
    println!("==================");
    println!();
    println!("API:               {}", report.api_base_url);
    if report.local_backend {
        println!("  WARNING: local backend; data may not reach the production store.");
    }
    println!(
        "Session:           {}",
        if report.authenticated { "token present" } else { "NO TOKEN" }
    );
    println!("Mirror:            {} idea(s)", report.mirror_count);
    match (&report.remote_count, &report.remote_error) {
        (Some(count), _) => println!("Remote:            {count} idea(s)"),
        (None, Some(err)) => println!("Remote:            unavailable ({err})"),
        (None, None) => println!("Remote:            unavailable"),
    }
    if report.reconciler_stale {
        println!("Last results:      stale (served from local copy)");
    }
    println!();

    if !report.only_in_mirror.is_empty() {
        println!("Only in local copy:   {}", join_ids(&report.only_in_mirror));
    }
    if !report.only_in_remote.is_empty() {
        println!("Only in remote store: {}", join_ids(&report.only_in_remote));
    }
    if !report.provisional_ids.is_empty() {
        println!("Timestamp-like ids:   {}", join_ids(&report.provisional_ids));
        println!("  These were never confirmed by the backend and may not be stored.");
    }
    if !report.missing_embeddings.is_empty() {
        println!("Without search vector: {}", report.missing_embeddings.len());
    }

    if report.is_consistent() {
        println!("Consistency check: PASSED");
    } else {
        println!("Consistency check: FAILED");
        println!();
        println!("Recovery: run `sacola list` to replace the local copy with the remote store.");
    }
    Ok(())
}

fn join_ids(ids: &[IdeaId]) -> String {
    ids.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
}
