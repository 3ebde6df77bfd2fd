//! CLI idea commands: `list`, `add`, `edit`, `rm`, `search`.

use anyhow::Result;

use super::{format_idea, stale_banner};
use crate::app::App;
use crate::embedding::EmbeddingStatus;
use crate::ideas::search::search_similar;
use crate::ideas::{IdeaDraft, IdeaId};

pub async fn list(app: &App) -> Result<()> {
    let listing = app.reconciler.list_all().await?;
    stale_banner(listing.stale);

    if listing.value.is_empty() {
        println!("No ideas yet.");
        return Ok(());
    }
    println!("{} idea(s)\n", listing.value.len());
    for idea in &listing.value {
        println!("{}", format_idea(idea));
    }
    Ok(())
}

pub async fn add(app: &App, titulo: &str, tag: Option<&str>, ideia: &str) -> Result<()> {
    let draft = IdeaDraft::new(titulo, tag, ideia);
    let idea = app.pipeline.attach_on_create(&draft).await?;
    println!("Saved idea {}", idea.id);
    if idea.id.is_provisional() {
        println!("WARNING: the backend answered with a timestamp-like id; it may not be stored.");
    }
    Ok(())
}

pub async fn edit(
    app: &App,
    id: IdeaId,
    titulo: Option<&str>,
    tag: Option<&str>,
    ideia: Option<&str>,
) -> Result<()> {
    let current = app.reconciler.get(id).await?;
    let mut draft = IdeaDraft::from_idea(&current.value);
    if let Some(titulo) = titulo {
        draft.titulo = titulo.trim().to_string();
    }
    if let Some(tag) = tag {
        draft.tag = Some(tag.trim().to_string()).filter(|t| !t.is_empty());
    }
    if let Some(ideia) = ideia {
        draft.ideia = ideia.trim().to_string();
    }

    let outcome = app.pipeline.refresh_on_edit(id, &draft).await?;
    stale_banner(outcome.stale);
    println!("Updated idea {}", outcome.idea.id);
    match outcome.embedding {
        EmbeddingStatus::Refreshed => println!("Search vector refreshed."),
        EmbeddingStatus::Cleared => {
            println!("Search vector cleared; the idea is not searchable until it is recomputed.")
        }
    }
    Ok(())
}

pub async fn remove(app: &App, id: IdeaId) -> Result<()> {
    let removed = app.reconciler.remove(id).await?;
    if removed.stale {
        println!("Removed idea {id} locally; the backend did not confirm the deletion.");
    } else {
        println!("Deleted idea {id}");
    }
    Ok(())
}

pub async fn search(app: &App, term: &str, limit: Option<usize>) -> Result<()> {
    let hits = search_similar(app.reconciler.client(), term, limit).await?;
    if hits.is_empty() {
        println!("No results found.");
        return Ok(());
    }

    println!("Found {} result(s)\n", hits.len());
    for (i, hit) in hits.iter().enumerate() {
        let score = if hit.is_textual() {
            "text match".to_string()
        } else {
            format!("similarity: {:.3}", hit.similarity)
        };
        println!("  {}. {} {} ({score})", i + 1, hit.id, hit.titulo);
        println!("     {}", hit.ideia);
        println!();
    }
    Ok(())
}
