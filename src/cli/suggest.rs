//! CLI `suggest` command: asks for AI suggestions, optionally saving one as a new idea.

use anyhow::{bail, Result};

use crate::app::App;
use crate::suggest::{split_suggestion, Phase};

pub async fn suggest(app: &App, text: &str, save: Option<usize>) -> Result<()> {
    let stream = app.suggestions.submit_text(text);
    let Some(state) = stream.last().await else {
        bail!("suggestion request was superseded");
    };

    match state.phase {
        Phase::Idle => {
            println!("Nothing to look up.");
            return Ok(());
        }
        Phase::Failed => bail!(
            "could not fetch suggestions: {}",
            state.error.unwrap_or_default()
        ),
        _ => {}
    }

    if state.results.is_empty() {
        println!("No suggestions. Try describing the idea in more detail.");
        return Ok(());
    }

    for (i, suggestion) in state.results.iter().enumerate() {
        println!("  {}. {}", i + 1, suggestion);
    }

    if let Some(n) = save {
        let Some(picked) = n.checked_sub(1).and_then(|i| state.results.get(i)) else {
            bail!("no suggestion number {n}");
        };
        let draft = split_suggestion(picked);
        let idea = app.pipeline.attach_on_create(&draft).await?;
        println!("\nSaved suggestion {n} as idea {}", idea.id);
    }
    Ok(())
}
