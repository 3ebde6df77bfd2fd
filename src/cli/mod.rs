pub mod account;
pub mod doctor;
pub mod ideas;
pub mod suggest;

use crate::ideas::Idea;

/// One-line rendering of an idea for list output.
fn format_idea(idea: &Idea) -> String {
    let preview = if idea.ideia.chars().count() > 80 {
        let cut: String = idea.ideia.chars().take(80).collect();
        format!("{cut}...")
    } else {
        idea.ideia.clone()
    };
    let tag = idea
        .tag
        .as_deref()
        .map(|t| format!(" [{t}]"))
        .unwrap_or_default();
    let marker = if idea.id.is_provisional() { " (unconfirmed id)" } else { "" };
    format!("{:>6}  {}{}{}\n        {}", idea.id, idea.titulo, tag, marker, preview)
}

fn stale_banner(stale: bool) {
    if stale {
        println!("(backend unreachable: showing local copy, may be out of date)\n");
    }
}
