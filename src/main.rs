use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use sacola::app::App;
use sacola::checkout;
use sacola::cli;
use sacola::config::SacolaConfig;
use sacola::ideas::IdeaId;

#[derive(Parser)]
#[command(
    name = "sacola",
    version,
    about = "Capture ideas, synced to your backend with a local fallback"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Store a bearer token and start a session
    Login {
        #[arg(long)]
        token: String,
    },
    /// Forget the token and the local copy of ideas
    Logout,
    /// List all ideas (falls back to the local copy when offline)
    List,
    /// Save a new idea
    Add {
        #[arg(long)]
        titulo: String,
        #[arg(long)]
        ideia: String,
        #[arg(long)]
        tag: Option<String>,
    },
    /// Edit an idea and refresh its search vector
    Edit {
        id: IdeaId,
        #[arg(long)]
        titulo: Option<String>,
        #[arg(long)]
        tag: Option<String>,
        #[arg(long)]
        ideia: Option<String>,
    },
    /// Delete an idea
    Rm { id: IdeaId },
    /// Search ideas by meaning
    Search {
        term: String,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Get AI suggestions for a half-remembered idea
    Suggest {
        text: String,
        /// Save suggestion number N as a new idea
        #[arg(long)]
        save: Option<usize>,
    },
    /// Compare the local copy with the remote store
    Doctor,
    /// Start a subscription checkout
    Subscribe,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = SacolaConfig::load()?;

    // Log to stderr so stdout stays clean for command output.
    let filter = EnvFilter::try_new(&config.log.level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let app = App::open(config)?;

    let result = match cli.command {
        Command::Login { token } => cli::account::login(&app, &token),
        Command::Logout => cli::account::logout(&app),
        Command::List => cli::ideas::list(&app).await,
        Command::Add { titulo, ideia, tag } => {
            cli::ideas::add(&app, &titulo, tag.as_deref(), &ideia).await
        }
        Command::Edit {
            id,
            titulo,
            tag,
            ideia,
        } => {
            cli::ideas::edit(&app, id, titulo.as_deref(), tag.as_deref(), ideia.as_deref()).await
        }
        Command::Rm { id } => cli::ideas::remove(&app, id).await,
        Command::Search { term, limit } => cli::ideas::search(&app, &term, limit).await,
        Command::Suggest { text, save } => cli::suggest::suggest(&app, &text, save).await,
        Command::Doctor => cli::doctor::doctor(&app).await,
        Command::Subscribe => cli::account::subscribe(&app).await,
    };

    if let Err(e) = &result {
        if let Some(err) = e.downcast_ref::<sacola::Error>() {
            if err.is_trial_expired() {
                let notice = trial_notice(&app, err).await;
                eprintln!("{notice} Run `sacola subscribe` to continue.");
            }
        }
    }
    result
}

async fn trial_notice(app: &App, err: &sacola::Error) -> String {
    // Without a `detail` body the client reports the reason phrase, which says nothing here.
    let detail = match err {
        sacola::Error::RemoteRejected { detail, .. } if detail != "Payment Required" => {
            Some(detail.as_str())
        }
        _ => None,
    };
    let expired_at = match detail.map(str::trim) {
        Some(d) if !d.is_empty() => None,
        _ => checkout::trial_expiry(app.reconciler.client()).await,
    };
    checkout::trial_expired_notice(detail, expired_at.as_deref())
}
