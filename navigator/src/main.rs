use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use navigator::{Config, GraphManager, ThemeLoader};

#[derive(Parser)]
#[command(name = "navigator")]
#[command(about = "Interview-progress graph for biographical life-story interviews")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Load the theme catalog and print the domain summary
    Themes {
        /// Catalog file (defaults to NAVIGATOR_THEMES_PATH)
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Restore a session checkpoint and print the graph summary
    Status {
        /// Session id to restore
        #[arg(long)]
        session: String,
        /// Checkpoint base directory (defaults to NAVIGATOR_CHECKPOINT_DIR)
        #[arg(long)]
        dir: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "navigator=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();

    match args.command {
        Command::Themes { file } => {
            let path = file.unwrap_or_else(|| config.catalog.path.clone());
            let mut loader = ThemeLoader::new(path);
            loader.load()?;

            println!("{} themes across domains:", loader.theme_count());
            for (domain, summary) in loader.domains_summary() {
                println!("  {domain}: {}", summary.count);
            }
            println!();
            for theme in loader.all_themes().values() {
                println!(
                    "  [{}] {} {} (priority {}, {} seed questions)",
                    theme.status, theme.theme_id, theme.title, theme.priority,
                    theme.seed_questions.len()
                );
            }
        }
        Command::Status { session, dir } => {
            let mut manager = GraphManager::from_config(&config)?;
            if !manager.load_checkpoint(&session, dir.as_deref()) {
                anyhow::bail!("no checkpoint found for session '{session}'");
            }

            let summary = manager.graph_state();
            println!("Session {session}:");
            println!("  overall coverage: {:.1}%", summary.coverage.overall * 100.0);
            for (domain, coverage) in &summary.coverage.by_domain {
                println!("    {domain}: {:.1}%", coverage * 100.0);
            }
            println!(
                "  themes: {} pending / {} mentioned / {} exhausted, {} events",
                summary.pending_themes,
                summary.mentioned_themes,
                summary.exhausted_themes,
                summary.event_count
            );
            match manager.get_next_candidate_theme(None) {
                Some(theme) => println!("  next candidate: {} ({})", theme.theme_id, theme.title),
                None => println!("  next candidate: none (interview complete)"),
            }
        }
    }

    Ok(())
}
