//! pharmabot CLI — the main entry point.
//!
//! Commands:
//! - `onboard`    — Write a default config file
//! - `chat`       — Interactive chat or single-message mode
//! - `search`     — Rank the live inventory against a query
//! - `inventory`  — Fetch the inventory and show a sample
//! - `doctor`     — Diagnose config, credentials, inventory and provider

use clap::{Parser, Subcommand};
use pharmabot_core::Language;

mod commands;
mod ui;

#[derive(Parser)]
#[command(
    name = "pharmabot",
    about = "pharmabot — pharmacy product-search assistant",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the default configuration file
    Onboard,

    /// Chat with the pharmacy assistant
    Chat {
        /// Send a single message instead of entering interactive mode
        #[arg(short, long)]
        message: Option<String>,

        /// Response language (en, ar)
        #[arg(short, long)]
        language: Option<Language>,
    },

    /// Rank the inventory against a query and show scores
    Search {
        /// Free-text query, e.g. "fever" or "vitamin c"
        query: String,

        /// Print matches as JSON
        #[arg(long)]
        json: bool,
    },

    /// Fetch the inventory and print a sample
    Inventory {
        /// Number of products to show
        #[arg(short, long, default_value_t = 5)]
        limit: usize,
    },

    /// Diagnose system health
    Doctor,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Logs go to stderr so streamed replies on stdout stay clean
    let filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Onboard => commands::onboard::run().await?,
        Commands::Chat { message, language } => commands::chat::run(message, language).await?,
        Commands::Search { query, json } => commands::search::run(query, json).await?,
        Commands::Inventory { limit } => commands::inventory::run(limit).await?,
        Commands::Doctor => commands::doctor::run().await?,
    }

    Ok(())
}
