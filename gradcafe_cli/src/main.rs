mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "gradcafe")]
#[command(about = "Scrape, clean, and load GradCafe admission self-reports")]
struct Cli {
    /// Base URL of the target site (overrides GRADCAFE_BASE_URL)
    #[arg(long, global = true)]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape listing pages into an NDJSON file
    Scrape(commands::scrape::ScrapeArgs),
    /// Scrape straight into the SQLite store
    Sync(commands::sync::SyncArgs),
    /// Load an NDJSON batch file into the SQLite store
    Load(commands::load::LoadArgs),
    /// Augment an NDJSON file with standardized names (resumable)
    Standardize(commands::standardize::StandardizeArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("gradcafe_lib=info".parse().unwrap()),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let base_url = cli
        .base_url
        .clone()
        .or_else(|| std::env::var("GRADCAFE_BASE_URL").ok());

    match &cli.command {
        Commands::Scrape(args) => commands::scrape::run(args, base_url.as_deref()).await,
        Commands::Sync(args) => commands::sync::run(args, base_url.as_deref()).await,
        Commands::Load(args) => commands::load::run(args),
        Commands::Standardize(args) => commands::standardize::run(args).await,
    }
}
