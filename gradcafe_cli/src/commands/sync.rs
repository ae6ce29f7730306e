//! The `sync` subcommand: scrape directly into the SQLite store.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use gradcafe_lib::{Pipeline, SqliteSink};

use super::{cancel_on_ctrl_c, PipelineArgs};

#[derive(Args)]
pub struct SyncArgs {
    #[command(flatten)]
    pub pipeline: PipelineArgs,

    /// SQLite database path
    #[arg(long, default_value = "gradcafe.db")]
    pub db: PathBuf,
}

pub async fn run(args: &SyncArgs, base_url: Option<&str>) -> Result<()> {
    let mut sink = SqliteSink::open(&args.db)?;
    sink.init()?;

    eprintln!("Starting sync into {}", args.db.display());

    let config = args.pipeline.to_config(base_url);
    let mut pipeline = Pipeline::new(config)?.with_cancel_token(cancel_on_ctrl_c());
    let stats = pipeline.run_into_sink(&mut sink).await?;

    eprintln!(
        "Sync complete: {} inserted, {} duplicate, {} skipped (no id)",
        stats.inserted, stats.duplicates, stats.skipped_invalid
    );
    Ok(())
}
