//! The `scrape` subcommand: stream pipeline output into an NDJSON file.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use gradcafe_lib::{NdjsonWriter, Pipeline};

use super::{cancel_on_ctrl_c, PipelineArgs};

#[derive(Args)]
pub struct ScrapeArgs {
    #[command(flatten)]
    pub pipeline: PipelineArgs,

    /// Output NDJSON file
    #[arg(long, default_value = "applicant_data.ndjson")]
    pub out: PathBuf,
}

pub async fn run(args: &ScrapeArgs, base_url: Option<&str>) -> Result<()> {
    let config = args.pipeline.to_config(base_url);
    let mut pipeline = Pipeline::new(config)?.with_cancel_token(cancel_on_ctrl_c());

    let mut writer = NdjsonWriter::create(&args.out)?;
    while let Some(record) = pipeline.next_record().await? {
        writer.write(&record)?;
    }
    let skipped = pipeline.skipped_invalid();
    let written = writer.finish()?;

    eprintln!(
        "Wrote {} records to {} ({} skipped without id)",
        written,
        args.out.display(),
        skipped
    );
    Ok(())
}
