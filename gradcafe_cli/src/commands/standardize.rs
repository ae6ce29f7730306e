//! The `standardize` subcommand: augment records with canonical names.
//!
//! Best-effort and resumable: batches that fail pass through unaugmented,
//! and completed batches are checkpointed to a progress log so an
//! interrupted pass can pick up where it left off.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use gradcafe_lib::{read_ndjson_file, write_ndjson_file, ProgressLog, StandardizeClient};

#[derive(Args)]
pub struct StandardizeArgs {
    /// Input NDJSON file
    #[arg(long, default_value = "applicant_data.ndjson")]
    pub input: PathBuf,

    /// Output NDJSON file
    #[arg(long, default_value = "applicant_data_clean.ndjson")]
    pub out: PathBuf,

    /// Standardization endpoint
    #[arg(long, default_value = "http://localhost:8000/standardize")]
    pub api: String,

    /// Progress log for checkpoint/resume
    #[arg(long, default_value = "standardize_progress.log")]
    pub progress_log: PathBuf,

    /// Records per request to the endpoint
    #[arg(long, default_value = "20")]
    pub batch_size: usize,
}

pub async fn run(args: &StandardizeArgs) -> Result<()> {
    let mut records = read_ndjson_file(&args.input)?;
    let mut progress = ProgressLog::open(&args.progress_log)?;
    if !progress.is_empty() {
        eprintln!(
            "Resuming: {} records already standardized per {}",
            progress.len(),
            args.progress_log.display()
        );
    }

    let client = StandardizeClient::new(&args.api)?.with_batch_size(args.batch_size);
    let stats = client.standardize_all(&mut records, &mut progress).await?;

    write_ndjson_file(&args.out, &records)?;
    eprintln!(
        "Standardize complete: {} augmented, {} failed, {} already done; wrote {}",
        stats.augmented,
        stats.failed,
        stats.skipped,
        args.out.display()
    );
    Ok(())
}
