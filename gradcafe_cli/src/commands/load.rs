//! The `load` subcommand: NDJSON batch file into the SQLite store.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use gradcafe_lib::{read_ndjson_file, RecordSink, SqliteSink, StoreOutcome};

#[derive(Args)]
pub struct LoadArgs {
    /// Input NDJSON file
    #[arg(long, default_value = "applicant_data.ndjson")]
    pub input: PathBuf,

    /// SQLite database path
    #[arg(long, default_value = "gradcafe.db")]
    pub db: PathBuf,
}

pub fn run(args: &LoadArgs) -> Result<()> {
    let records = read_ndjson_file(&args.input)?;
    let mut sink = SqliteSink::open(&args.db)?;
    sink.init()?;

    let mut inserted = 0u64;
    let mut duplicates = 0u64;
    for record in &records {
        match sink.store(record)? {
            StoreOutcome::Inserted => inserted += 1,
            StoreOutcome::Duplicate => duplicates += 1,
        }
    }

    eprintln!(
        "Loaded {}: {} inserted, {} duplicate",
        args.input.display(),
        inserted,
        duplicates
    );
    Ok(())
}
