//! Scrape-and-normalize pipeline for GradCafe admission self-reports.
//!
//! Data flows one direction: fetch → listing parse → detail enrich →
//! normalize → identifier extraction → sink. The pipeline is synchronous in
//! spirit (one request in flight at a time, rate limited) and per-record
//! failures never abort a run.

pub mod detail;
pub mod export;
pub mod fetch;
pub mod listing;
pub mod normalize;
pub mod pipeline;
pub mod record;
pub mod sink;
pub mod standardize;

pub use export::{read_ndjson_file, write_ndjson_file, ExportError, NdjsonWriter};
pub use fetch::{FetchClient, FetchError};
pub use normalize::Normalizer;
pub use pipeline::{CancelToken, Pipeline, PipelineConfig, PipelineError, RunStats};
pub use record::{extract_result_id, CandidateRecord, RawEntry};
pub use sink::{MemorySink, RecordSink, SinkError, SqliteSink, StoreOutcome};
pub use standardize::{ProgressLog, StandardizeClient, StandardizeError, StandardizeStats};
