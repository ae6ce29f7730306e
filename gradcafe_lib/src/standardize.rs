//! Best-effort name standardization via an external collaborator.
//!
//! The collaborator accepts a JSON array of records and returns the same
//! array with `llm_generated_university` and `llm_generated_program` filled
//! in. Any failure leaves the batch unaugmented; the pass never fails a run.
//!
//! Long passes checkpoint through an append-only progress log, one external
//! id per line, replayed on startup. A record is skipped when its id is in
//! the log or when it already carries both augmented fields.

use std::collections::{HashMap, HashSet};
use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::record::CandidateRecord;

const DEFAULT_BATCH_SIZE: usize = 20;

#[derive(thiserror::Error, Debug)]
pub enum StandardizeError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Replayable append-only log of already-standardized external ids.
pub struct ProgressLog {
    path: PathBuf,
    seen: HashSet<i64>,
}

impl ProgressLog {
    /// Opens the log, replaying any existing entries to find the resume
    /// point. A missing file means a fresh pass.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StandardizeError> {
        let path = path.as_ref().to_path_buf();
        let mut seen = HashSet::new();
        match std::fs::File::open(&path) {
            Ok(file) => {
                for line in BufReader::new(file).lines() {
                    let line = line?;
                    if let Ok(id) = line.trim().parse() {
                        seen.insert(id);
                    }
                }
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => return Err(err.into()),
        }
        Ok(Self { path, seen })
    }

    pub fn contains(&self, external_id: i64) -> bool {
        self.seen.contains(&external_id)
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    /// Appends a completed batch. Ids are durable once this returns.
    pub fn record_batch(&mut self, ids: &[i64]) -> Result<(), StandardizeError> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let mut buf = String::new();
        for id in ids {
            if self.seen.insert(*id) {
                buf.push_str(&id.to_string());
                buf.push('\n');
            }
        }
        file.write_all(buf.as_bytes())?;
        Ok(())
    }
}

/// Client for the standardization endpoint.
pub struct StandardizeClient {
    api_url: String,
    http: reqwest::Client,
    batch_size: usize,
}

impl StandardizeClient {
    pub fn new(api_url: impl Into<String>) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;
        Ok(Self {
            api_url: api_url.into(),
            http,
            batch_size: DEFAULT_BATCH_SIZE,
        })
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Sends one batch and returns the augmented records, or `None` on any
    /// failure (the caller keeps the originals).
    async fn standardize_batch(&self, batch: &[CandidateRecord]) -> Option<Vec<CandidateRecord>> {
        let resp = match self.http.post(&self.api_url).json(batch).send().await {
            Ok(resp) => resp,
            Err(err) => {
                tracing::warn!("standardize request failed: {}", err);
                return None;
            }
        };
        if !resp.status().is_success() {
            tracing::warn!("standardize endpoint returned {}", resp.status());
            return None;
        }
        let augmented: Vec<CandidateRecord> = match resp.json().await {
            Ok(records) => records,
            Err(err) => {
                tracing::warn!("standardize response unreadable: {}", err);
                return None;
            }
        };
        if augmented.len() != batch.len() {
            tracing::warn!(
                "standardize returned {} records for a batch of {}",
                augmented.len(),
                batch.len()
            );
            return None;
        }
        Some(augmented)
    }

    /// Standardizes records in place, batch by batch, checkpointing each
    /// completed batch into the progress log. Already-processed records
    /// (per log or per carried fields) pass through untouched.
    pub async fn standardize_all(
        &self,
        records: &mut [CandidateRecord],
        progress: &mut ProgressLog,
    ) -> Result<StandardizeStats, StandardizeError> {
        let mut stats = StandardizeStats::default();

        let pending: Vec<usize> = records
            .iter()
            .enumerate()
            .filter(|(_, r)| !progress.contains(r.external_id) && !r.is_standardized())
            .map(|(i, _)| i)
            .collect();
        stats.skipped = records.len() - pending.len();

        for chunk in pending.chunks(self.batch_size) {
            let batch: Vec<CandidateRecord> = chunk.iter().map(|&i| records[i].clone()).collect();
            match self.standardize_batch(&batch).await {
                Some(augmented) => {
                    // Match on id rather than position; the endpoint is not
                    // required to preserve batch order.
                    let mut by_id: HashMap<i64, CandidateRecord> = augmented
                        .into_iter()
                        .map(|r| (r.external_id, r))
                        .collect();
                    let mut done = Vec::with_capacity(chunk.len());
                    for &i in chunk {
                        if let Some(record) = by_id.remove(&records[i].external_id) {
                            records[i] = record;
                            done.push(records[i].external_id);
                        }
                    }
                    progress.record_batch(&done)?;
                    stats.augmented += done.len();
                    stats.failed += chunk.len() - done.len();
                }
                None => {
                    // Unaugmented pass-through; not checkpointed, so a rerun
                    // will pick these up again.
                    stats.failed += chunk.len();
                }
            }
            tracing::info!(
                "standardize progress: {} augmented, {} failed, {} skipped",
                stats.augmented,
                stats.failed,
                stats.skipped
            );
        }
        Ok(stats)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StandardizeStats {
    pub augmented: usize,
    /// Records left untouched because their batch failed.
    pub failed: usize,
    /// Records already processed in an earlier pass.
    pub skipped: usize,
}
