//! Newline-delimited JSON serialization of candidate records.
//!
//! One record per line, UTF-8, stable serde field names. This is the batch
//! handoff format for the sink-loading collaborator when it is not consuming
//! the stream directly.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use crate::record::CandidateRecord;

#[derive(thiserror::Error, Debug)]
pub enum ExportError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Writes records as NDJSON to a writer.
pub fn write_ndjson<'a, W, I>(writer: W, records: I) -> Result<usize, ExportError>
where
    W: Write,
    I: IntoIterator<Item = &'a CandidateRecord>,
{
    let mut writer = BufWriter::new(writer);
    let mut written = 0;
    for record in records {
        serde_json::to_writer(&mut writer, record)?;
        writer.write_all(b"\n")?;
        written += 1;
    }
    writer.flush()?;
    Ok(written)
}

/// Writes records as NDJSON to a file path.
pub fn write_ndjson_file<'a, I>(path: impl AsRef<Path>, records: I) -> Result<usize, ExportError>
where
    I: IntoIterator<Item = &'a CandidateRecord>,
{
    write_ndjson(File::create(path)?, records)
}

/// Incremental NDJSON writer for callers that stream records as they are
/// produced instead of buffering a whole run.
pub struct NdjsonWriter<W: Write> {
    writer: BufWriter<W>,
    written: usize,
}

impl NdjsonWriter<File> {
    pub fn create(path: impl AsRef<Path>) -> Result<Self, ExportError> {
        Ok(Self::new(File::create(path)?))
    }
}

impl<W: Write> NdjsonWriter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: BufWriter::new(writer),
            written: 0,
        }
    }

    pub fn write(&mut self, record: &CandidateRecord) -> Result<(), ExportError> {
        serde_json::to_writer(&mut self.writer, record)?;
        self.writer.write_all(b"\n")?;
        self.written += 1;
        Ok(())
    }

    pub fn written(&self) -> usize {
        self.written
    }

    pub fn finish(mut self) -> Result<usize, ExportError> {
        self.writer.flush()?;
        Ok(self.written)
    }
}

/// Reads NDJSON records from a file. Malformed lines are skipped with a
/// warning rather than aborting the load.
pub fn read_ndjson_file(path: impl AsRef<Path>) -> Result<Vec<CandidateRecord>, ExportError> {
    let reader = BufReader::new(File::open(path)?);
    let mut records = Vec::new();
    for (lineno, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str(&line) {
            Ok(record) => records.push(record),
            Err(err) => {
                tracing::warn!("skipping malformed record on line {}: {}", lineno + 1, err);
            }
        }
    }
    Ok(records)
}
