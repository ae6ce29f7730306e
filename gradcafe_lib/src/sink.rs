//! Record sinks.
//!
//! The pipeline never deduplicates against prior runs itself; it hands every
//! record to a sink keyed by `external_id` and lets the sink's conflict
//! handling decide. Re-running over already-seen pages is therefore safe by
//! construction.

use std::collections::HashMap;
use std::path::Path;

use rusqlite::{params, Connection};

use crate::record::CandidateRecord;

#[derive(thiserror::Error, Debug)]
pub enum SinkError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// What the sink did with a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOutcome {
    Inserted,
    Duplicate,
}

/// Store-or-skip destination for pipeline output, keyed by `external_id`.
pub trait RecordSink {
    fn store(&mut self, record: &CandidateRecord) -> Result<StoreOutcome, SinkError>;
}

/// SQLite-backed sink. The `applicants` table's primary key is the external
/// id, and inserts use `ON CONFLICT DO NOTHING` so duplicates are reported,
/// not errors.
pub struct SqliteSink {
    conn: Connection,
}

impl SqliteSink {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SinkError> {
        let conn = Connection::open(path)?;
        Self::configure(&conn)?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self, SinkError> {
        let conn = Connection::open_in_memory()?;
        Self::configure(&conn)?;
        Ok(Self { conn })
    }

    fn configure(conn: &Connection) -> Result<(), SinkError> {
        conn.execute_batch(
            "PRAGMA foreign_keys = ON;
             PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;",
        )?;
        Ok(())
    }

    pub fn init(&self) -> Result<(), SinkError> {
        let version: i32 = self
            .conn
            .pragma_query_value(None, "user_version", |row| row.get(0))?;

        if version < 1 {
            self.conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS applicants (
                    p_id INTEGER PRIMARY KEY,
                    program TEXT,
                    university TEXT,
                    comments TEXT,
                    date_added TEXT,
                    url TEXT,
                    status TEXT,
                    term TEXT,
                    us_or_international TEXT,
                    gpa REAL,
                    gre REAL,
                    gre_v REAL,
                    gre_aw REAL,
                    degree TEXT,
                    llm_generated_program TEXT,
                    llm_generated_university TEXT
                );
                CREATE INDEX IF NOT EXISTS idx_applicants_university
                    ON applicants(university);
                CREATE INDEX IF NOT EXISTS idx_applicants_term
                    ON applicants(term);",
            )?;
            self.conn.pragma_update(None, "user_version", 1)?;
        }

        Ok(())
    }

    pub fn count(&self) -> Result<i64, SinkError> {
        let count =
            self.conn
                .query_row("SELECT COUNT(*) FROM applicants", [], |row| row.get(0))?;
        Ok(count)
    }
}

impl RecordSink for SqliteSink {
    fn store(&mut self, record: &CandidateRecord) -> Result<StoreOutcome, SinkError> {
        let changed = self.conn.execute(
            "INSERT INTO applicants (
                p_id, program, university, comments, date_added, url, status,
                term, us_or_international, gpa, gre, gre_v, gre_aw, degree,
                llm_generated_program, llm_generated_university
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)
             ON CONFLICT(p_id) DO NOTHING",
            params![
                record.external_id,
                record.program_name,
                record.university,
                record.comments,
                record.date_posted.map(|d| d.to_string()),
                record.permalink,
                record.applicant_status,
                record.start_term,
                record.citizenship,
                record.gpa,
                record.gre_total,
                record.gre_verbal,
                record.gre_analytical_writing,
                record.degree,
                record.llm_generated_program,
                record.llm_generated_university,
            ],
        )?;
        Ok(if changed == 0 {
            StoreOutcome::Duplicate
        } else {
            StoreOutcome::Inserted
        })
    }
}

/// In-memory sink for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: HashMap<i64, CandidateRecord>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> impl Iterator<Item = &CandidateRecord> {
        self.records.values()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl RecordSink for MemorySink {
    fn store(&mut self, record: &CandidateRecord) -> Result<StoreOutcome, SinkError> {
        if self.records.contains_key(&record.external_id) {
            return Ok(StoreOutcome::Duplicate);
        }
        self.records.insert(record.external_id, record.clone());
        Ok(StoreOutcome::Inserted)
    }
}
