//! Record types flowing through the scrape pipeline.

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};

static RESULT_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/result/(\d+)").expect("hardcoded regex pattern is valid"));

/// One logical submission as scraped from a listing page, before cleaning.
///
/// Every field except `permalink` is raw text straight out of the markup:
/// score fields still carry their label tokens (e.g. `"GPA 3.89"`), the
/// comment is the truncated listing-page residue, and nothing has been
/// de-tagged yet. Pairing of the two table rows that make up one entry
/// happens in the listing parser; this struct is its output.
#[derive(Debug, Clone, Default)]
pub struct RawEntry {
    pub permalink: Option<String>,
    pub university: Option<String>,
    pub program_name: Option<String>,
    pub degree: Option<String>,
    pub applicant_status: Option<String>,
    pub date_posted: Option<String>,
    pub start_term: Option<String>,
    pub citizenship: Option<String>,
    pub gpa: Option<String>,
    pub gre_total: Option<String>,
    pub gre_verbal: Option<String>,
    pub gre_analytical_writing: Option<String>,
    pub comments: Option<String>,
}

/// A cleaned submission ready for the sink.
///
/// `None` is the single sentinel for "no value": empty strings, whitespace,
/// and placeholder text from the source all collapse to it during
/// normalization. `external_id` is derived from the permalink and is the
/// dedup key downstream; a record that cannot produce one never leaves the
/// pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateRecord {
    pub external_id: i64,
    pub permalink: String,
    pub university: Option<String>,
    pub program_name: Option<String>,
    pub degree: Option<String>,
    pub applicant_status: Option<String>,
    pub start_term: Option<String>,
    pub citizenship: Option<String>,
    pub date_posted: Option<NaiveDate>,
    pub gpa: Option<f64>,
    pub gre_total: Option<f64>,
    pub gre_verbal: Option<f64>,
    pub gre_analytical_writing: Option<f64>,
    pub comments: Option<String>,
    #[serde(default)]
    pub llm_generated_university: Option<String>,
    #[serde(default)]
    pub llm_generated_program: Option<String>,
}

impl CandidateRecord {
    /// True once the standardization collaborator has filled in both
    /// canonical-name fields. Used to detect already-processed records when
    /// resuming a standardization pass.
    pub fn is_standardized(&self) -> bool {
        self.llm_generated_university.is_some() && self.llm_generated_program.is_some()
    }
}

/// Extracts the numeric submission id from a result permalink.
///
/// Permalinks look like `https://host/survey/result/123456`; anything that
/// does not contain a `/result/<digits>` segment yields `None` and the
/// record is unusable downstream.
pub fn extract_result_id(url: &str) -> Option<i64> {
    RESULT_ID_RE
        .captures(url)?
        .get(1)
        .and_then(|m| m.as_str().parse().ok())
}
