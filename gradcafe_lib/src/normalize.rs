//! Field cleaning and standardization.
//!
//! Everything in here is pure: markup stripping, whitespace collapse,
//! sentinel-missing mapping, numeric/date extraction from labelled strings,
//! and the comment length cap. The pipeline applies these after detail
//! enrichment and before identifier extraction.

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use scraper::Html;

use crate::record::{CandidateRecord, RawEntry};

/// Maximum comment length, in characters, applied after cleaning.
pub const COMMENT_MAX_CHARS: usize = 500;

static DECIMAL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+\.?\d*)").expect("hardcoded regex pattern is valid"));

/// Badge tokens that leak into the listing details row alongside the
/// truncated comment. Struck out before the residue is kept as a comment.
static BADGE_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)(Fall|Spring|Summer|Winter)\s+\d{4}",
        r"(?i)International",
        r"(?i)American",
        r"(?i)Domestic",
        r"(?i)GPA\s+[\d\.]+",
        r"(?i)GRE\s+(?:General\s+)?\d+",
        r"(?i)GRE\s+V\s*\d+",
        r"(?i)AW\s+[\d\.]+",
        r"(?i)Accepted on \d+\s+\w+",
        r"(?i)Rejected on \d+\s+\w+",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("hardcoded regex pattern is valid"))
    .collect()
});

/// Cleans raw entries into [`CandidateRecord`]s.
///
/// Holds the configurable placeholder string that the source site uses for
/// never-populated fields; it maps to the same sentinel (`None`) as empty
/// and whitespace-only values.
#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    placeholder: Option<String>,
}

impl Normalizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Treat `placeholder` (compared after cleaning) as missing.
    pub fn with_placeholder(placeholder: impl Into<String>) -> Self {
        Self {
            placeholder: Some(placeholder.into()),
        }
    }

    /// Cleans one text field: de-tag, collapse whitespace, strip control
    /// characters, and map empty/placeholder values to the sentinel.
    pub fn clean_field(&self, value: Option<&str>) -> Option<String> {
        let cleaned = strip_html(value?);
        if cleaned.is_empty() {
            return None;
        }
        if let Some(placeholder) = &self.placeholder {
            if cleaned.eq_ignore_ascii_case(placeholder) {
                return None;
            }
        }
        Some(cleaned)
    }

    /// Builds the cleaned record for an entry whose identifier has already
    /// been extracted. Score fields go through decimal extraction, the date
    /// through long-form parsing, and the comment gets the length cap.
    pub fn normalize(&self, external_id: i64, permalink: String, entry: &RawEntry) -> CandidateRecord {
        CandidateRecord {
            external_id,
            permalink,
            university: self.clean_field(entry.university.as_deref()),
            program_name: self.clean_field(entry.program_name.as_deref()),
            degree: self.clean_field(entry.degree.as_deref()),
            applicant_status: self.clean_field(entry.applicant_status.as_deref()),
            start_term: self.clean_field(entry.start_term.as_deref()),
            citizenship: self.clean_field(entry.citizenship.as_deref()),
            date_posted: self
                .clean_field(entry.date_posted.as_deref())
                .as_deref()
                .and_then(parse_long_date),
            gpa: self
                .clean_field(entry.gpa.as_deref())
                .as_deref()
                .and_then(parse_decimal),
            gre_total: self
                .clean_field(entry.gre_total.as_deref())
                .as_deref()
                .and_then(parse_decimal),
            gre_verbal: self
                .clean_field(entry.gre_verbal.as_deref())
                .as_deref()
                .and_then(parse_decimal),
            gre_analytical_writing: self
                .clean_field(entry.gre_analytical_writing.as_deref())
                .as_deref()
                .and_then(parse_decimal),
            comments: self
                .clean_field(entry.comments.as_deref())
                .map(|c| truncate_chars(&c, COMMENT_MAX_CHARS)),
            llm_generated_university: None,
            llm_generated_program: None,
        }
    }
}

/// Removes markup tags, decodes entities, strips control characters, and
/// collapses whitespace runs to single spaces.
pub fn strip_html(value: &str) -> String {
    let fragment = Html::parse_fragment(value);
    let text: String = fragment.root_element().text().collect::<Vec<_>>().join(" ");
    collapse_whitespace(&text)
}

pub(crate) fn collapse_whitespace(value: &str) -> String {
    let without_controls: String = value.chars().filter(|c| !c.is_control()).collect();
    without_controls.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Extracts the first decimal number from a string that may mix a label with
/// digits (`"GPA 3.89"`, `"GRE 327"`) or be a bare number (`"3.5"`).
pub fn parse_decimal(value: &str) -> Option<f64> {
    DECIMAL_RE
        .captures(value)?
        .get(1)
        .and_then(|m| m.as_str().parse().ok())
}

/// Parses a long-form date like `"January 31, 2026"`. Anything else is
/// treated as missing.
pub fn parse_long_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, "%B %d, %Y").ok()
}

/// Strips badge tokens out of the listing details row and keeps the residue
/// as a comment, provided enough of it survives to be meaningful.
pub fn clean_comment_text(text: &str) -> Option<String> {
    let mut cleaned = strip_html(text);
    for re in BADGE_RES.iter() {
        cleaned = re.replace_all(&cleaned, "").into_owned();
    }
    let cleaned = collapse_whitespace(&cleaned);
    if cleaned.chars().count() > 15 && !cleaned.chars().all(|c| ".,;:!? ".contains(c)) {
        Some(truncate_chars(&cleaned, COMMENT_MAX_CHARS))
    } else {
        None
    }
}

/// Truncates to at most `max` characters without splitting a multi-byte
/// character.
fn truncate_chars(value: &str, max: usize) -> String {
    match value.char_indices().nth(max) {
        Some((idx, _)) => value[..idx].to_string(),
        None => value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry_with(field: fn(&mut RawEntry)) -> RawEntry {
        let mut entry = RawEntry::default();
        field(&mut entry);
        entry
    }

    #[test]
    fn strips_tags_and_collapses_whitespace() {
        assert_eq!(strip_html("<p>Great   funding</p>"), "Great funding");
        assert_eq!(strip_html("a &amp; b"), "a & b");
        assert_eq!(strip_html("  \t spaced \n out  "), "spaced out");
    }

    #[test]
    fn strips_control_characters() {
        assert_eq!(strip_html("bad\u{0}null\u{1}byte"), "badnullbyte");
    }

    #[test]
    fn empty_and_placeholder_map_to_sentinel() {
        let norm = Normalizer::with_placeholder("N/A");
        assert_eq!(norm.clean_field(Some("")), None);
        assert_eq!(norm.clean_field(Some("   ")), None);
        assert_eq!(norm.clean_field(Some("n/a")), None);
        assert_eq!(norm.clean_field(None), None);
        assert_eq!(norm.clean_field(Some("value")), Some("value".to_string()));
    }

    #[test]
    fn parses_labelled_and_bare_decimals() {
        assert_eq!(parse_decimal("GPA 3.89"), Some(3.89));
        assert_eq!(parse_decimal("3.5"), Some(3.5));
        assert_eq!(parse_decimal("GRE 327"), Some(327.0));
        assert_eq!(parse_decimal("GRE V 157"), Some(157.0));
        assert_eq!(parse_decimal("no numbers here"), None);
        assert_eq!(parse_decimal(""), None);
    }

    #[test]
    fn parses_long_dates() {
        assert_eq!(
            parse_long_date("January 31, 2026"),
            NaiveDate::from_ymd_opt(2026, 1, 31)
        );
        assert_eq!(parse_long_date("31 Jan 2026"), None);
        assert_eq!(parse_long_date("not a date"), None);
    }

    #[test]
    fn gpa_field_normalizes_to_number_or_sentinel() {
        let norm = Normalizer::new();
        let with_gpa = entry_with(|e| e.gpa = Some("GPA 3.89".into()));
        let record = norm.normalize(1, "https://h/survey/result/1".into(), &with_gpa);
        assert_eq!(record.gpa, Some(3.89));

        let empty_gpa = entry_with(|e| e.gpa = Some("".into()));
        let record = norm.normalize(1, "https://h/survey/result/1".into(), &empty_gpa);
        assert_eq!(record.gpa, None);
    }

    #[test]
    fn comment_is_capped_after_cleaning() {
        let norm = Normalizer::new();
        let entry = entry_with(|e| e.comments = Some(format!("<p>{}</p>", "é".repeat(800))));
        let record = norm.normalize(1, "u".into(), &entry);
        let comment = record.comments.unwrap();
        assert_eq!(comment.chars().count(), COMMENT_MAX_CHARS);
        assert!(comment.chars().all(|c| c == 'é'));
    }

    #[test]
    fn badge_tokens_are_removed_from_comments() {
        let text = "Fall 2026 International GPA 3.70 GRE 324 Really hoping for funding news soon";
        assert_eq!(
            clean_comment_text(text).as_deref(),
            Some("Really hoping for funding news soon")
        );
        assert_eq!(clean_comment_text("Fall 2026 International"), None);
        assert_eq!(clean_comment_text(".,;: !?"), None);
    }

    #[test]
    fn normalization_is_idempotent() {
        let norm = Normalizer::new();
        let entry = RawEntry {
            permalink: Some("https://h/survey/result/9".into()),
            university: Some("  Stanford   University ".into()),
            program_name: Some("<span>Computer Science</span>".into()),
            degree: Some("PhD".into()),
            applicant_status: Some("Accepted".into()),
            date_posted: Some("January 31, 2026".into()),
            start_term: Some("Fall 2026".into()),
            citizenship: Some("International".into()),
            gpa: Some("GPA 3.89".into()),
            gre_total: Some("GRE 327".into()),
            gre_verbal: Some("GRE V 161".into()),
            gre_analytical_writing: Some("AW 4.5".into()),
            comments: Some("<p>Great   funding</p>".into()),
        };
        let once = norm.normalize(9, entry.permalink.clone().unwrap(), &entry);

        // Round-trip the cleaned output back through the raw representation.
        let rewrapped = RawEntry {
            permalink: Some(once.permalink.clone()),
            university: once.university.clone(),
            program_name: once.program_name.clone(),
            degree: once.degree.clone(),
            applicant_status: once.applicant_status.clone(),
            date_posted: once.date_posted.map(|d| d.format("%B %d, %Y").to_string()),
            start_term: once.start_term.clone(),
            citizenship: once.citizenship.clone(),
            gpa: once.gpa.map(|v| v.to_string()),
            gre_total: once.gre_total.map(|v| v.to_string()),
            gre_verbal: once.gre_verbal.map(|v| v.to_string()),
            gre_analytical_writing: once.gre_analytical_writing.map(|v| v.to_string()),
            comments: once.comments.clone(),
        };
        let twice = norm.normalize(9, once.permalink.clone(), &rewrapped);
        assert_eq!(once, twice);
    }
}
