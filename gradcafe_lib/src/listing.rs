//! Listing page parser.
//!
//! The source renders each submission as exactly two consecutive table rows:
//! row A carries university, program + degree spans, the posted date, the
//! decision, and the actions cell with the permalink; row B is a single
//! `colspan` cell of badge chips (term, citizenship, scores) plus the
//! truncated comment. That positional two-row assumption is fragile, so it
//! is confined to this module: the rest of the pipeline only ever sees
//! [`RawEntry`] groups.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::normalize::{clean_comment_text, collapse_whitespace};
use crate::record::RawEntry;

static TABLE_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("table").expect("hardcoded selector is valid"));
static ROW_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("tr").expect("hardcoded selector is valid"));
static CELL_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("td").expect("hardcoded selector is valid"));
static SPAN_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("span").expect("hardcoded selector is valid"));
static ANCHOR_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("hardcoded selector is valid"));

static STATUS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(Accepted|Rejected|Interview|Wait\s?listed)")
        .expect("hardcoded regex pattern is valid")
});
static TERM_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(Fall|Spring|Summer|Winter)\s+\d{4}").expect("hardcoded regex pattern is valid")
});
static GPA_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)GPA\s+[\d\.]+").expect("hardcoded regex pattern is valid"));
static GRE_TOTAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)GRE\s+(?:General\s+)?\d+").expect("hardcoded regex pattern is valid")
});
static GRE_VERBAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)GRE\s+V\s*\d+").expect("hardcoded regex pattern is valid")
});
static GRE_AW_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:GRE\s+)?AW\s+[\d\.]+").expect("hardcoded regex pattern is valid")
});

/// Parses one listing page into raw entry groups, in listing order.
///
/// Rows without any `<td>` (header rows) are skipped; a trailing unpaired
/// data row is dropped rather than emitted as a partial group; missing cells
/// degrade to `None` fields, never an error.
pub fn parse_listing(html: &str, page_url: &str) -> Vec<RawEntry> {
    let document = Html::parse_document(html);
    let Some(table) = document.select(&TABLE_SEL).next() else {
        return Vec::new();
    };

    let data_rows: Vec<ElementRef> = table
        .select(&ROW_SEL)
        .filter(|row| row.select(&CELL_SEL).next().is_some())
        .collect();

    data_rows
        .chunks_exact(2)
        .map(|pair| parse_pair(pair[0], pair[1], page_url))
        .collect()
}

fn parse_pair(row_a: ElementRef, row_b: ElementRef, page_url: &str) -> RawEntry {
    let cells: Vec<ElementRef> = row_a.select(&CELL_SEL).collect();

    let university = cells.first().map(element_text).filter(|s| !s.is_empty());

    let (program_name, degree) = match cells.get(1) {
        Some(program_cell) => {
            let spans: Vec<String> = program_cell.select(&SPAN_SEL).map(|s| element_text(&s)).collect();
            (
                spans.first().cloned().filter(|s| !s.is_empty()),
                spans.get(1).cloned().filter(|s| !s.is_empty()),
            )
        }
        None => (None, None),
    };

    let date_posted = cells.get(2).map(element_text).filter(|s| !s.is_empty());

    let applicant_status = cells.get(3).and_then(|cell| {
        let decision = element_text(cell);
        STATUS_RE
            .captures(&decision)
            .and_then(|cap| cap.get(1))
            .map(|m| m.as_str().to_string())
    });

    let permalink = permalink_in(row_a, page_url).or_else(|| permalink_in(row_b, page_url));

    let details = element_text(&row_b);
    let find = |re: &Regex| re.find(&details).map(|m| m.as_str().to_string());

    let citizenship = if details.contains("International") {
        Some("International".to_string())
    } else if details.contains("American") || details.contains("Domestic") {
        Some("American".to_string())
    } else {
        None
    };

    RawEntry {
        permalink,
        university,
        program_name,
        degree,
        applicant_status,
        date_posted,
        start_term: find(&TERM_RE),
        citizenship,
        gpa: find(&GPA_RE),
        gre_total: find(&GRE_TOTAL_RE),
        gre_verbal: find(&GRE_VERBAL_RE),
        gre_analytical_writing: find(&GRE_AW_RE),
        comments: clean_comment_text(&details),
    }
}

/// First anchor in the row that points at a result permalink, resolved
/// against the page URL when relative.
fn permalink_in(row: ElementRef, page_url: &str) -> Option<String> {
    row.select(&ANCHOR_SEL)
        .filter_map(|a| a.value().attr("href"))
        .find(|href| href.contains("/result/"))
        .map(|href| resolve_href(href, page_url))
}

fn resolve_href(href: &str, page_url: &str) -> String {
    if href.starts_with("http") {
        return href.to_string();
    }
    match Url::parse(page_url).and_then(|base| base.join(href)) {
        Ok(resolved) => resolved.to_string(),
        Err(_) => href.to_string(),
    }
}

fn element_text(el: &ElementRef) -> String {
    collapse_whitespace(&el.text().collect::<Vec<_>>().join(" "))
}
