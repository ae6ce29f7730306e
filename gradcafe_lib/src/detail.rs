//! Detail page enrichment.
//!
//! Listing pages truncate the free-text note field; the full text lives on
//! the per-submission result page inside a definition list. Enrichment is
//! best-effort: any failure leaves the truncated listing comment in place.

use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};

use crate::fetch::FetchClient;
use crate::normalize::collapse_whitespace;

static DT_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("dt").expect("hardcoded selector is valid"));

const NOTE_LABELS: [&str; 4] = ["notes", "note", "comments", "comment"];

/// Extracts the full note text from a result detail page, if present.
pub fn extract_notes(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    for dt in document.select(&DT_SEL) {
        let label = collapse_whitespace(&dt.text().collect::<Vec<_>>().join(" ")).to_lowercase();
        if !NOTE_LABELS.contains(&label.as_str()) {
            continue;
        }
        let dd = dt
            .next_siblings()
            .filter_map(ElementRef::wrap)
            .find(|el| el.value().name() == "dd");
        if let Some(dd) = dd {
            let text = collapse_whitespace(&dd.text().collect::<Vec<_>>().join(" "));
            if !text.is_empty() {
                return Some(text);
            }
        }
    }
    None
}

/// Fetches a permalink and pulls the full note text out of it. Returns
/// `None` on any fetch or extraction failure so the caller keeps the
/// truncated comment it already has.
pub async fn enrich_comment(client: &FetchClient, permalink: &str) -> Option<String> {
    match client.fetch_page(permalink).await {
        Ok(html) => extract_notes(&html),
        Err(err) => {
            tracing::debug!("detail fetch failed for {}: {}", permalink, err);
            None
        }
    }
}
