//! Pipeline driver: pagination, enrichment, normalization, and delivery.
//!
//! Records are surfaced one at a time so a caller can stream them into a
//! sink without buffering a whole run. A run is not restartable mid-stream;
//! starting over means a fresh page-1 request.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::detail::enrich_comment;
use crate::fetch::{FetchClient, FetchError, DEFAULT_MIN_DELAY};
use crate::listing::parse_listing;
use crate::normalize::Normalizer;
use crate::record::{extract_result_id, CandidateRecord, RawEntry};
use crate::sink::{RecordSink, SinkError, StoreOutcome};

#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    /// The very first listing page could not be fetched; nothing useful can
    /// be produced, so the whole run fails.
    #[error("first listing page unavailable: {0}")]
    FirstPageUnavailable(#[source] FetchError),
    #[error(transparent)]
    Sink(#[from] SinkError),
}

/// External stop signal, checked between page iterations. Cancelling is a
/// clean early stop: records already yielded stay valid.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Knobs for one pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Scheme + host, without a trailing slash. Listing pages live under
    /// `/survey/?page=N`.
    pub base_url: String,
    pub start_page: u32,
    /// Stop after this many valid records have been yielded.
    pub limit: usize,
    /// Consecutive pages with zero parseable groups tolerated before the
    /// run is declared finished. 1 means a single empty page ends the run.
    pub max_empty_pages: u32,
    /// Fetch each record's detail page for the full comment text.
    pub enrich: bool,
    /// Politeness floor between outbound requests.
    pub min_delay: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.thegradcafe.com".to_string(),
            start_page: 1,
            limit: 100,
            max_empty_pages: 1,
            enrich: true,
            min_delay: DEFAULT_MIN_DELAY,
        }
    }
}

/// Totals reported at the end of a sink-driven run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    pub inserted: u64,
    pub duplicates: u64,
    /// Records dropped because no identifier could be extracted from their
    /// permalink. Tracked so a run can report them, never silently lost.
    pub skipped_invalid: u64,
}

/// Streaming scrape run over successive listing pages.
pub struct Pipeline {
    client: FetchClient,
    normalizer: Normalizer,
    config: PipelineConfig,
    cancel: CancelToken,
    buffer: VecDeque<RawEntry>,
    page: u32,
    yielded: usize,
    skipped_invalid: u64,
    empty_streak: u32,
    started: bool,
    done: bool,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Result<Self, FetchError> {
        let client = FetchClient::with_min_delay(config.min_delay)?;
        Ok(Self {
            client,
            normalizer: Normalizer::new(),
            page: config.start_page,
            config,
            cancel: CancelToken::new(),
            buffer: VecDeque::new(),
            yielded: 0,
            skipped_invalid: 0,
            empty_streak: 0,
            started: false,
            done: false,
        })
    }

    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_normalizer(mut self, normalizer: Normalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    /// Records dropped so far for lack of an extractable identifier.
    pub fn skipped_invalid(&self) -> u64 {
        self.skipped_invalid
    }

    /// Yields the next valid record, or `None` when the run is over
    /// (limit reached, end of data, cancelled, or a later page failed).
    pub async fn next_record(&mut self) -> Result<Option<CandidateRecord>, PipelineError> {
        loop {
            if self.done || self.yielded >= self.config.limit {
                self.done = true;
                return Ok(None);
            }

            let Some(entry) = self.buffer.pop_front() else {
                if !self.fill_buffer().await? {
                    return Ok(None);
                }
                continue;
            };

            // Identifier first: a record we cannot key is skipped before we
            // spend a detail fetch on it.
            let Some(permalink) = entry.permalink.clone() else {
                self.skipped_invalid += 1;
                tracing::warn!("skipping record without permalink");
                continue;
            };
            let Some(external_id) = extract_result_id(&permalink) else {
                self.skipped_invalid += 1;
                tracing::warn!("skipping record with unrecognized permalink {}", permalink);
                continue;
            };

            let mut entry = entry;
            if self.config.enrich {
                if let Some(full_comment) = enrich_comment(&self.client, &permalink).await {
                    entry.comments = Some(full_comment);
                }
            }

            let record = self.normalizer.normalize(external_id, permalink, &entry);
            self.yielded += 1;
            return Ok(Some(record));
        }
    }

    /// Drives the whole stream into a sink and reports the 3-way totals.
    pub async fn run_into_sink<S: RecordSink>(
        &mut self,
        sink: &mut S,
    ) -> Result<RunStats, PipelineError> {
        let mut stats = RunStats::default();
        while let Some(record) = self.next_record().await? {
            match sink.store(&record)? {
                StoreOutcome::Inserted => stats.inserted += 1,
                StoreOutcome::Duplicate => stats.duplicates += 1,
            }
        }
        stats.skipped_invalid = self.skipped_invalid;
        Ok(stats)
    }

    /// Fetches listing pages until the buffer holds entries or the run is
    /// over. Returns whether the buffer was refilled.
    async fn fill_buffer(&mut self) -> Result<bool, PipelineError> {
        loop {
            if self.cancel.is_cancelled() {
                tracing::info!("cancellation requested, stopping after page {}", self.page);
                self.done = true;
                return Ok(false);
            }
            if self.empty_streak >= self.config.max_empty_pages {
                tracing::info!(
                    "{} consecutive empty pages, treating as end of data",
                    self.empty_streak
                );
                self.done = true;
                return Ok(false);
            }

            let url = format!("{}/survey/?page={}", self.config.base_url, self.page);
            let first_page = !self.started;
            let html = match self.client.fetch_page(&url).await {
                Ok(html) => html,
                Err(err) if first_page => {
                    self.done = true;
                    return Err(PipelineError::FirstPageUnavailable(err));
                }
                Err(err) => {
                    // Partial success: everything yielded so far stands.
                    tracing::warn!("listing page {} unavailable, ending run early: {}", self.page, err);
                    self.done = true;
                    return Ok(false);
                }
            };
            self.started = true;

            let entries = parse_listing(&html, &url);
            tracing::info!("listing page {}: {} entries", self.page, entries.len());
            self.page += 1;

            if entries.is_empty() {
                self.empty_streak += 1;
                continue;
            }
            self.empty_streak = 0;
            self.buffer.extend(entries);
            return Ok(true);
        }
    }
}
