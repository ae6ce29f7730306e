//! Rate-limited HTTP fetching with bounded retries.
//!
//! One `FetchClient` is constructed per pipeline run and owns the single
//! long-lived `reqwest::Client` used for every listing and detail request.
//! A minimum inter-request delay is enforced before every outbound request,
//! retries included; this is a politeness floor against the target host,
//! not something callers may bypass.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use rand::Rng;
use reqwest::StatusCode;

const USER_AGENT: &str = "GradCafeScraper/1.0 (+https://example.com/)";

/// Default floor between consecutive outbound requests.
pub const DEFAULT_MIN_DELAY: Duration = Duration::from_millis(100);

/// Terminal fetch failures. Retryable conditions are handled internally;
/// by the time one of these surfaces the retry budget is spent.
#[derive(thiserror::Error, Debug)]
pub enum FetchError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected status {status}")]
    HttpStatus { status: StatusCode },
}

struct RetryConfig {
    max_retries: usize,
    base_delay_ms: u64,
    max_delay_ms: u64,
}

impl RetryConfig {
    fn from_env() -> Self {
        Self {
            max_retries: env_usize("GRADCAFE_RETRY_MAX", 3),
            base_delay_ms: env_u64("GRADCAFE_RETRY_BASE_MS", 500),
            max_delay_ms: env_u64("GRADCAFE_RETRY_MAX_MS", 10_000),
        }
    }

    fn delay_for_attempt(&self, attempt: usize) -> Duration {
        let shift = (attempt.saturating_sub(1)).min(30) as u32;
        let exp = 1u64 << shift;
        let base = self
            .base_delay_ms
            .saturating_mul(exp)
            .min(self.max_delay_ms);
        let jitter = rand::thread_rng().gen_range(0.8..1.2);
        Duration::from_millis((base as f64 * jitter) as u64)
    }
}

/// HTTP client that serializes requests behind a politeness delay.
pub struct FetchClient {
    http: reqwest::Client,
    min_delay: Duration,
    /// Tracks when the last request was sent, for rate limiting.
    last_request: Mutex<Option<Instant>>,
}

impl FetchClient {
    /// Builds the client with the default 100 ms inter-request floor and a
    /// 30-second per-request timeout.
    pub fn new() -> Result<Self, FetchError> {
        Self::with_min_delay(DEFAULT_MIN_DELAY)
    }

    /// Builds the client with a custom inter-request floor.
    pub fn with_min_delay(min_delay: Duration) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            http,
            min_delay,
            last_request: Mutex::new(None),
        })
    }

    /// Fetches a page, retrying transient failures up to the configured
    /// budget. Each individual attempt has its own timeout; a timed-out
    /// attempt counts against the retry budget.
    pub async fn fetch_page(&self, url: &str) -> Result<String, FetchError> {
        let cfg = RetryConfig::from_env();
        let mut attempt = 0usize;
        loop {
            self.rate_limit().await;
            match self.fetch_once(url).await {
                Ok(body) => return Ok(body),
                Err(err) => {
                    attempt += 1;
                    if attempt > cfg.max_retries || !is_retryable(&err) {
                        return Err(err);
                    }
                    let delay = cfg.delay_for_attempt(attempt);
                    tracing::warn!(
                        "fetch of {} failed (attempt {}/{}), retrying in {:.1}s: {}",
                        url,
                        attempt,
                        cfg.max_retries,
                        delay.as_secs_f64(),
                        err
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    async fn fetch_once(&self, url: &str) -> Result<String, FetchError> {
        let resp = self
            .http
            .get(url)
            .header("accept", "text/html,application/xhtml+xml")
            .header("accept-language", "en-US,en;q=0.9")
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus { status });
        }

        Ok(resp.text().await?)
    }

    async fn rate_limit(&self) {
        let sleep_dur = {
            let last = self.last_request.lock().unwrap_or_else(|e| e.into_inner());
            match *last {
                Some(last_time) => {
                    let elapsed = last_time.elapsed();
                    (elapsed < self.min_delay).then(|| self.min_delay - elapsed)
                }
                None => None,
            }
        };
        if let Some(dur) = sleep_dur {
            tokio::time::sleep(dur).await;
        }
        *self.last_request.lock().unwrap_or_else(|e| e.into_inner()) = Some(Instant::now());
    }
}

/// Connection resets, timeouts, and server-side errors are worth another
/// attempt; client errors (4xx) are terminal.
fn is_retryable(err: &FetchError) -> bool {
    match err {
        FetchError::Http(e) => e.is_timeout() || e.is_connect(),
        FetchError::HttpStatus { status } => status.is_server_error(),
    }
}

fn env_usize(key: &str, default: usize) -> usize {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
