pub mod load;
pub mod scrape;
pub mod standardize;
pub mod sync;

use std::time::Duration;

use gradcafe_lib::{CancelToken, PipelineConfig};

/// Common scrape knobs shared by the `scrape` and `sync` subcommands.
#[derive(clap::Args)]
pub struct PipelineArgs {
    /// Maximum number of records to produce
    #[arg(long, default_value = "20")]
    pub limit: usize,

    /// Listing page to start from
    #[arg(long, default_value = "1")]
    pub start_page: u32,

    /// Minimum delay between requests in milliseconds
    #[arg(long, default_value = "100")]
    pub delay_ms: u64,

    /// Consecutive empty pages tolerated before stopping
    #[arg(long, default_value = "1")]
    pub max_empty_pages: u32,

    /// Skip per-record detail fetches (faster, truncated comments)
    #[arg(long)]
    pub no_details: bool,
}

impl PipelineArgs {
    pub fn to_config(&self, base_url: Option<&str>) -> PipelineConfig {
        let mut config = PipelineConfig {
            start_page: self.start_page,
            limit: self.limit,
            max_empty_pages: self.max_empty_pages,
            enrich: !self.no_details,
            min_delay: Duration::from_millis(self.delay_ms),
            ..PipelineConfig::default()
        };
        if let Some(base) = base_url {
            config.base_url = base.trim_end_matches('/').to_string();
        }
        config
    }
}

/// Cancels the token on Ctrl-C so a run stops cleanly between pages.
pub fn cancel_on_ctrl_c() -> CancelToken {
    let cancel = CancelToken::new();
    let handle = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("Interrupt received, finishing current page...");
            handle.cancel();
        }
    });
    cancel
}
