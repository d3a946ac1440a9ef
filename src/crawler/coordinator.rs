//! Crawler coordinator - main crawl orchestration logic
//!
//! The coordinator owns the browser session and the storage handle for the
//! whole run. It moves through launch, navigation, form readiness and the
//! hierarchy walk, then always runs cleanup: the browser is closed, the run
//! record is finished and storage is closed, each with its own error handling.

use crate::browser::{wait_for_selector, BrowserLauncher, PageDriver, FORM_READY};
use crate::config::Config;
use crate::crawler::report::CrawlReport;
use crate::crawler::walker::{HierarchyWalker, WalkSettings};
use crate::retry::retry_with_backoff;
use crate::robots;
use crate::storage::{RunOutcome, RunStatus, Storage};
use crate::Result;
use std::time::Instant;

/// Runs one crawl from browser launch to cleanup
pub struct Coordinator<L: BrowserLauncher, S: Storage> {
    config: Config,
    config_hash: String,
    launcher: L,
    storage: S,
}

impl<L, S> Coordinator<L, S>
where
    L: BrowserLauncher,
    S: Storage,
{
    /// Creates a new coordinator instance
    ///
    /// # Arguments
    ///
    /// * `config` - The crawler configuration
    /// * `config_hash` - Hash of the configuration file, stored with the run
    /// * `launcher` - Produces the browser session
    /// * `storage` - Storage handle, closed when the run ends
    pub fn new(config: Config, config_hash: impl Into<String>, launcher: L, storage: S) -> Self {
        Self {
            config,
            config_hash: config_hash.into(),
            launcher,
            storage,
        }
    }

    /// Runs the crawl
    ///
    /// Node-level failures are contained by the walker and reported in the
    /// returned [`CrawlReport`]. An `Err` means the run as a whole failed;
    /// cleanup has run in both cases.
    pub async fn run(self) -> Result<CrawlReport> {
        let Self {
            config,
            config_hash,
            launcher,
            mut storage,
        } = self;

        tracing::info!("Starting crawl of {}", config.crawler.base_url);
        let start_time = Instant::now();

        let run_id = match storage.create_run(&config_hash) {
            Ok(id) => {
                tracing::debug!("Recording as crawl run {}", id);
                Some(id)
            }
            Err(e) => {
                tracing::warn!("Could not record crawl run: {}", e);
                None
            }
        };

        let mut page = None;
        let result = Self::execute(&config, &launcher, &mut storage, &mut page).await;

        // Cleanup
        if let Some(mut page) = page {
            match page.close().await {
                Ok(()) => tracing::debug!("Browser closed"),
                Err(e) => tracing::error!("Failed to close browser: {}", e),
            }
        }

        if let Some(run_id) = run_id {
            let (status, outcome) = match &result {
                Ok(report) => (
                    RunStatus::Completed,
                    RunOutcome {
                        prices_recorded: report.prices_recorded as u64,
                        node_failures: report.failures.len() as u64,
                    },
                ),
                Err(_) => (RunStatus::Failed, RunOutcome::default()),
            };
            if let Err(e) = storage.finish_run(run_id, status, &outcome) {
                tracing::warn!("Could not finish crawl run {}: {}", run_id, e);
            }
        }

        match storage.close() {
            Ok(()) => tracing::debug!("Storage closed"),
            Err(e) => tracing::error!("Failed to close storage: {}", e),
        }

        let elapsed = start_time.elapsed();
        match &result {
            Ok(report) => {
                tracing::info!("Crawl finished in {:.1?}: {}", elapsed, report);
                if !report.failures.is_empty() {
                    tracing::warn!(
                        "{} nodes were skipped after exhausting retries",
                        report.failures.len()
                    );
                }
            }
            Err(e) => tracing::error!("Crawl failed after {:.1?}: {}", elapsed, e),
        }

        result
    }

    async fn execute(
        config: &Config,
        launcher: &L,
        storage: &mut S,
        page_slot: &mut Option<L::Page>,
    ) -> Result<CrawlReport> {
        let mut settings = WalkSettings::from_config(&config.crawler);

        if config.crawler.respect_robots_txt {
            if let Some(delay) = robots::preflight(config).await? {
                settings = settings.with_minimum_delay(delay);
            }
        } else {
            tracing::debug!("robots.txt check disabled");
        }

        let page: &L::Page = page_slot.insert(launcher.launch().await?);

        let policy = settings.retry;
        let url = config.crawler.base_url.as_str();
        retry_with_backoff(&policy, "Navigating to calculator", move || page.navigate(url))
            .await?;

        let form_timeout = config.crawler.action_timeout();
        retry_with_backoff(&policy, "Waiting for calculator form", move || {
            wait_for_selector(page, FORM_READY, form_timeout)
        })
        .await?;
        tracing::info!("Calculator form loaded");

        HierarchyWalker::new(page, storage, settings).walk().await
    }
}
