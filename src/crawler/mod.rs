//! Crawler module for walking the repair price calculator
//!
//! This module contains the core crawling logic, including:
//! - Price text extraction
//! - The hierarchy walker over the cascading selects
//! - Persistence of observed prices
//! - Overall crawl coordination

mod coordinator;
mod price;
mod report;
mod walker;
mod writer;

pub use coordinator::Coordinator;
pub use price::parse_price;
pub use report::{CrawlReport, NodeFailure, NodeLevel};
pub use walker::{HierarchyWalker, WalkSettings};
pub use writer::{PriceObservation, PriceWriter};

use crate::browser::ChromiumLauncher;
use crate::config::Config;
use crate::storage::SqliteStorage;
use crate::Result;
use std::path::Path;

/// Runs a complete crawl against the configured database and Chromium
///
/// # Arguments
///
/// * `config` - The crawler configuration
/// * `config_hash` - Hash of the configuration file, stored with the run
///
/// # Returns
///
/// * `Ok(CrawlReport)` - The crawl ran to the end, possibly skipping nodes
/// * `Err(CrawlError)` - The crawl failed
pub async fn run_crawl(config: Config, config_hash: String) -> Result<CrawlReport> {
    let storage = SqliteStorage::new(Path::new(&config.output.database_path))?;
    let launcher = ChromiumLauncher::new(&config);

    Coordinator::new(config, config_hash, launcher, storage)
        .run()
        .await
}
