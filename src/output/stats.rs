//! Statistics generation from the price database
//!
//! This module provides functionality for extracting and displaying
//! catalog and crawl statistics from the storage layer.

use crate::storage::{CatalogTable, RunRecord, Storage};
use crate::CrawlError;
use std::fmt::Write;

/// Number of runs listed by `--stats`
pub const RECENT_RUNS: usize = 5;

/// Catalog statistics summary
#[derive(Debug, Clone)]
pub struct CatalogStatistics {
    pub manufacturers: u64,
    pub devices: u64,
    pub actions: u64,

    /// All price observations, with or without value
    pub prices: u64,

    /// Observations recorded as not available
    pub prices_without_value: u64,

    pub parts: u64,

    /// Latest runs, newest first
    pub recent_runs: Vec<RunRecord>,
}

impl CatalogStatistics {
    pub fn prices_with_value(&self) -> u64 {
        self.prices.saturating_sub(self.prices_without_value)
    }
}

/// Loads statistics from storage
///
/// # Arguments
///
/// * `storage` - The storage backend to query
///
/// # Returns
///
/// * `Ok(CatalogStatistics)` - Successfully loaded statistics
/// * `Err(CrawlError)` - Failed to query statistics
pub fn load_statistics(storage: &dyn Storage) -> Result<CatalogStatistics, CrawlError> {
    Ok(CatalogStatistics {
        manufacturers: storage.count_rows(CatalogTable::Manufacturers)?,
        devices: storage.count_rows(CatalogTable::Devices)?,
        actions: storage.count_rows(CatalogTable::Actions)?,
        prices: storage.count_rows(CatalogTable::Prices)?,
        prices_without_value: storage.count_missing_prices()?,
        parts: storage.count_rows(CatalogTable::Parts)?,
        recent_runs: storage.recent_runs(RECENT_RUNS)?,
    })
}

/// Renders statistics as the text printed by `--stats`
pub fn format_statistics(stats: &CatalogStatistics) -> String {
    let mut out = String::new();

    // Writing to a String cannot fail
    let _ = writeln!(out, "=== Price Database Statistics ===\n");
    let _ = writeln!(out, "Catalog:");
    let _ = writeln!(out, "  Manufacturers: {}", stats.manufacturers);
    let _ = writeln!(out, "  Devices: {}", stats.devices);
    let _ = writeln!(out, "  Repair actions: {}", stats.actions);
    let _ = writeln!(out, "  Parts: {}", stats.parts);
    let _ = writeln!(out);

    let _ = writeln!(out, "Price observations: {}", stats.prices);
    let coverage = if stats.prices > 0 {
        (stats.prices_with_value() as f64 / stats.prices as f64) * 100.0
    } else {
        0.0
    };
    let _ = writeln!(
        out,
        "  With value: {} ({:.1}%)",
        stats.prices_with_value(),
        coverage
    );
    let _ = writeln!(out, "  Not available: {}", stats.prices_without_value);
    let _ = writeln!(out);

    if stats.recent_runs.is_empty() {
        let _ = writeln!(out, "No crawl runs recorded");
    } else {
        let _ = writeln!(out, "Recent runs:");
        for run in &stats.recent_runs {
            let _ = writeln!(
                out,
                "  #{} {} started {} finished {}: {} prices, {} skipped nodes",
                run.id,
                run.status.to_db_string(),
                run.started_at,
                run.finished_at.as_deref().unwrap_or("-"),
                run.prices_recorded,
                run.node_failures
            );
        }
    }

    out
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &CatalogStatistics) {
    print!("{}", format_statistics(stats));
}
