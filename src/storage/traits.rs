//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::storage::schema::CatalogTable;
use crate::storage::{PartRecord, PriceRecord, RunOutcome, RunRecord, RunStatus};
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("Invalid timestamp '{value}': {message}")]
    InvalidTimestamp { value: String, message: String },

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// The crawler owns exactly one storage handle per run and releases it with
/// [`Storage::close`] during cleanup. Manufacturers, devices and actions are
/// find-or-create; prices are append-only.
pub trait Storage {
    // ===== Run Management =====

    /// Creates a new crawl run in the `running` state
    ///
    /// # Returns
    ///
    /// The ID of the newly created run
    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64>;

    /// Marks a run as finished with its final status and counters
    fn finish_run(
        &mut self,
        run_id: i64,
        status: RunStatus,
        outcome: &RunOutcome,
    ) -> StorageResult<()>;

    /// Gets a run by ID
    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord>;

    /// Gets the most recent runs, newest first
    fn recent_runs(&self, limit: usize) -> StorageResult<Vec<RunRecord>>;

    // ===== Catalog Entities =====

    /// Inserts a manufacturer if absent and returns its ID
    ///
    /// An existing manufacturer is never modified.
    fn upsert_manufacturer(&mut self, name: &str) -> StorageResult<i64>;

    /// Looks up a device by name within one manufacturer
    fn find_device(&self, name: &str, manufacturer_id: i64) -> StorageResult<Option<i64>>;

    /// Inserts a device row
    fn insert_device(&mut self, name: &str, manufacturer_id: i64) -> StorageResult<i64>;

    /// Looks up a repair action by name within one device
    fn find_action(&self, name: &str, device_id: i64) -> StorageResult<Option<i64>>;

    /// Inserts a repair action row
    fn insert_action(&mut self, name: &str, device_id: i64) -> StorageResult<i64>;

    /// Returns the device ID, creating the device only if the lookup misses
    fn find_or_create_device(&mut self, name: &str, manufacturer_id: i64) -> StorageResult<i64> {
        match self.find_device(name, manufacturer_id)? {
            Some(id) => Ok(id),
            None => self.insert_device(name, manufacturer_id),
        }
    }

    /// Returns the action ID, creating the action only if the lookup misses
    fn find_or_create_action(&mut self, name: &str, device_id: i64) -> StorageResult<i64> {
        match self.find_action(name, device_id)? {
            Some(id) => Ok(id),
            None => self.insert_action(name, device_id),
        }
    }

    // ===== Price History =====

    /// Appends a price observation; existing rows are never touched
    fn insert_price(
        &mut self,
        action_id: i64,
        price: Option<i64>,
        collected_at: DateTime<Utc>,
    ) -> StorageResult<i64>;

    /// Gets the price series of one action, oldest first
    fn price_history(&self, action_id: i64) -> StorageResult<Vec<PriceRecord>>;

    // ===== Parts Catalog =====

    /// Inserts a part or replaces the existing part with the same SKU
    fn upsert_part(&mut self, part: &PartRecord) -> StorageResult<()>;

    /// Gets a part by SKU
    fn get_part(&self, sku: &str) -> StorageResult<Option<PartRecord>>;

    // ===== Statistics =====

    /// Counts the rows of a catalog table
    fn count_rows(&self, table: CatalogTable) -> StorageResult<u64>;

    /// Counts price observations recorded as not available
    fn count_missing_prices(&self) -> StorageResult<u64>;

    // ===== Lifecycle =====

    /// Releases the underlying connection
    fn close(self) -> StorageResult<()>
    where
        Self: Sized;
}
