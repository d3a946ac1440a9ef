//! Storage module for persisting catalog and price data
//!
//! This module handles all database operations for the crawler, including:
//! - SQLite database initialization and schema management
//! - Find-or-create of manufacturers, devices and repair actions
//! - Append-only price history
//! - Crawl run tracking
//! - Parts catalog import from CSV

mod import;
mod schema;
mod sqlite;
mod traits;

pub use import::{import_parts, import_parts_file, ImportSummary};
pub use schema::CatalogTable;
pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageError, StorageResult};

use chrono::{DateTime, SecondsFormat, Utc};

/// Formats a timestamp the way it is stored
///
/// Fixed-width RFC 3339 with nanoseconds, so text order equals time order.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

/// Parses a stored timestamp
pub fn parse_timestamp(value: &str) -> StorageResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| StorageError::InvalidTimestamp {
            value: value.to_string(),
            message: e.to_string(),
        })
}

/// Represents one price observation
#[derive(Debug, Clone, PartialEq)]
pub struct PriceRecord {
    pub id: i64,
    pub action_id: i64,
    pub price: Option<i64>,
    pub date_collected: DateTime<Utc>,
}

/// Represents a part from the imported catalog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartRecord {
    pub sku: String,
    pub name: String,
    pub manufacturer: String,
    pub device: Option<String>,
    pub price: Option<i64>,
}

/// Represents a crawl run
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub status: RunStatus,
    pub prices_recorded: u64,
    pub node_failures: u64,
}

/// Counters stored with a finished run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOutcome {
    pub prices_recorded: u64,
    pub node_failures: u64,
}

/// Status of a crawl run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}
