//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::storage::schema::{initialize_schema, CatalogTable};
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{
    format_timestamp, parse_timestamp, PartRecord, PriceRecord, RunOutcome, RunRecord, RunStatus,
};
use crate::CrawlError;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;

const RUN_COLUMNS: &str =
    "id, started_at, finished_at, config_hash, status, prices_recorded, node_failures";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(CrawlError)` - Failed to open database
    pub fn new(path: &Path) -> Result<Self, CrawlError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> Result<Self, CrawlError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

fn run_from_row(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
    Ok(RunRecord {
        id: row.get(0)?,
        started_at: row.get(1)?,
        finished_at: row.get(2)?,
        config_hash: row.get(3)?,
        status: RunStatus::from_db_string(&row.get::<_, String>(4)?).unwrap_or(RunStatus::Failed),
        prices_recorded: row.get::<_, i64>(5)?.max(0) as u64,
        node_failures: row.get::<_, i64>(6)?.max(0) as u64,
    })
}

impl Storage for SqliteStorage {
    // ===== Run Management =====

    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO crawl_runs (started_at, config_hash, status) VALUES (?1, ?2, ?3)",
            params![now, config_hash, RunStatus::Running.to_db_string()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn finish_run(
        &mut self,
        run_id: i64,
        status: RunStatus,
        outcome: &RunOutcome,
    ) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE crawl_runs
             SET status = ?1, finished_at = ?2, prices_recorded = ?3, node_failures = ?4
             WHERE id = ?5",
            params![
                status.to_db_string(),
                now,
                outcome.prices_recorded as i64,
                outcome.node_failures as i64,
                run_id
            ],
        )?;

        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        let sql = format!("SELECT {} FROM crawl_runs WHERE id = ?1", RUN_COLUMNS);

        self.conn
            .query_row(&sql, params![run_id], run_from_row)
            .optional()?
            .ok_or(StorageError::RunNotFound(run_id))
    }

    fn recent_runs(&self, limit: usize) -> StorageResult<Vec<RunRecord>> {
        let sql = format!(
            "SELECT {} FROM crawl_runs ORDER BY id DESC LIMIT ?1",
            RUN_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;

        let runs = stmt
            .query_map(params![limit as i64], run_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(runs)
    }

    // ===== Catalog Entities =====

    fn upsert_manufacturer(&mut self, name: &str) -> StorageResult<i64> {
        self.conn.execute(
            "INSERT OR IGNORE INTO manufacturers (name) VALUES (?1)",
            params![name],
        )?;

        let id = self.conn.query_row(
            "SELECT id FROM manufacturers WHERE name = ?1",
            params![name],
            |row| row.get(0),
        )?;
        Ok(id)
    }

    fn find_device(&self, name: &str, manufacturer_id: i64) -> StorageResult<Option<i64>> {
        let id = self
            .conn
            .query_row(
                "SELECT id FROM devices WHERE name = ?1 AND manufacturer_id = ?2",
                params![name, manufacturer_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(id)
    }

    fn insert_device(&mut self, name: &str, manufacturer_id: i64) -> StorageResult<i64> {
        self.conn.execute(
            "INSERT INTO devices (name, manufacturer_id) VALUES (?1, ?2)",
            params![name, manufacturer_id],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn find_action(&self, name: &str, device_id: i64) -> StorageResult<Option<i64>> {
        let id = self
            .conn
            .query_row(
                "SELECT id FROM actions WHERE name = ?1 AND device_id = ?2",
                params![name, device_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(id)
    }

    fn insert_action(&mut self, name: &str, device_id: i64) -> StorageResult<i64> {
        self.conn.execute(
            "INSERT INTO actions (name, device_id) VALUES (?1, ?2)",
            params![name, device_id],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    // ===== Price History =====

    fn insert_price(
        &mut self,
        action_id: i64,
        price: Option<i64>,
        collected_at: DateTime<Utc>,
    ) -> StorageResult<i64> {
        self.conn.execute(
            "INSERT INTO prices (action_id, price, date_collected) VALUES (?1, ?2, ?3)",
            params![action_id, price, format_timestamp(collected_at)],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn price_history(&self, action_id: i64) -> StorageResult<Vec<PriceRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, action_id, price, date_collected FROM prices
             WHERE action_id = ?1 ORDER BY date_collected, id",
        )?;

        let rows = stmt
            .query_map(params![action_id], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, Option<i64>>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(id, action_id, price, collected)| {
                Ok(PriceRecord {
                    id,
                    action_id,
                    price,
                    date_collected: parse_timestamp(&collected)?,
                })
            })
            .collect()
    }

    // ===== Parts Catalog =====

    fn upsert_part(&mut self, part: &PartRecord) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO parts (sku, name, manufacturer, device, price, imported_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(sku) DO UPDATE SET
                name = excluded.name,
                manufacturer = excluded.manufacturer,
                device = excluded.device,
                price = excluded.price,
                imported_at = excluded.imported_at",
            params![
                part.sku,
                part.name,
                part.manufacturer,
                part.device,
                part.price,
                now
            ],
        )?;
        Ok(())
    }

    fn get_part(&self, sku: &str) -> StorageResult<Option<PartRecord>> {
        let part = self
            .conn
            .query_row(
                "SELECT sku, name, manufacturer, device, price FROM parts WHERE sku = ?1",
                params![sku],
                |row| {
                    Ok(PartRecord {
                        sku: row.get(0)?,
                        name: row.get(1)?,
                        manufacturer: row.get(2)?,
                        device: row.get(3)?,
                        price: row.get(4)?,
                    })
                },
            )
            .optional()?;
        Ok(part)
    }

    // ===== Statistics =====

    fn count_rows(&self, table: CatalogTable) -> StorageResult<u64> {
        let sql = format!("SELECT COUNT(*) FROM {}", table.table_name());
        let count: i64 = self.conn.query_row(&sql, [], |row| row.get(0))?;
        Ok(count.max(0) as u64)
    }

    fn count_missing_prices(&self) -> StorageResult<u64> {
        let count: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM prices WHERE price IS NULL", [], |row| {
                    row.get(0)
                })?;
        Ok(count.max(0) as u64)
    }

    // ===== Lifecycle =====

    fn close(self) -> StorageResult<()> {
        self.conn
            .close()
            .map_err(|(_, e)| StorageError::Sqlite(e))
    }
}
