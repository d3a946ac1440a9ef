//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the price database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Track crawl runs
CREATE TABLE IF NOT EXISTS crawl_runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    config_hash TEXT NOT NULL,
    status TEXT NOT NULL,
    prices_recorded INTEGER NOT NULL DEFAULT 0,
    node_failures INTEGER NOT NULL DEFAULT 0
);

-- Manufacturers offered by the calculator
CREATE TABLE IF NOT EXISTS manufacturers (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE
);

-- Devices, unique per manufacturer
CREATE TABLE IF NOT EXISTS devices (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    manufacturer_id INTEGER NOT NULL REFERENCES manufacturers(id),
    UNIQUE(name, manufacturer_id)
);

CREATE INDEX IF NOT EXISTS idx_devices_manufacturer ON devices(manufacturer_id);

-- Repair actions, unique per device
CREATE TABLE IF NOT EXISTS actions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    device_id INTEGER NOT NULL REFERENCES devices(id),
    UNIQUE(name, device_id)
);

CREATE INDEX IF NOT EXISTS idx_actions_device ON actions(device_id);

-- Append-only price observations
CREATE TABLE IF NOT EXISTS prices (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    action_id INTEGER NOT NULL REFERENCES actions(id),
    price INTEGER,
    date_collected TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_prices_action ON prices(action_id, date_collected);

-- Imported parts catalog
CREATE TABLE IF NOT EXISTS parts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    sku TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL,
    manufacturer TEXT NOT NULL,
    device TEXT,
    price INTEGER,
    imported_at TEXT NOT NULL
);
"#;

/// Tables holding catalog rows, used for statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogTable {
    Manufacturers,
    Devices,
    Actions,
    Prices,
    Parts,
}

impl CatalogTable {
    pub fn table_name(&self) -> &'static str {
        match self {
            Self::Manufacturers => "manufacturers",
            Self::Devices => "devices",
            Self::Actions => "actions",
            Self::Prices => "prices",
            Self::Parts => "parts",
        }
    }
}

/// Initializes the database schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)
}
