//! Parts catalog import from CSV
//!
//! Expected header: `sku,name,manufacturer,device,price`. Device and price may
//! be empty; prices go through the same digit extraction as crawled prices.

use crate::crawler::parse_price;
use crate::storage::{PartRecord, Storage};
use crate::{CrawlError, Result};
use serde::Deserialize;
use std::io::Read;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct PartRow {
    sku: String,
    name: String,
    manufacturer: String,
    #[serde(default)]
    device: Option<String>,
    #[serde(default)]
    price: Option<String>,
}

const REQUIRED_COLUMNS: [&str; 3] = ["sku", "name", "manufacturer"];

/// Outcome of one import
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub imported: usize,
    pub skipped: usize,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl PartRow {
    fn into_record(self) -> Option<PartRecord> {
        let sku = self.sku.trim().to_string();
        let name = self.name.trim().to_string();
        let manufacturer = self.manufacturer.trim().to_string();
        if sku.is_empty() || name.is_empty() || manufacturer.is_empty() {
            return None;
        }

        Some(PartRecord {
            sku,
            name,
            manufacturer,
            device: non_empty(self.device),
            price: non_empty(self.price).and_then(|p| parse_price(&p)),
        })
    }
}

/// Imports parts from any CSV reader
///
/// Rows that fail to deserialize or lack sku/name/manufacturer are skipped
/// and counted. Storage errors abort the import.
pub fn import_parts<R: Read, S: Storage>(reader: R, storage: &mut S) -> Result<ImportSummary> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::Headers)
        .flexible(true)
        .from_reader(reader);
    let headers = rdr.headers()?;
    if let Some(missing) = REQUIRED_COLUMNS
        .iter()
        .find(|column| !headers.iter().any(|h| h == **column))
    {
        return Err(CrawlError::ImportFormat(format!(
            "parts CSV lacks the '{}' column",
            missing
        )));
    }

    let mut summary = ImportSummary::default();

    for (index, result) in rdr.deserialize::<PartRow>().enumerate() {
        // Header is line 1
        let line = index + 2;

        let row = match result {
            Ok(row) => row,
            Err(e) => {
                tracing::warn!("Skipping malformed parts row {}: {}", line, e);
                summary.skipped += 1;
                continue;
            }
        };

        let Some(part) = row.into_record() else {
            tracing::warn!("Skipping parts row {}: sku, name and manufacturer are required", line);
            summary.skipped += 1;
            continue;
        };

        storage.upsert_part(&part)?;
        tracing::debug!("Imported part {} ({})", part.sku, part.name);
        summary.imported += 1;
    }

    Ok(summary)
}

/// Imports parts from a CSV file
pub fn import_parts_file<S: Storage>(path: &Path, storage: &mut S) -> Result<ImportSummary> {
    let file = std::fs::File::open(path)?;
    let summary = import_parts(file, storage)?;

    tracing::info!(
        "Imported {} parts from {} ({} rows skipped)",
        summary.imported,
        path.display(),
        summary.skipped
    );
    Ok(summary)
}
