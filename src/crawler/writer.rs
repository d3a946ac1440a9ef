//! Persistence of walked price observations

use crate::storage::Storage;
use crate::Result;
use chrono::{DateTime, Duration, Utc};

/// One leaf of the hierarchy with its parsed price
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceObservation {
    pub manufacturer: String,
    pub device: String,
    pub action: String,
    pub price: Option<i64>,
}

/// Writes observations into storage
///
/// Catalog entities are find-or-create; every observation appends a new price
/// row. Timestamps handed out by one writer are strictly increasing.
pub struct PriceWriter<'a, S: Storage> {
    storage: &'a mut S,
    last_collected: Option<DateTime<Utc>>,
}

impl<'a, S: Storage> PriceWriter<'a, S> {
    pub fn new(storage: &'a mut S) -> Self {
        Self {
            storage,
            last_collected: None,
        }
    }

    fn next_timestamp(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let ts = match self.last_collected {
            Some(last) if now <= last => last + Duration::microseconds(1),
            _ => now,
        };
        self.last_collected = Some(ts);
        ts
    }

    /// Records one observation
    ///
    /// # Returns
    ///
    /// * `Ok(Some(id))` - The new price row
    /// * `Ok(None)` - The price row could not be inserted (logged)
    /// * `Err(_)` - Manufacturer, device or action could not be resolved
    pub fn record(&mut self, observation: &PriceObservation) -> Result<Option<i64>> {
        let manufacturer_id = self.storage.upsert_manufacturer(&observation.manufacturer)?;
        let device_id = self
            .storage
            .find_or_create_device(&observation.device, manufacturer_id)?;
        let action_id = self
            .storage
            .find_or_create_action(&observation.action, device_id)?;

        let collected_at = self.next_timestamp();
        match self
            .storage
            .insert_price(action_id, observation.price, collected_at)
        {
            Ok(id) => {
                tracing::debug!(
                    "Recorded {} > {} > {}: {:?}",
                    observation.manufacturer,
                    observation.device,
                    observation.action,
                    observation.price
                );
                Ok(Some(id))
            }
            Err(e) => {
                tracing::error!(
                    "Failed to store price for {} > {} > {}: {}",
                    observation.manufacturer,
                    observation.device,
                    observation.action,
                    e
                );
                Ok(None)
            }
        }
    }
}
