//! Hierarchy walker over the calculator's cascading selects
//!
//! Manufacturers, devices and actions are visited depth-first in page order.
//! Each selection goes through the retry helper; a node whose retries are
//! exhausted is logged once, recorded in the [`CrawlReport`] and skipped with
//! its whole subtree after a doubled cooldown.
//!
//! The control a selection repopulates is cleared first, and the request delay
//! separates the selection from the read. The calculator updates the page
//! asynchronously, so whatever the wait then sees belongs to this selection.

use crate::browser::{
    wait_for_options, wait_for_text, PageDriver, SelectOption, ACTION_SELECT, DEVICE_SELECT,
    MANUFACTURER_SELECT, PRICE_DISPLAY,
};
use crate::config::CrawlerConfig;
use crate::crawler::price::parse_price;
use crate::crawler::report::{CrawlReport, NodeFailure, NodeLevel};
use crate::crawler::writer::{PriceObservation, PriceWriter};
use crate::retry::{retry_with_backoff, RetryPolicy};
use crate::storage::Storage;
use crate::{CrawlError, Result};
use std::time::Duration;

/// Timing and scope of one walk
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WalkSettings {
    pub retry: RetryPolicy,

    /// Pause before every selection and between a selection and its read
    pub request_delay: Duration,

    /// How long a selection may take to populate the next level
    pub selection_timeout: Duration,

    pub max_manufacturers: Option<usize>,
}

impl WalkSettings {
    pub fn from_config(config: &CrawlerConfig) -> Self {
        Self {
            retry: RetryPolicy::from_config(config),
            request_delay: config.request_delay(),
            selection_timeout: config.selection_timeout(),
            max_manufacturers: config.max_manufacturers,
        }
    }

    /// Stretches the request delay to at least `delay`
    pub fn with_minimum_delay(mut self, delay: Duration) -> Self {
        self.request_delay = self.request_delay.max(delay);
        self
    }

    fn cooldown(&self) -> Duration {
        self.request_delay.saturating_mul(2)
    }
}

/// Walks the calculator and hands every leaf to a [`PriceWriter`]
pub struct HierarchyWalker<'a, P: PageDriver + ?Sized, S: Storage> {
    page: &'a P,
    writer: PriceWriter<'a, S>,
    settings: WalkSettings,
    report: CrawlReport,
}

impl<'a, P, S> HierarchyWalker<'a, P, S>
where
    P: PageDriver + ?Sized,
    S: Storage,
{
    pub fn new(page: &'a P, storage: &'a mut S, settings: WalkSettings) -> Self {
        Self {
            page,
            writer: PriceWriter::new(storage),
            settings,
            report: CrawlReport::default(),
        }
    }

    /// Walks every manufacturer
    ///
    /// Only a failure to read the manufacturer list is returned as an error;
    /// failures below it end up in the report.
    pub async fn walk(mut self) -> Result<CrawlReport> {
        let manufacturers = self.read_manufacturers().await?;

        for manufacturer in &manufacturers {
            self.walk_manufacturer(manufacturer).await;
        }

        Ok(self.report)
    }

    async fn read_manufacturers(&self) -> Result<Vec<SelectOption>> {
        let page = self.page;
        let timeout = self.settings.selection_timeout;

        let mut manufacturers =
            retry_with_backoff(&self.settings.retry, "Reading manufacturers", move || {
                wait_for_options(page, MANUFACTURER_SELECT, timeout)
            })
            .await?;

        if let Some(max) = self.settings.max_manufacturers {
            if manufacturers.len() > max {
                tracing::info!(
                    "Limiting crawl to the first {} of {} manufacturers",
                    max,
                    manufacturers.len()
                );
                manufacturers.truncate(max);
            }
        }

        tracing::info!("Found {} manufacturers", manufacturers.len());
        Ok(manufacturers)
    }

    async fn walk_manufacturer(&mut self, manufacturer: &SelectOption) {
        let path = vec![manufacturer.text.clone()];

        self.pause().await;
        let devices = match self
            .select_and_wait(MANUFACTURER_SELECT, manufacturer, DEVICE_SELECT)
            .await
        {
            Ok(devices) => devices,
            Err(e) => return self.skip(NodeLevel::Manufacturer, path, e).await,
        };

        self.report.manufacturers_visited += 1;
        tracing::info!(
            "Manufacturer {}: {} devices",
            manufacturer.text,
            devices.len()
        );

        for device in &devices {
            self.walk_device(&manufacturer.text, device).await;
        }
    }

    async fn walk_device(&mut self, manufacturer: &str, device: &SelectOption) {
        let path = vec![manufacturer.to_string(), device.text.clone()];

        self.pause().await;
        let actions = match self
            .select_and_wait(DEVICE_SELECT, device, ACTION_SELECT)
            .await
        {
            Ok(actions) => actions,
            Err(e) => return self.skip(NodeLevel::Device, path, e).await,
        };

        self.report.devices_visited += 1;
        tracing::debug!("{} > {}: {} actions", manufacturer, device.text, actions.len());

        for action in &actions {
            self.walk_action(manufacturer, &device.text, action).await;
        }
    }

    async fn walk_action(&mut self, manufacturer: &str, device: &str, action: &SelectOption) {
        let path = vec![
            manufacturer.to_string(),
            device.to_string(),
            action.text.clone(),
        ];

        self.pause().await;
        let text = match self.select_and_read_price(action).await {
            Ok(text) => text,
            Err(e) => return self.skip(NodeLevel::Action, path, e).await,
        };

        self.report.actions_visited += 1;
        let price = parse_price(&text);
        if price.is_none() {
            tracing::debug!("No price for {}: '{}'", path.join(" > "), text.trim());
        }

        let observation = PriceObservation {
            manufacturer: manufacturer.to_string(),
            device: device.to_string(),
            action: action.text.clone(),
            price,
        };

        match self.writer.record(&observation) {
            Ok(Some(_)) => {
                self.report.prices_recorded += 1;
                if price.is_none() {
                    self.report.prices_missing += 1;
                }
            }
            Ok(None) => self.report.price_write_failures += 1,
            Err(e) => self.skip(NodeLevel::Action, path, e).await,
        }
    }

    /// Clears `next`, selects `option` on `select` and waits for `next` to
    /// populate again
    async fn select_and_wait(
        &self,
        select: &'static str,
        option: &SelectOption,
        next: &'static str,
    ) -> Result<Vec<SelectOption>> {
        let page = self.page;
        let value = option.value.as_str();
        let timeout = self.settings.selection_timeout;
        let delay = self.settings.request_delay;
        let label = format!("Selecting {} '{}'", select, option.text);

        retry_with_backoff(&self.settings.retry, &label, move || async move {
            page.clear_content(next).await?;
            page.select_value(select, value).await?;
            tokio::time::sleep(delay).await;
            wait_for_options(page, next, timeout).await
        })
        .await
    }

    /// Clears the price, selects a repair action and waits for the new price
    async fn select_and_read_price(&self, action: &SelectOption) -> Result<String> {
        let page = self.page;
        let value = action.value.as_str();
        let timeout = self.settings.selection_timeout;
        let delay = self.settings.request_delay;
        let label = format!("Reading price for '{}'", action.text);

        retry_with_backoff(&self.settings.retry, &label, move || async move {
            page.clear_content(PRICE_DISPLAY).await?;
            page.select_value(ACTION_SELECT, value).await?;
            tokio::time::sleep(delay).await;
            wait_for_text(page, PRICE_DISPLAY, timeout).await
        })
        .await
    }

    async fn pause(&self) {
        tokio::time::sleep(self.settings.request_delay).await;
    }

    async fn skip(&mut self, level: NodeLevel, path: Vec<String>, error: CrawlError) {
        let failure = NodeFailure {
            level,
            path,
            error: error.to_string(),
        };
        tracing::error!(
            "Skipping {} {}: {}",
            level,
            failure.path_display(),
            failure.error
        );
        self.report.failures.push(failure);

        tokio::time::sleep(self.settings.cooldown()).await;
    }
}
