//! Polling waits over a [`PageDriver`]
//!
//! The calculator repopulates its select controls asynchronously after a
//! change event. These helpers poll the page until the expected content shows
//! up or the timeout elapses.

use super::{PageDriver, SelectOption};
use crate::{CrawlError, Result};
use std::time::Duration;
use tokio::time::Instant;

/// Interval between two polls of the page
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Waits until an element matching `selector` exists
pub async fn wait_for_selector<P>(page: &P, selector: &str, timeout: Duration) -> Result<()>
where
    P: PageDriver + ?Sized,
{
    let start = Instant::now();
    loop {
        if page.element_exists(selector).await? {
            tracing::trace!("{} appeared after {:?}", selector, start.elapsed());
            return Ok(());
        }
        if start.elapsed() >= timeout {
            return Err(CrawlError::timeout(format!("element {}", selector), timeout));
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

/// Waits until the select control at `selector` offers at least one option
pub async fn wait_for_options<P>(
    page: &P,
    selector: &str,
    timeout: Duration,
) -> Result<Vec<SelectOption>>
where
    P: PageDriver + ?Sized,
{
    let start = Instant::now();
    loop {
        let options = page.select_options(selector).await?;
        if !options.is_empty() {
            tracing::trace!(
                "{} populated with {} options after {:?}",
                selector,
                options.len(),
                start.elapsed()
            );
            return Ok(options);
        }
        if start.elapsed() >= timeout {
            return Err(CrawlError::timeout(
                format!("options of {}", selector),
                timeout,
            ));
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

/// Waits until the element at `selector` holds non-empty text
pub async fn wait_for_text<P>(page: &P, selector: &str, timeout: Duration) -> Result<String>
where
    P: PageDriver + ?Sized,
{
    let start = Instant::now();
    loop {
        let text = page.text_content(selector).await?;
        if let Some(text) = text.filter(|t| !t.trim().is_empty()) {
            return Ok(text);
        }
        if start.elapsed() >= timeout {
            return Err(CrawlError::timeout(format!("text of {}", selector), timeout));
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}
