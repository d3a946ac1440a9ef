//! Browser module: the page handle the crawler drives
//!
//! The walker never talks to Chrome directly. It sees a [`PageDriver`], a
//! small set of DOM operations over the calculator page, and obtains one from
//! a [`BrowserLauncher`]. The production implementation is backed by
//! chromiumoxide; tests substitute a simulated calculator page.

mod dom;
mod session;
mod wait;

pub use dom::{extract_text, parse_select_options};
pub use session::{find_browser_executable, ChromiumLauncher, ChromiumSession};
pub use wait::{wait_for_options, wait_for_selector, wait_for_text, POLL_INTERVAL};

use crate::Result;
use async_trait::async_trait;
use serde::Deserialize;

/// Manufacturer select control
pub const MANUFACTURER_SELECT: &str = "#manufacturer";

/// Device select control, populated after a manufacturer is chosen
pub const DEVICE_SELECT: &str = "#device";

/// Repair action select control, populated after a device is chosen
pub const ACTION_SELECT: &str = "#action";

/// Element showing the computed price after an action is chosen
pub const PRICE_DISPLAY: &str = "#final-price";

/// Wrapper whose presence signals the calculator form has loaded
pub const FORM_READY: &str = ".calculator-wrapper";

/// One selectable `<option>` of a select control
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SelectOption {
    /// The option's `value` attribute, used to select it
    pub value: String,

    /// Display text, used as the entity name
    pub text: String,
}

impl SelectOption {
    pub fn new(value: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            text: text.into(),
        }
    }
}

/// DOM operations the crawler performs on the calculator page
///
/// Implementations apply their own per-operation timeout; waiting for content
/// to appear is layered on top by [`wait_for_options`] and friends.
#[async_trait(?Send)]
pub trait PageDriver {
    /// Navigates the page to `url` and waits for the load to finish
    async fn navigate(&self, url: &str) -> Result<()>;

    /// Returns true if at least one element matches `selector`
    async fn element_exists(&self, selector: &str) -> Result<bool>;

    /// Reads the non-placeholder options of the select control at `selector`
    async fn select_options(&self, selector: &str) -> Result<Vec<SelectOption>>;

    /// Selects `value` on the select control and fires its change event
    async fn select_value(&self, selector: &str, value: &str) -> Result<()>;

    /// Empties the element at `selector`
    ///
    /// A select control loses all its options, any other element its text.
    /// Clearing a control before the selection that repopulates it keeps the
    /// following wait from accepting leftovers of the previous selection.
    async fn clear_content(&self, selector: &str) -> Result<()>;

    /// Reads the trimmed text of the first element matching `selector`
    ///
    /// Returns `None` when the element is missing or has no text.
    async fn text_content(&self, selector: &str) -> Result<Option<String>>;

    /// Releases the underlying browser; calling it twice is a no-op
    async fn close(&mut self) -> Result<()>;
}

/// Produces a configured browser session for one crawl run
#[async_trait(?Send)]
pub trait BrowserLauncher {
    type Page: PageDriver;

    async fn launch(&self) -> Result<Self::Page>;
}
