//! HTML snapshot parsing for the calculator form
//!
//! The live page is read by taking an HTML snapshot and parsing it here:
//! - option lists of the cascading select controls
//! - the text of the computed price element

use super::SelectOption;
use crate::{CrawlError, Result};
use scraper::{ElementRef, Html, Selector};

/// Parses the options of the select control matched by `select_selector`
///
/// # Extraction Rules
///
/// - Only the first matching select control is read
/// - An option without a `value` attribute uses its text as value
/// - Placeholder options (empty value after trimming) are dropped
/// - Display text has its whitespace collapsed
/// - A missing select control yields an empty list
///
/// # Example
///
/// ```
/// use repair_price_crawler::browser::parse_select_options;
///
/// let html = r#"<select id="device">
///     <option value="">Please choose</option>
///     <option value="ip13">iPhone 13</option>
/// </select>"#;
/// let options = parse_select_options(html, "#device").unwrap();
/// assert_eq!(options.len(), 1);
/// assert_eq!(options[0].text, "iPhone 13");
/// ```
pub fn parse_select_options(html: &str, select_selector: &str) -> Result<Vec<SelectOption>> {
    let select = parse_selector(select_selector)?;
    let option = parse_selector("option")?;
    let document = Html::parse_document(html);

    let Some(control) = document.select(&select).next() else {
        return Ok(Vec::new());
    };

    let options = control
        .select(&option)
        .filter_map(|element| {
            let text = collapsed_text(element);
            let value = element
                .value()
                .attr("value")
                .map(|v| v.trim().to_string())
                .unwrap_or_else(|| text.clone());

            if value.is_empty() {
                None
            } else {
                Some(SelectOption { value, text })
            }
        })
        .collect();

    Ok(options)
}

/// Extracts the text of the first element matched by `selector`
///
/// Returns `None` when no element matches or the element holds only whitespace.
pub fn extract_text(html: &str, selector: &str) -> Result<Option<String>> {
    let selector = parse_selector(selector)?;
    let document = Html::parse_document(html);

    Ok(document
        .select(&selector)
        .next()
        .map(collapsed_text)
        .filter(|text| !text.is_empty()))
}

fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| CrawlError::InvalidSelector {
        selector: selector.to_string(),
        message: e.to_string(),
    })
}

fn collapsed_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}
