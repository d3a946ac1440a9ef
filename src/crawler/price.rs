//! Price text extraction
//!
//! The calculator renders prices as free text ("€ 129,00", "ab 89 €",
//! "Preis auf Anfrage"). Extraction keeps every digit and drops everything
//! else, so decimal separators are not interpreted: "€ 129,00" becomes 12900.

/// Phrases the calculator shows instead of a price
const UNAVAILABLE_MARKERS: &[&str] = &["not available", "unavailable", "nicht verfügbar"];

/// Parses displayed price text into an integer
///
/// Returns `None` when the text signals unavailability, holds no digits, or
/// the digits overflow an `i64`.
///
/// # Examples
///
/// ```
/// use repair_price_crawler::parse_price;
///
/// assert_eq!(parse_price("€ 129,00"), Some(12900));
/// assert_eq!(parse_price("89 €"), Some(89));
/// assert_eq!(parse_price("Not available"), None);
/// ```
pub fn parse_price(text: &str) -> Option<i64> {
    let lowered = text.to_lowercase();
    if UNAVAILABLE_MARKERS.iter().any(|m| lowered.contains(m)) {
        return None;
    }

    let digits: String = text.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }

    digits.parse().ok()
}
