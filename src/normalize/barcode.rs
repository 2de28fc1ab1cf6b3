//! Barcode extraction from SKU text

use regex::Regex;
use std::sync::LazyLock;

static DIGIT_RUN_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*(\d+)").expect("hardcoded regex pattern is valid"));

/// Returns the first run of digits in `text`, or an empty string
///
/// # Example
///
/// ```
/// use shelf_scout::normalize::extract_bar_code;
///
/// assert_eq!(extract_bar_code("SKU: 8851234567890"), "8851234567890");
/// assert_eq!(extract_bar_code("no digits here"), "");
/// ```
pub fn extract_bar_code(text: &str) -> String {
    DIGIT_RUN_REGEX
        .captures(text)
        .and_then(|captures| captures.get(1))
        .map(|digits| digits.as_str().to_string())
        .unwrap_or_default()
}
