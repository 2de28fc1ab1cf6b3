//! Price text parsing

use crate::normalize::NormalizationError;

/// Parses displayed price text into a number
///
/// Every character other than an ASCII digit or `.` is dropped (currency
/// symbols, thousands separators, whitespace) before parsing.
///
/// # Errors
///
/// Returns [`NormalizationError::InvalidPrice`] if nothing numeric remains.
///
/// # Example
///
/// ```
/// use shelf_scout::normalize::convert_price_to_float;
///
/// assert_eq!(convert_price_to_float("฿ 129.50").unwrap(), 129.5);
/// assert!(convert_price_to_float("abc").is_err());
/// ```
pub fn convert_price_to_float(text: &str) -> Result<f64, NormalizationError> {
    let cleaned: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();

    let invalid = || NormalizationError::InvalidPrice {
        text: text.to_string(),
    };

    let value: f64 = cleaned.parse().map_err(|_| invalid())?;
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(invalid())
    }
}

/// Formats a price with two decimal places
pub fn format_price(value: f64) -> String {
    format!("{:.2}", value)
}
