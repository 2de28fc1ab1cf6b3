//! Normalization of raw product fields into typed records
//!
//! Each field goes through its own step:
//! - name: split off the trailing pack quantity
//! - details: join fragments and trim
//! - price: strip non-numeric characters and parse
//! - barcode: first run of digits
//!
//! A failing step rejects the whole record. The caller counts the rejection
//! on the [`crate::state::CrawlSession`] and moves on.

mod barcode;
mod name;
mod price;

pub use barcode::extract_bar_code;
pub use name::{parse_quantity, split_name_quantity, Quantity, Unit};
pub use price::{convert_price_to_float, format_price};

use crate::extract::RawRecord;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

/// Errors that reject a raw record
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NormalizationError {
    /// A required field was not found on the page
    #[error("Missing required field '{0}'")]
    MissingField(&'static str),

    /// The price text held no parseable number
    #[error("Invalid price text '{text}'")]
    InvalidPrice { text: String },
}

/// A validated product record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductRecord {
    pub name: String,

    /// Pack size parsed from the title, if it carried one
    pub quantity: Option<Quantity>,

    /// Finite and non-negative
    pub price: f64,

    /// Digits only; empty when the page showed no barcode
    pub barcode: String,

    pub details: String,

    pub images: Vec<String>,

    pub labels: Vec<String>,

    pub category: Option<String>,

    pub subcategory: Option<String>,

    pub url: String,

    pub scraped_at: DateTime<Utc>,
}

/// Converts a raw record into a [`ProductRecord`]
///
/// # Errors
///
/// * [`NormalizationError::MissingField`] - no product name or no price text
/// * [`NormalizationError::InvalidPrice`] - the price text is not numeric
pub fn normalize(raw: RawRecord) -> Result<ProductRecord, NormalizationError> {
    let title = raw.name.ok_or(NormalizationError::MissingField("name"))?;
    let (name, quantity_text) = split_name_quantity(&title);
    if name.is_empty() {
        return Err(NormalizationError::MissingField("name"));
    }

    let quantity = quantity_text.as_deref().and_then(parse_quantity);

    let price_text = raw.price.ok_or(NormalizationError::MissingField("price"))?;
    let price = convert_price_to_float(&price_text)?;

    let barcode = raw.barcode.as_deref().map(extract_bar_code).unwrap_or_default();

    Ok(ProductRecord {
        name,
        quantity,
        price,
        barcode,
        details: raw.details.concat().trim().to_string(),
        images: raw.images,
        labels: raw.labels,
        category: raw.category,
        subcategory: raw.subcategory,
        url: raw.url,
        scraped_at: Utc::now(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw() -> RawRecord {
        RawRecord {
            name: Some("Orange Juice 500ml.".to_string()),
            details: vec!["  Fresh ".to_string(), "squeezed".to_string(), " daily \n".to_string()],
            price: Some("฿ 45.00".to_string()),
            barcode: Some("SKU: 8851234567890".to_string()),
            images: vec!["https://cdn.example.com/oj.jpg".to_string()],
            labels: vec!["Summer".to_string()],
            category: Some("Beverages".to_string()),
            subcategory: Some("Juice".to_string()),
            url: "https://shop.example.com/en/oj".to_string(),
        }
    }

    #[test]
    fn test_normalize_full_record() {
        let record = normalize(raw()).unwrap();

        assert_eq!(record.name, "Orange Juice");
        assert_eq!(record.quantity, Some(Quantity { value: 500.0, unit: Unit::Millilitre }));
        assert_eq!(record.price, 45.0);
        assert_eq!(record.barcode, "8851234567890");
        assert_eq!(record.details, "Fresh squeezed daily");
        assert_eq!(record.images.len(), 1);
        assert_eq!(record.labels, vec!["Summer"]);
        assert_eq!(record.category.as_deref(), Some("Beverages"));
        assert_eq!(record.url, "https://shop.example.com/en/oj");
    }

    #[test]
    fn test_missing_name_rejected() {
        let mut input = raw();
        input.name = None;
        assert_eq!(normalize(input), Err(NormalizationError::MissingField("name")));
    }

    #[test]
    fn test_missing_price_rejected() {
        let mut input = raw();
        input.price = None;
        assert_eq!(normalize(input), Err(NormalizationError::MissingField("price")));
    }

    #[test]
    fn test_bad_price_rejected() {
        let mut input = raw();
        input.price = Some("Out of stock".to_string());
        assert!(matches!(normalize(input), Err(NormalizationError::InvalidPrice { .. })));
    }

    #[test]
    fn test_missing_barcode_is_empty() {
        let mut input = raw();
        input.barcode = None;
        assert_eq!(normalize(input).unwrap().barcode, "");
    }

    #[test]
    fn test_name_without_quantity() {
        let mut input = raw();
        input.name = Some(" Fresh Bread ".to_string());
        let record = normalize(input).unwrap();
        assert_eq!(record.name, "Fresh Bread");
        assert_eq!(record.quantity, None);
    }

    #[test]
    fn test_renormalizing_output_is_stable() {
        let first = normalize(raw()).unwrap();

        let mut again = raw();
        again.name = Some(format!("{} {}", first.name, first.quantity.unwrap()));
        again.price = Some(format_price(first.price));
        again.barcode = Some(first.barcode.clone());
        again.details = vec![first.details.clone()];

        let second = normalize(again).unwrap();
        assert_eq!(second.name, first.name);
        assert_eq!(second.quantity, first.quantity);
        assert_eq!(second.price, first.price);
        assert_eq!(second.barcode, first.barcode);
        assert_eq!(second.details, first.details);
    }

    #[test]
    fn test_record_serializes_quantity_and_unit() {
        let record = normalize(raw()).unwrap();
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["quantity"]["value"], 500.0);
        assert_eq!(json["quantity"]["unit"], "ml");
        assert_eq!(json["price"], 45.0);
    }
}
