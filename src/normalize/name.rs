//! Splitting a product title into name and pack quantity

use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::sync::LazyLock;

/// A size token in a title: whitespace, a number, an optional space, a unit,
/// and an optional trailing period
static TITLE_QUANTITY_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\s+((\d+\.?\d*\s*(?:ml|kg|pcs|gal|oz|lb|cc|cm|l|g|m))\b\.?)")
        .expect("hardcoded regex pattern is valid")
});

static QUANTITY_TEXT_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d+(?:\.\d*)?)\s*([A-Za-z]+)$").expect("hardcoded regex pattern is valid")
});

/// Units recognised in product titles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Unit {
    Millilitre,
    Litre,
    Gram,
    Kilogram,
    Ounce,
    Piece,
    Pound,
    CubicCentimetre,
    Gallon,
    Metre,
    Centimetre,
}

impl Unit {
    /// Parses a unit token, ignoring case
    pub fn from_token(token: &str) -> Option<Self> {
        let unit = match token.to_ascii_lowercase().as_str() {
            "ml" => Self::Millilitre,
            "l" => Self::Litre,
            "g" => Self::Gram,
            "kg" => Self::Kilogram,
            "oz" => Self::Ounce,
            "pcs" => Self::Piece,
            "lb" => Self::Pound,
            "cc" => Self::CubicCentimetre,
            "gal" => Self::Gallon,
            "m" => Self::Metre,
            "cm" => Self::Centimetre,
            _ => return None,
        };
        Some(unit)
    }

    /// Canonical token
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Millilitre => "ml",
            Self::Litre => "L",
            Self::Gram => "g",
            Self::Kilogram => "kg",
            Self::Ounce => "oz",
            Self::Piece => "pcs",
            Self::Pound => "lb",
            Self::CubicCentimetre => "cc",
            Self::Gallon => "gal",
            Self::Metre => "m",
            Self::Centimetre => "cm",
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Unit {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// A pack size such as `500ml` or `1.5L`
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Quantity {
    pub value: f64,
    pub unit: Unit,
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // f64 Display already prints whole numbers without a fraction
        write!(f, "{}{}", self.value, self.unit)
    }
}

/// Parses quantity text like `500ml`, `1.5 L` or `12PCS`
pub fn parse_quantity(text: &str) -> Option<Quantity> {
    let captures = QUANTITY_TEXT_REGEX.captures(text.trim())?;
    let value: f64 = captures[1].parse().ok()?;
    let unit = Unit::from_token(&captures[2])?;

    value.is_finite().then_some(Quantity { value, unit })
}

/// Splits a title into the product name and its trailing quantity text
///
/// The last size token in the title is removed, along with its trailing
/// period, and the text around it is rejoined with a single space. Without a
/// size token the trimmed title is returned unchanged.
///
/// # Example
///
/// ```
/// use shelf_scout::normalize::split_name_quantity;
///
/// assert_eq!(
///     split_name_quantity("Orange Juice 500ml."),
///     ("Orange Juice".to_string(), Some("500ml".to_string()))
/// );
/// assert_eq!(split_name_quantity(" Fresh Bread "), ("Fresh Bread".to_string(), None));
/// ```
pub fn split_name_quantity(title: &str) -> (String, Option<String>) {
    let Some(captures) = TITLE_QUANTITY_REGEX.captures_iter(title).last() else {
        return (title.trim().to_string(), None);
    };

    let (Some(whole), Some(quantity)) = (captures.get(0), captures.get(2)) else {
        return (title.trim().to_string(), None);
    };

    let before = title[..whole.start()].trim_end();
    let after = title[whole.end()..].trim_start();
    let name = if before.is_empty() || after.is_empty() {
        format!("{}{}", before, after)
    } else {
        format!("{} {}", before, after)
    };

    (name.trim().to_string(), Some(quantity.as_str().to_string()))
}
