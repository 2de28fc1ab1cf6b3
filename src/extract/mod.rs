//! Field extraction from rendered product detail pages
//!
//! Extraction never fails: a missing element yields `None` or an empty list.
//! Deciding whether a record is usable is left to [`crate::normalize`].

use crate::crawler::CrawlContext;
use scraper::{ElementRef, Html, Selector};

/// Product title; only the element's own text nodes are read
pub const NAME_SELECTOR: &str = ".product-tile__name";
/// Gallery images; the `src` attribute of each is kept
pub const IMAGE_SELECTOR: &str = ".product-Details-images img";
/// SKU line holding the barcode digits
pub const SKU_SELECTOR: &str = ".product-Details-sku";
/// Accordion sections with the product description fragments
pub const DETAIL_SELECTOR: &str = ".accordion-property";
/// Current (possibly discounted) price
pub const PRICE_SELECTOR: &str = ".product-Details-current-price";
/// Seasonal labels and promotion names, in document order
pub const LABEL_SELECTOR: &str =
    ".product-Details-seasonal-label, .central_container .main-content-wrapper .promo-name";

/// Unvalidated fields scraped from one product page
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRecord {
    pub name: Option<String>,

    /// Text nodes under the detail accordion, untrimmed and in order
    pub details: Vec<String>,

    pub price: Option<String>,

    pub barcode: Option<String>,

    pub images: Vec<String>,

    /// Trimmed, non-blank label fragments
    pub labels: Vec<String>,

    pub category: Option<String>,

    pub subcategory: Option<String>,

    /// Product URL as linked from the listing page
    pub url: String,
}

/// Extracts the raw product fields from a detail page
///
/// # Arguments
///
/// * `html` - Rendered page HTML
/// * `context` - Context inherited from the listing (category, subcategory, url)
/// * `source_url` - Fallback product URL when the context carries none
///
/// # Example
///
/// ```
/// use shelf_scout::crawler::CrawlContext;
/// use shelf_scout::extract::extract;
///
/// let html = r#"<div class="product-tile__name">Orange Juice 500ml</div>
///               <div class="product-Details-current-price">฿ 45.00</div>"#;
/// let raw = extract(html, &CrawlContext::new(), "https://shop.example.com/p/1");
/// assert_eq!(raw.name.as_deref(), Some("Orange Juice 500ml"));
/// assert_eq!(raw.price.as_deref(), Some("฿ 45.00"));
/// ```
pub fn extract(html: &str, context: &CrawlContext, source_url: &str) -> RawRecord {
    let document = Html::parse_document(html);

    RawRecord {
        name: first_own_text(&document, NAME_SELECTOR),
        details: descendant_texts(&document, DETAIL_SELECTOR),
        price: first_own_text(&document, PRICE_SELECTOR),
        barcode: first_own_text(&document, SKU_SELECTOR),
        images: attribute_values(&document, IMAGE_SELECTOR, "src"),
        labels: descendant_texts(&document, LABEL_SELECTOR)
            .into_iter()
            .map(|label| label.trim().to_string())
            .filter(|label| !label.is_empty())
            .collect(),
        category: context.category().map(str::to_string),
        subcategory: context.subcategory().map(str::to_string),
        url: context.product_url().unwrap_or(source_url).to_string(),
    }
}

/// Concatenated direct text children of an element
pub fn own_text(element: ElementRef<'_>) -> String {
    element
        .children()
        .filter_map(|node| node.value().as_text())
        .map(|text| &**text)
        .collect()
}

/// Own text of the first element matching `selector`, trimmed
///
/// Returns `None` when nothing matches or the text is blank.
pub fn first_own_text(document: &Html, selector: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;

    document
        .select(&selector)
        .next()
        .map(|element| own_text(element).trim().to_string())
        .filter(|text| !text.is_empty())
}

/// Every text node under every element matching `selector`, in document order
fn descendant_texts(document: &Html, selector: &str) -> Vec<String> {
    let Ok(selector) = Selector::parse(selector) else {
        return Vec::new();
    };

    document
        .select(&selector)
        .flat_map(|element| element.text())
        .map(str::to_string)
        .collect()
}

fn attribute_values(document: &Html, selector: &str, attribute: &str) -> Vec<String> {
    let Ok(selector) = Selector::parse(selector) else {
        return Vec::new();
    };

    document
        .select(&selector)
        .filter_map(|element| element.value().attr(attribute))
        .map(str::to_string)
        .collect()
}
