//! Work units and the traversal stages they belong to

use crate::render::WaitStrategy;
use std::collections::BTreeMap;
use std::fmt;
use url::Url;

/// Node type in the crawl's state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Stage {
    /// Site home page with the category navigation
    Home,
    /// Category page with one carousel per subcategory
    Category,
    /// "View all" listing of one subcategory
    Subcategory,
    /// Product listing reached directly (parsed like a subcategory listing)
    ProductList,
    /// Product detail page; terminal
    ProductDetail,
}

impl Stage {
    /// Returns true if this stage yields records instead of further units
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::ProductDetail)
    }

    /// Returns true for stages that list product tiles
    pub fn is_listing(&self) -> bool {
        matches!(self, Self::Subcategory | Self::ProductList)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Home => "home",
            Self::Category => "category",
            Self::Subcategory => "subcategory",
            Self::ProductList => "product_list",
            Self::ProductDetail => "product_detail",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Context key for the category label
pub const CATEGORY_KEY: &str = "category";
/// Context key for the subcategory title
pub const SUBCATEGORY_KEY: &str = "subcategory";
/// Context key for the product page URL as it was linked
pub const PRODUCT_URL_KEY: &str = "url";

/// Metadata carried from a parent unit to its children
///
/// A context is never mutated in place; [`CrawlContext::with`] returns an
/// extended copy for the child.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlContext {
    entries: BTreeMap<String, String>,
}

impl CrawlContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of this context with `key` set to `value`
    pub fn with(&self, key: &str, value: impl Into<String>) -> Self {
        let mut entries = self.entries.clone();
        entries.insert(key.to_string(), value.into());
        Self { entries }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn category(&self) -> Option<&str> {
        self.get(CATEGORY_KEY)
    }

    pub fn subcategory(&self) -> Option<&str> {
        self.get(SUBCATEGORY_KEY)
    }

    pub fn product_url(&self) -> Option<&str> {
        self.get(PRODUCT_URL_KEY)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A pending fetch-and-parse task
#[derive(Debug, Clone)]
pub struct WorkUnit {
    /// Page to render
    pub url: Url,

    /// Which parser handles the rendered page
    pub stage: Stage,

    /// Metadata inherited from ancestors
    pub context: CrawlContext,

    /// How the renderer decides the page is ready
    pub wait: WaitStrategy,

    /// Number of times this unit has been retried
    pub retry_count: u32,

    /// Scheduling precedence; higher values are rendered first
    pub priority: i32,

    /// Accept this unit even if its URL was already scheduled
    pub bypass_dedup: bool,
}

impl WorkUnit {
    /// Creates a fresh unit with default priority and no retries
    pub fn new(url: Url, stage: Stage, context: CrawlContext, wait: WaitStrategy) -> Self {
        Self {
            url,
            stage,
            context,
            wait,
            retry_count: 0,
            priority: 0,
            bypass_dedup: false,
        }
    }

    /// Returns the resubmission of this unit after a failure
    ///
    /// The copy keeps the same URL and stage (same dedup identity), counts one
    /// more retry, shifts its priority by `priority_adjust`, and bypasses dedup
    /// so the frontier accepts it again.
    pub fn retried(&self, priority_adjust: i32) -> Self {
        Self {
            retry_count: self.retry_count + 1,
            priority: self.priority.saturating_add(priority_adjust),
            bypass_dedup: true,
            ..self.clone()
        }
    }

    /// Key identifying this unit for duplicate detection
    pub fn dedup_key(&self) -> String {
        format!("{}|{}", self.stage, crate::url::dedup_key(&self.url))
    }
}
