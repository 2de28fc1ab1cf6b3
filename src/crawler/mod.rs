//! Crawler module: the traversal engine
//!
//! This module contains the core crawling logic, including:
//! - Work units and the stages they belong to
//! - The priority frontier with duplicate suppression
//! - The retry policy for failed renders
//! - Stage parsers that turn rendered pages into children and records
//! - Overall crawl coordination

mod coordinator;
mod frontier;
mod retry;
mod stages;
mod work_unit;

pub use coordinator::{build_renderer, run_crawl, Coordinator};
pub use frontier::Frontier;
pub use retry::{FailureClass, RetryPolicy};
pub use stages::{StageFault, StageOutput, Traversal};
pub use work_unit::{
    CrawlContext, Stage, WorkUnit, CATEGORY_KEY, PRODUCT_URL_KEY, SUBCATEGORY_KEY,
};

use crate::config::Config;
use crate::output::SessionReport;
use crate::ScoutError;
use std::path::Path;

/// Runs a complete crawl operation
///
/// This is the main entry point for starting a crawl. It will:
/// 1. Build the renderer for the configured backend
/// 2. Open the JSON-lines record sink at `records_path`
/// 3. Walk the site from the seed until the frontier drains
/// 4. Return the session report
pub async fn crawl(config: &Config, records_path: &Path) -> Result<SessionReport, ScoutError> {
    run_crawl(config, records_path).await
}
