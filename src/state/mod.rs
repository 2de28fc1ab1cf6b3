//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `CrawlSession`: run-wide counters (processed units, retries, failed
//!   records, ...) shared by the coordinator and its render tasks

mod session;

pub use session::CrawlSession;
