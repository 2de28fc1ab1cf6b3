//! Output module for product records and crawl reports
//!
//! This module handles:
//! - Streaming product records to a sink (JSON lines)
//! - Printing end-of-run statistics
//! - Generating a markdown summary of the run

mod jsonl;
mod markdown;
pub mod stats;
mod traits;

pub use jsonl::JsonLinesSink;
pub use markdown::{format_markdown_summary, generate_markdown_summary};
pub use stats::print_statistics;
pub use traits::{MemorySink, RecordSink, SessionReport, SinkError, SinkResult};
