//! Shelf-Scout: a grocery catalogue crawler
//!
//! This crate walks a retail site's category → subcategory → product hierarchy,
//! renders script-heavy pages through a pluggable browser backend, and turns the
//! scraped product pages into clean, typed product records.

pub mod config;
pub mod crawler;
pub mod extract;
pub mod normalize;
pub mod output;
pub mod render;
pub mod state;
pub mod url;

use thiserror::Error;

/// Main error type for Shelf-Scout operations
#[derive(Debug, Error)]
pub enum ScoutError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Render error: {0}")]
    Render(#[from] render::RenderError),

    #[error("Sink error: {0}")]
    Sink(#[from] output::SinkError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid domain pattern: {0}")]
    InvalidPattern(String),
}

/// Result type alias for Shelf-Scout operations
pub type Result<T> = std::result::Result<T, ScoutError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{Stage, WorkUnit};
pub use normalize::{normalize, NormalizationError, ProductRecord};
pub use state::CrawlSession;
