//! Rendering module: turns a URL plus a wait strategy into final page HTML
//!
//! The crawl never talks to a browser directly. It asks a [`Renderer`] for a
//! page, and the renderer drives a [`RenderBackend`] through the unit's
//! [`WaitStrategy`]:
//!
//! - wait for a selector (polling the DOM)
//! - wait a fixed delay
//! - scroll until the number of listed items stops growing
//!
//! Backends:
//! - [`HttpBackend`]: plain HTTP fetch via reqwest (no script execution)
//! - `ChromiumBackend`: headless Chromium, behind the `chromium` feature

mod adapter;
#[cfg(feature = "chromium")]
mod chromium;
mod http;

pub use adapter::{scroll_until_stable, wait_for_selector, RenderedPage, Renderer, ScrollOutcome};
#[cfg(feature = "chromium")]
pub use chromium::ChromiumBackend;
pub use http::HttpBackend;

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// In-page script that scrolls the document to its end, triggering lazy loading
pub const SCROLL_TO_BOTTOM_SCRIPT: &str = "window.scrollBy(0, document.body.scrollHeight)";

/// Errors surfaced by the rendering layer
#[derive(Debug, Clone, Error)]
pub enum RenderError {
    /// The page or one of its wait steps did not finish in time
    #[error("Render timed out after {elapsed:?} for {url}")]
    Timeout { url: String, elapsed: Duration },

    /// The browser could not load the page (DNS, connection, TLS, aborted navigation)
    #[error("Navigation failed for {url}: {message}")]
    Navigation { url: String, message: String },

    /// The server answered with a non-2xx status
    #[error("HTTP status {status} for {url}")]
    HttpStatus { url: String, status: u16 },

    /// The browser session itself misbehaved (launch failure, script error, closed target)
    #[error("Browser error: {0}")]
    Browser(String),

    /// A wait step carried a selector the DOM engine rejected
    #[error("Invalid selector '{0}'")]
    InvalidSelector(String),
}

impl RenderError {
    /// Returns true for timeouts
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Returns the HTTP status code, if this error carries one
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// One step of a wait strategy
#[derive(Debug, Clone, PartialEq)]
pub enum WaitStep {
    /// Poll until `selector` matches at least one element, or fail after `timeout`
    Selector { selector: String, timeout: Duration },

    /// Sleep for a fixed duration
    Delay(Duration),

    /// Scroll to the bottom until the count of `item_selector` matches stops growing
    ScrollUntilStable {
        item_selector: String,
        interval: Duration,
        max_rounds: u32,
    },
}

/// Declarative instructions for when a page counts as ready
///
/// Steps run strictly in order, so a structural wait always finishes before
/// lazy-load scrolling starts, which finishes before the HTML is captured.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WaitStrategy {
    steps: Vec<WaitStep>,
}

impl WaitStrategy {
    /// A strategy that captures the page as soon as navigation finishes
    pub fn immediate() -> Self {
        Self::default()
    }

    /// Starts a strategy with a selector wait
    pub fn for_selector(selector: impl Into<String>, timeout: Duration) -> Self {
        Self::immediate().then_selector(selector, timeout)
    }

    /// Appends a selector wait
    pub fn then_selector(mut self, selector: impl Into<String>, timeout: Duration) -> Self {
        self.steps.push(WaitStep::Selector {
            selector: selector.into(),
            timeout,
        });
        self
    }

    /// Appends a fixed delay
    pub fn then_delay(mut self, delay: Duration) -> Self {
        if !delay.is_zero() {
            self.steps.push(WaitStep::Delay(delay));
        }
        self
    }

    /// Appends a scroll-until-stable step
    pub fn then_scroll_until_stable(
        mut self,
        item_selector: impl Into<String>,
        interval: Duration,
        max_rounds: u32,
    ) -> Self {
        self.steps.push(WaitStep::ScrollUntilStable {
            item_selector: item_selector.into(),
            interval,
            max_rounds,
        });
        self
    }

    /// Returns the steps in execution order
    pub fn steps(&self) -> &[WaitStep] {
        &self.steps
    }
}

/// Outcome of navigating a page session
#[derive(Debug, Clone)]
pub struct Navigation {
    /// HTTP status of the main document
    pub status: u16,
    /// URL after redirects
    pub final_url: Url,
}

/// A single isolated page (tab, context, or request) inside a backend
///
/// The renderer opens one session per fetch and always calls
/// [`PageSession::close`] before returning, on success, error, and timeout.
#[async_trait]
pub trait PageSession: Send {
    /// Loads `url` into the page
    async fn navigate(&mut self, url: &Url) -> Result<Navigation, RenderError>;

    /// Counts elements currently matching `selector`
    async fn count_matches(&mut self, selector: &str) -> Result<usize, RenderError>;

    /// Runs a script in the page, discarding its result
    async fn run_script(&mut self, script: &str) -> Result<(), RenderError>;

    /// Returns the current serialized DOM
    async fn html(&mut self) -> Result<String, RenderError>;

    /// Releases the page; must be safe to call more than once
    async fn close(&mut self);
}

/// A source of fresh page sessions
#[async_trait]
pub trait RenderBackend: Send + Sync {
    /// Opens a new isolated page session
    async fn open_page(&self) -> Result<Box<dyn PageSession>, RenderError>;

    /// Short backend name for logs
    fn name(&self) -> &'static str;
}
