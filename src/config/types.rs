use serde::Deserialize;

/// Main configuration structure for Shelf-Scout
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub render: RenderConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Traversal configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Start URL of the crawl
    #[serde(rename = "seed-url")]
    pub seed_url: String,

    /// Host patterns child requests may target (e.g. "www.example.com" or "*.example.com")
    #[serde(rename = "allowed-domains", default)]
    pub allowed_domains: Vec<String>,

    /// Category labels from the home navigation that should be followed
    pub categories: Vec<String>,

    /// Maximum number of work units rendered at the same time
    #[serde(rename = "max-concurrent-renders", default = "default_max_concurrent_renders")]
    pub max_concurrent_renders: u32,

    /// Stage the seed URL is parsed as
    #[serde(rename = "start-stage", default)]
    pub start_stage: StartStage,
}

/// Entry point of the traversal
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StartStage {
    /// Start from the site home page and walk the category navigation
    #[default]
    Home,
    /// Start from a single product listing page
    ProductList,
}

/// Which rendering backend drives page fetches
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BackendKind {
    /// Plain HTTP fetch, no script execution
    #[default]
    Http,
    /// Headless Chromium (requires the `chromium` feature)
    Chromium,
}

/// Renderer timing configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RenderConfig {
    #[serde(default)]
    pub backend: BackendKind,

    /// Maximum time to wait for a selector to appear (milliseconds)
    #[serde(rename = "selector-wait-timeout-ms", default = "default_selector_wait_timeout_ms")]
    pub selector_wait_timeout_ms: u64,

    /// Interval between DOM polls while waiting for a selector (milliseconds)
    #[serde(rename = "selector-poll-interval-ms", default = "default_selector_poll_interval_ms")]
    pub selector_poll_interval_ms: u64,

    /// Wait after each scroll round before recounting items (milliseconds)
    #[serde(
        rename = "scroll-convergence-interval-ms",
        default = "default_scroll_convergence_interval_ms"
    )]
    pub scroll_convergence_interval_ms: u64,

    /// Upper bound on scroll rounds for a single listing page
    #[serde(
        rename = "scroll-convergence-max-rounds",
        default = "default_scroll_convergence_max_rounds"
    )]
    pub scroll_convergence_max_rounds: u32,

    /// Hard cap on total render time for one fetch (milliseconds)
    #[serde(rename = "fetch-timeout-ms", default = "default_fetch_timeout_ms")]
    pub fetch_timeout_ms: u64,

    /// Fixed delay after the home navigation appears (milliseconds)
    #[serde(rename = "home-settle-ms", default = "default_home_settle_ms")]
    pub home_settle_ms: u64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            selector_wait_timeout_ms: default_selector_wait_timeout_ms(),
            selector_poll_interval_ms: default_selector_poll_interval_ms(),
            scroll_convergence_interval_ms: default_scroll_convergence_interval_ms(),
            scroll_convergence_max_rounds: default_scroll_convergence_max_rounds(),
            fetch_timeout_ms: default_fetch_timeout_ms(),
            home_settle_ms: default_home_settle_ms(),
        }
    }
}

/// Retry policy configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of retries per work unit
    #[serde(rename = "max-retries", default = "default_max_retries")]
    pub max_retries: u32,

    /// HTTP status codes eligible for retry; other non-2xx codes are ignored
    #[serde(rename = "retryable-status-codes", default = "default_retryable_status_codes")]
    pub retryable_status_codes: Vec<u16>,

    /// Added to a unit's priority on every retry
    #[serde(rename = "priority-adjust", default = "default_priority_adjust")]
    pub priority_adjust: i32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            retryable_status_codes: default_retryable_status_codes(),
            priority_adjust: default_priority_adjust(),
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

impl UserAgentConfig {
    /// Formats the User-Agent header value
    ///
    /// Format: `CrawlerName/Version (+ContactURL; ContactEmail)`
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the JSON-lines product file
    #[serde(rename = "records-path", default = "default_records_path")]
    pub records_path: String,

    /// Path to the markdown summary file
    #[serde(rename = "summary-path", default = "default_summary_path")]
    pub summary_path: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            records_path: default_records_path(),
            summary_path: default_summary_path(),
        }
    }
}

fn default_max_concurrent_renders() -> u32 {
    8
}

fn default_selector_wait_timeout_ms() -> u64 {
    30_000
}

fn default_selector_poll_interval_ms() -> u64 {
    500
}

fn default_scroll_convergence_interval_ms() -> u64 {
    3_000
}

fn default_scroll_convergence_max_rounds() -> u32 {
    40
}

fn default_fetch_timeout_ms() -> u64 {
    180_000
}

fn default_home_settle_ms() -> u64 {
    1_000
}

fn default_max_retries() -> u32 {
    3
}

fn default_retryable_status_codes() -> Vec<u16> {
    vec![500, 502, 503, 504, 522, 524, 408, 429]
}

fn default_priority_adjust() -> i32 {
    -1
}

fn default_records_path() -> String {
    "./products.jsonl".to_string()
}

fn default_summary_path() -> String {
    "./summary.md".to_string()
}
