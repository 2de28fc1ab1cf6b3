//! Static HTTP rendering backend
//!
//! Fetches pages with reqwest and answers DOM queries by parsing the response
//! body. No scripts run, so a scroll round never loads more items and the
//! scroll-until-stable step converges after one round. Useful for server-rendered
//! sites, fixtures, and tests.

use crate::config::UserAgentConfig;
use crate::render::{Navigation, PageSession, RenderBackend, RenderError};
use async_trait::async_trait;
use reqwest::Client;
use scraper::{Html, Selector};
use std::time::Duration;
use url::Url;

/// Backend that renders pages with plain HTTP GET requests
pub struct HttpBackend {
    client: Client,
}

impl HttpBackend {
    /// Builds a backend with a configured HTTP client
    ///
    /// # Arguments
    ///
    /// * `user_agent` - Identification sent with every request
    /// * `request_timeout` - Timeout for a single GET, including the body
    ///
    /// # Example
    ///
    /// ```no_run
    /// use shelf_scout::config::UserAgentConfig;
    /// use shelf_scout::render::HttpBackend;
    /// use std::time::Duration;
    ///
    /// let config = UserAgentConfig {
    ///     crawler_name: "ShelfScout".to_string(),
    ///     crawler_version: "0.1".to_string(),
    ///     contact_url: "https://example.com/about".to_string(),
    ///     contact_email: "ops@example.com".to_string(),
    /// };
    ///
    /// let backend = HttpBackend::new(&config, Duration::from_secs(30)).unwrap();
    /// ```
    pub fn new(user_agent: &UserAgentConfig, request_timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(user_agent.header_value())
            .timeout(request_timeout)
            .connect_timeout(Duration::from_secs(10))
            .gzip(true)
            .brotli(true)
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl RenderBackend for HttpBackend {
    async fn open_page(&self) -> Result<Box<dyn PageSession>, RenderError> {
        Ok(Box::new(HttpPage {
            client: self.client.clone(),
            body: None,
        }))
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

/// One fetched document
struct HttpPage {
    client: Client,
    body: Option<String>,
}

impl HttpPage {
    fn body(&self) -> Result<&str, RenderError> {
        self.body
            .as_deref()
            .ok_or_else(|| RenderError::Browser("page queried before navigation".to_string()))
    }
}

#[async_trait]
impl PageSession for HttpPage {
    async fn navigate(&mut self, url: &Url) -> Result<Navigation, RenderError> {
        let response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(|e| classify_reqwest_error(url, e))?;

        let status = response.status().as_u16();
        let final_url = response.url().clone();

        let body = response
            .text()
            .await
            .map_err(|e| classify_reqwest_error(url, e))?;
        self.body = Some(body);

        Ok(Navigation { status, final_url })
    }

    async fn count_matches(&mut self, selector: &str) -> Result<usize, RenderError> {
        let parsed =
            Selector::parse(selector).map_err(|_| RenderError::InvalidSelector(selector.to_string()))?;
        let document = Html::parse_document(self.body()?);
        Ok(document.select(&parsed).count())
    }

    async fn run_script(&mut self, script: &str) -> Result<(), RenderError> {
        tracing::trace!("Static page ignores script ({} bytes)", script.len());
        Ok(())
    }

    async fn html(&mut self) -> Result<String, RenderError> {
        self.body().map(str::to_string)
    }

    async fn close(&mut self) {
        self.body = None;
    }
}

/// Maps a reqwest failure onto the render error taxonomy
fn classify_reqwest_error(url: &Url, error: reqwest::Error) -> RenderError {
    if error.is_timeout() {
        RenderError::Timeout {
            url: url.to_string(),
            elapsed: Duration::ZERO,
        }
    } else if error.is_connect() {
        RenderError::Navigation {
            url: url.to_string(),
            message: format!("Connection refused: {}", error),
        }
    } else {
        RenderError::Navigation {
            url: url.to_string(),
            message: error.to_string(),
        }
    }
}
