//! Headless Chromium rendering backend
//!
//! Each page session gets its own browser context (separate cookies and
//! storage) holding one tab that starts at `about:blank`. The renderer closes
//! the session when the fetch ends, which disposes the context. The browser's
//! CDP event handler runs on its own tokio task for the lifetime of the backend.

use crate::render::{Navigation, PageSession, RenderBackend, RenderError};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::{EventResponseReceived, ResourceType};
use chromiumoxide::cdp::browser_protocol::target::{
    BrowserContextId, CreateBrowserContextParams, CreateTargetParams, DisposeBrowserContextParams,
};
use chromiumoxide::Page;
use futures::StreamExt;
use scraper::Selector;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use url::Url;

/// How long to wait for the main document response once navigation finished
const DOCUMENT_STATUS_WAIT: Duration = Duration::from_secs(2);

/// Backend that renders pages in headless Chromium
pub struct ChromiumBackend {
    browser: Arc<Browser>,
    handler: JoinHandle<()>,
}

impl ChromiumBackend {
    /// Launches a headless browser
    ///
    /// # Arguments
    ///
    /// * `user_agent` - User-Agent header value for every tab
    pub async fn launch(user_agent: &str) -> Result<Self, RenderError> {
        let config = BrowserConfig::builder()
            .arg(format!("--user-agent={}", user_agent))
            .build()
            .map_err(RenderError::Browser)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| RenderError::Browser(format!("failed to launch Chromium: {}", e)))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::debug!("Chromium handler stopped: {}", e);
                    break;
                }
            }
        });

        tracing::info!("Launched headless Chromium");
        Ok(Self {
            browser: Arc::new(browser),
            handler,
        })
    }
}

impl Drop for ChromiumBackend {
    fn drop(&mut self) {
        self.handler.abort();
    }
}

#[async_trait]
impl RenderBackend for ChromiumBackend {
    async fn open_page(&self) -> Result<Box<dyn PageSession>, RenderError> {
        let context_id = self
            .browser
            .execute(CreateBrowserContextParams::default())
            .await
            .map_err(|e| RenderError::Browser(format!("failed to create browser context: {}", e)))?
            .result
            .browser_context_id;

        let target = CreateTargetParams::builder()
            .url("about:blank")
            .browser_context_id(context_id.clone())
            .build()
            .map_err(RenderError::Browser)?;

        match self.browser.new_page(target).await {
            Ok(page) => Ok(Box::new(ChromiumPage {
                browser: Arc::clone(&self.browser),
                context_id: Some(context_id),
                page: Some(page),
            })),
            Err(e) => {
                dispose_context(&self.browser, context_id).await;
                Err(RenderError::Browser(format!("failed to open tab: {}", e)))
            }
        }
    }

    fn name(&self) -> &'static str {
        "chromium"
    }
}

async fn dispose_context(browser: &Browser, context_id: BrowserContextId) {
    if let Err(e) = browser
        .execute(DisposeBrowserContextParams::new(context_id))
        .await
    {
        tracing::warn!("Failed to dispose browser context: {}", e);
    }
}

/// Status of a response if it carries the main document
///
/// Chromium reports one `Network.responseReceived` per resource; the first
/// `Document` response of a navigation is the page itself (redirect hops do
/// not produce one).
fn document_status(resource_type: &ResourceType, status: i64) -> Option<u16> {
    if *resource_type != ResourceType::Document {
        return None;
    }
    u16::try_from(status).ok().filter(|code| *code >= 100)
}

/// Builds the script that counts `selector` matches in the live DOM
///
/// The selector is checked locally first so a malformed selector is reported
/// as such, and any failure of the script itself is a browser fault.
fn count_script(selector: &str) -> Result<String, RenderError> {
    Selector::parse(selector).map_err(|_| RenderError::InvalidSelector(selector.to_string()))?;
    let literal = serde_json::to_string(selector)
        .map_err(|_| RenderError::InvalidSelector(selector.to_string()))?;
    Ok(format!("document.querySelectorAll({}).length", literal))
}

/// One tab in its own browser context
struct ChromiumPage {
    browser: Arc<Browser>,
    context_id: Option<BrowserContextId>,
    page: Option<Page>,
}

impl ChromiumPage {
    fn page(&self) -> Result<&Page, RenderError> {
        self.page
            .as_ref()
            .ok_or_else(|| RenderError::Browser("tab already closed".to_string()))
    }
}

#[async_trait]
impl PageSession for ChromiumPage {
    async fn navigate(&mut self, url: &Url) -> Result<Navigation, RenderError> {
        let page = self.page()?;

        let mut responses = page
            .event_listener::<EventResponseReceived>()
            .await
            .map_err(|e| RenderError::Browser(format!("failed to watch responses: {}", e)))?;

        let (status_tx, status_rx) = tokio::sync::oneshot::channel::<u16>();
        let watcher = tokio::spawn(async move {
            while let Some(event) = responses.next().await {
                if let Some(status) = document_status(&event.r#type, event.response.status) {
                    let _ = status_tx.send(status);
                    break;
                }
            }
        });

        let navigated = page.goto(url.as_str()).await;
        let status = match navigated {
            Ok(_) => tokio::time::timeout(DOCUMENT_STATUS_WAIT, status_rx)
                .await
                .ok()
                .and_then(Result::ok),
            Err(_) => None,
        };
        watcher.abort();

        navigated.map_err(|e| RenderError::Navigation {
            url: url.to_string(),
            message: e.to_string(),
        })?;

        let status = status.unwrap_or_else(|| {
            tracing::debug!("No document response seen for {}, treating it as 200", url);
            200
        });

        let final_url = page
            .url()
            .await
            .ok()
            .flatten()
            .and_then(|u| Url::parse(&u).ok())
            .unwrap_or_else(|| url.clone());

        Ok(Navigation { status, final_url })
    }

    async fn count_matches(&mut self, selector: &str) -> Result<usize, RenderError> {
        let script = count_script(selector)?;

        let result = self
            .page()?
            .evaluate(script)
            .await
            .map_err(|e| RenderError::Browser(format!("selector count failed: {}", e)))?;

        result
            .into_value::<usize>()
            .map_err(|e| RenderError::Browser(format!("unexpected count result: {}", e)))
    }

    async fn run_script(&mut self, script: &str) -> Result<(), RenderError> {
        self.page()?
            .evaluate(script)
            .await
            .map(|_| ())
            .map_err(|e| RenderError::Browser(format!("script failed: {}", e)))
    }

    async fn html(&mut self) -> Result<String, RenderError> {
        self.page()?
            .content()
            .await
            .map_err(|e| RenderError::Browser(format!("failed to read DOM: {}", e)))
    }

    async fn close(&mut self) {
        if let Some(page) = self.page.take() {
            if let Err(e) = page.close().await {
                tracing::warn!("Failed to close tab: {}", e);
            }
        }
        if let Some(context_id) = self.context_id.take() {
            dispose_context(&self.browser, context_id).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::{FailureClass, RetryPolicy};

    #[test]
    fn test_document_status_reads_main_document() {
        assert_eq!(document_status(&ResourceType::Document, 404), Some(404));
        assert_eq!(document_status(&ResourceType::Document, 200), Some(200));
    }

    #[test]
    fn test_document_status_skips_subresources() {
        assert_eq!(document_status(&ResourceType::Image, 503), None);
        assert_eq!(document_status(&ResourceType::Script, 200), None);
    }

    #[test]
    fn test_document_status_rejects_bogus_codes() {
        assert_eq!(document_status(&ResourceType::Document, 0), None);
        assert_eq!(document_status(&ResourceType::Document, -1), None);
        assert_eq!(document_status(&ResourceType::Document, 70_000), None);
    }

    #[test]
    fn test_count_script_quotes_selector() {
        let script = count_script(r#"a[href="/en"]"#).unwrap();
        assert_eq!(script, r#"document.querySelectorAll("a[href=\"/en\"]").length"#);
    }

    #[test]
    fn test_malformed_selector_is_not_retried() {
        let error = count_script("[[").unwrap_err();
        assert!(matches!(error, RenderError::InvalidSelector(_)));
        assert_eq!(RetryPolicy::default().classify(&error), FailureClass::Ignored);
    }

    #[test]
    fn test_script_failures_are_retryable() {
        let error = RenderError::Browser("selector count failed: Execution context was destroyed".to_string());
        assert_eq!(RetryPolicy::default().classify(&error), FailureClass::Retryable);
    }

    mod live {
        use super::{ChromiumBackend, PageSession, RenderBackend, Url};
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        const COOKIE_ECHO: &str = r#"<html><body><script>
            document.write('<p id="jar">' + document.cookie + '</p>');
        </script></body></html>"#;

        async fn catalogue() -> MockServer {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .and(path("/set"))
                .respond_with(
                    ResponseTemplate::new(200)
                        .insert_header("set-cookie", "visited=yes; Path=/")
                        .insert_header("content-type", "text/html")
                        .set_body_string("<html><body>set</body></html>"),
                )
                .mount(&server)
                .await;
            Mock::given(method("GET"))
                .and(path("/jar"))
                .respond_with(
                    ResponseTemplate::new(200)
                        .insert_header("content-type", "text/html")
                        .set_body_string(COOKIE_ECHO),
                )
                .mount(&server)
                .await;
            Mock::given(method("GET"))
                .and(path("/gone"))
                .respond_with(
                    ResponseTemplate::new(404)
                        .insert_header("content-type", "text/html")
                        .set_body_string("<html><body>not found</body></html>"),
                )
                .mount(&server)
                .await;
            server
        }

        fn at(server: &MockServer, route: &str) -> Url {
            Url::parse(&format!("{}{}", server.uri(), route)).unwrap()
        }

        #[tokio::test]
        #[ignore = "needs a local Chromium"]
        async fn test_error_page_reports_its_status() {
            let server = catalogue().await;
            let backend = ChromiumBackend::launch("TestScout/1.0").await.unwrap();

            let mut page = backend.open_page().await.unwrap();
            let navigation = page.navigate(&at(&server, "/gone")).await.unwrap();
            page.close().await;

            assert_eq!(navigation.status, 404);
        }

        #[tokio::test]
        #[ignore = "needs a local Chromium"]
        async fn test_sessions_do_not_share_cookies() {
            let server = catalogue().await;
            let backend = ChromiumBackend::launch("TestScout/1.0").await.unwrap();

            let mut first = backend.open_page().await.unwrap();
            first.navigate(&at(&server, "/set")).await.unwrap();
            first.navigate(&at(&server, "/jar")).await.unwrap();
            let seen_by_first = first.html().await.unwrap();
            first.close().await;

            let mut second = backend.open_page().await.unwrap();
            second.navigate(&at(&server, "/jar")).await.unwrap();
            let seen_by_second = second.html().await.unwrap();
            second.close().await;

            assert!(seen_by_first.contains("visited=yes"));
            assert!(!seen_by_second.contains("visited=yes"));
        }
    }
}
