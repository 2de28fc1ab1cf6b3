//! Renderer adapter
//!
//! Drives a backend page session through a wait strategy and returns the final
//! HTML. Every fetch:
//! 1. Acquires a permit from the global render semaphore
//! 2. Opens a fresh page session
//! 3. Navigates, rejecting non-2xx statuses
//! 4. Runs the wait steps in order
//! 5. Captures the HTML
//! 6. Closes the session, whatever happened in steps 3-5
//!
//! Steps 2-5 run under the global per-fetch timeout.

use crate::render::{
    PageSession, RenderBackend, RenderError, WaitStep, WaitStrategy, SCROLL_TO_BOTTOM_SCRIPT,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use url::Url;

/// A fully rendered page
#[derive(Debug, Clone)]
pub struct RenderedPage {
    /// Serialized DOM after all wait steps
    pub html: String,
    /// URL after redirects; relative links resolve against this
    pub final_url: Url,
    /// HTTP status of the main document
    pub status: u16,
}

/// How a scroll-until-stable step ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollOutcome {
    /// The item count stopped growing
    Converged { rounds: u32, items: usize },
    /// The round cap was hit while the count was still growing
    RoundCapReached { rounds: u32, items: usize },
}

impl ScrollOutcome {
    /// Number of items matched when scrolling stopped
    pub fn items(&self) -> usize {
        match self {
            Self::Converged { items, .. } | Self::RoundCapReached { items, .. } => *items,
        }
    }
}

/// Renders pages through a backend, one isolated session per fetch
pub struct Renderer {
    backend: Arc<dyn RenderBackend>,
    permits: Arc<Semaphore>,
    poll_interval: Duration,
    fetch_timeout: Duration,
}

impl Renderer {
    /// Creates a renderer
    ///
    /// # Arguments
    ///
    /// * `backend` - Where page sessions come from
    /// * `max_open_pages` - Maximum number of sessions open at once
    /// * `poll_interval` - Delay between DOM polls in selector waits
    /// * `fetch_timeout` - Hard cap on one fetch, including every wait step
    pub fn new(
        backend: Arc<dyn RenderBackend>,
        max_open_pages: usize,
        poll_interval: Duration,
        fetch_timeout: Duration,
    ) -> Self {
        Self {
            backend,
            permits: Arc::new(Semaphore::new(max_open_pages.max(1))),
            poll_interval,
            fetch_timeout,
        }
    }

    /// Name of the underlying backend
    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Renders `url`, honouring `wait`, and returns the final HTML
    ///
    /// # Errors
    ///
    /// * `RenderError::Timeout` - a selector never appeared, or the whole fetch
    ///   exceeded the per-fetch timeout
    /// * `RenderError::HttpStatus` - the main document answered with a non-2xx status
    /// * `RenderError::Navigation` / `RenderError::Browser` - backend failures
    pub async fn render(&self, url: &Url, wait: &WaitStrategy) -> Result<RenderedPage, RenderError> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| RenderError::Browser("render pool closed".to_string()))?;

        let started = Instant::now();
        let mut session: Option<Box<dyn PageSession>> = None;

        let fetch = async {
            let page = session.insert(self.backend.open_page().await?);
            self.drive(page.as_mut(), url, wait).await
        };

        let result = match tokio::time::timeout(self.fetch_timeout, fetch).await {
            Ok(result) => result,
            Err(_) => Err(RenderError::Timeout {
                url: url.to_string(),
                elapsed: started.elapsed(),
            }),
        };

        if let Some(mut page) = session.take() {
            page.close().await;
        }

        if let Ok(rendered) = &result {
            tracing::debug!(
                "Rendered {} ({} bytes) in {:?}",
                rendered.final_url,
                rendered.html.len(),
                started.elapsed()
            );
        }

        result
    }

    async fn drive(
        &self,
        page: &mut dyn PageSession,
        url: &Url,
        wait: &WaitStrategy,
    ) -> Result<RenderedPage, RenderError> {
        let navigation = page.navigate(url).await?;

        if !(200..300).contains(&navigation.status) {
            return Err(RenderError::HttpStatus {
                url: url.to_string(),
                status: navigation.status,
            });
        }

        for step in wait.steps() {
            match step {
                WaitStep::Selector { selector, timeout } => {
                    wait_for_selector(page, url, selector, *timeout, self.poll_interval).await?;
                }
                WaitStep::Delay(delay) => tokio::time::sleep(*delay).await,
                WaitStep::ScrollUntilStable {
                    item_selector,
                    interval,
                    max_rounds,
                } => {
                    let outcome =
                        scroll_until_stable(page, item_selector, *interval, *max_rounds).await?;
                    if let ScrollOutcome::RoundCapReached { rounds, items } = outcome {
                        tracing::warn!(
                            "Scrolling {} stopped at the {}-round cap with {} items still growing",
                            url,
                            rounds,
                            items
                        );
                    }
                }
            }
        }

        let html = page.html().await?;

        Ok(RenderedPage {
            html,
            final_url: navigation.final_url,
            status: navigation.status,
        })
    }
}

/// Polls the page until `selector` matches, or fails with a timeout
///
/// Returns the number of matches on success.
pub async fn wait_for_selector(
    page: &mut dyn PageSession,
    url: &Url,
    selector: &str,
    timeout: Duration,
    poll_interval: Duration,
) -> Result<usize, RenderError> {
    let started = Instant::now();

    loop {
        let count = page.count_matches(selector).await?;
        if count > 0 {
            tracing::trace!("Selector '{}' matched {} elements on {}", selector, count, url);
            return Ok(count);
        }

        let elapsed = started.elapsed();
        if elapsed >= timeout {
            tracing::debug!("Selector '{}' never appeared on {}", selector, url);
            return Err(RenderError::Timeout {
                url: url.to_string(),
                elapsed,
            });
        }

        tokio::time::sleep(poll_interval.min(timeout - elapsed)).await;
    }
}

/// Scrolls to the bottom repeatedly until the item count stops growing
///
/// Each round scrolls, waits `interval`, and recounts `item_selector`. The loop
/// stops at the first round that adds no items, or after `max_rounds` rounds.
pub async fn scroll_until_stable(
    page: &mut dyn PageSession,
    item_selector: &str,
    interval: Duration,
    max_rounds: u32,
) -> Result<ScrollOutcome, RenderError> {
    let mut items = page.count_matches(item_selector).await?;

    for round in 1..=max_rounds {
        page.run_script(SCROLL_TO_BOTTOM_SCRIPT).await?;
        tokio::time::sleep(interval).await;

        let current = page.count_matches(item_selector).await?;
        tracing::trace!("Scroll round {}: {} -> {} items", round, items, current);

        if current <= items {
            return Ok(ScrollOutcome::Converged {
                rounds: round,
                items: current,
            });
        }
        items = current;
    }

    Ok(ScrollOutcome::RoundCapReached {
        rounds: max_rounds,
        items,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::Navigation;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    /// Page whose match count grows by `growth` per scroll, up to `cap`
    struct FakePage {
        status: u16,
        initial: usize,
        growth: usize,
        cap: usize,
        polls_until_ready: usize,
        polls: usize,
        scrolls: Arc<AtomicUsize>,
        closed: Arc<AtomicBool>,
    }

    #[async_trait]
    impl PageSession for FakePage {
        async fn navigate(&mut self, url: &Url) -> Result<Navigation, RenderError> {
            Ok(Navigation {
                status: self.status,
                final_url: url.clone(),
            })
        }

        async fn count_matches(&mut self, _selector: &str) -> Result<usize, RenderError> {
            self.polls += 1;
            if self.polls <= self.polls_until_ready {
                return Ok(0);
            }
            let scrolls = self.scrolls.load(Ordering::SeqCst);
            Ok((self.initial + scrolls * self.growth).min(self.cap))
        }

        async fn run_script(&mut self, _script: &str) -> Result<(), RenderError> {
            self.scrolls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn html(&mut self) -> Result<String, RenderError> {
            Ok("<html><body>rendered</body></html>".to_string())
        }

        async fn close(&mut self) {
            self.closed.store(true, Ordering::SeqCst);
        }
    }

    struct FakeBackend {
        status: u16,
        growth: usize,
        cap: usize,
        polls_until_ready: usize,
        scrolls: Arc<AtomicUsize>,
        closed: Arc<AtomicBool>,
    }

    impl FakeBackend {
        fn new(status: u16) -> Self {
            Self {
                status,
                growth: 0,
                cap: usize::MAX,
                polls_until_ready: 0,
                scrolls: Arc::new(AtomicUsize::new(0)),
                closed: Arc::new(AtomicBool::new(false)),
            }
        }

        fn page(&self) -> FakePage {
            FakePage {
                status: self.status,
                initial: 5,
                growth: self.growth,
                cap: self.cap,
                polls_until_ready: self.polls_until_ready,
                polls: 0,
                scrolls: self.scrolls.clone(),
                closed: self.closed.clone(),
            }
        }
    }

    #[async_trait]
    impl RenderBackend for FakeBackend {
        async fn open_page(&self) -> Result<Box<dyn PageSession>, RenderError> {
            Ok(Box::new(self.page()))
        }

        fn name(&self) -> &'static str {
            "fake"
        }
    }

    fn url() -> Url {
        Url::parse("https://shop.example.com/en/beverages").unwrap()
    }

    fn renderer(backend: FakeBackend, fetch_timeout: Duration) -> Renderer {
        Renderer::new(
            Arc::new(backend),
            2,
            Duration::from_millis(1),
            fetch_timeout,
        )
    }

    #[tokio::test]
    async fn test_wait_for_selector_polls_until_match() {
        let mut backend = FakeBackend::new(200);
        backend.polls_until_ready = 3;
        let mut page = backend.page();

        let count = wait_for_selector(
            &mut page,
            &url(),
            ".product-item",
            Duration::from_secs(1),
            Duration::from_millis(1),
        )
        .await
        .unwrap();

        assert_eq!(count, 5);
        assert_eq!(page.polls, 4);
    }

    #[tokio::test]
    async fn test_wait_for_selector_times_out() {
        let mut backend = FakeBackend::new(200);
        backend.polls_until_ready = usize::MAX;
        let mut page = backend.page();

        let result = wait_for_selector(
            &mut page,
            &url(),
            ".never",
            Duration::from_millis(20),
            Duration::from_millis(5),
        )
        .await;

        assert!(matches!(result, Err(RenderError::Timeout { .. })));
    }

    #[tokio::test]
    async fn test_scroll_converges_when_count_stops_growing() {
        let mut backend = FakeBackend::new(200);
        backend.growth = 10;
        backend.cap = 25;
        let mut page = backend.page();

        let outcome = scroll_until_stable(&mut page, ".product-item a", Duration::from_millis(1), 50)
            .await
            .unwrap();

        // 5 -> 15 -> 25 -> 25
        assert_eq!(outcome, ScrollOutcome::Converged { rounds: 3, items: 25 });
        assert_eq!(backend.scrolls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_scroll_stops_at_round_cap_on_endless_page() {
        let mut backend = FakeBackend::new(200);
        backend.growth = 1;
        let mut page = backend.page();

        let outcome = scroll_until_stable(&mut page, ".product-item a", Duration::from_millis(1), 7)
            .await
            .unwrap();

        assert_eq!(outcome, ScrollOutcome::RoundCapReached { rounds: 7, items: 12 });
        assert_eq!(backend.scrolls.load(Ordering::SeqCst), 7);
    }

    #[tokio::test]
    async fn test_render_success_closes_session() {
        let backend = FakeBackend::new(200);
        let closed = backend.closed.clone();
        let renderer = renderer(backend, Duration::from_secs(5));

        let wait = WaitStrategy::for_selector(".product-item", Duration::from_secs(1))
            .then_scroll_until_stable(".product-item a", Duration::from_millis(1), 3);
        let page = renderer.render(&url(), &wait).await.unwrap();

        assert_eq!(page.status, 200);
        assert_eq!(page.final_url, url());
        assert!(page.html.contains("rendered"));
        assert!(closed.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_render_rejects_non_success_status() {
        let backend = FakeBackend::new(503);
        let closed = backend.closed.clone();
        let renderer = renderer(backend, Duration::from_secs(5));

        let result = renderer.render(&url(), &WaitStrategy::immediate()).await;

        assert!(matches!(
            result,
            Err(RenderError::HttpStatus { status: 503, .. })
        ));
        assert!(closed.load(Ordering::SeqCst));
    }

    /// Backend whose tabs take far longer to open than any fetch may last
    struct StalledBackend;

    #[async_trait]
    impl RenderBackend for StalledBackend {
        async fn open_page(&self) -> Result<Box<dyn PageSession>, RenderError> {
            tokio::time::sleep(Duration::from_secs(3)).await;
            Err(RenderError::Browser("tab never opened".to_string()))
        }

        fn name(&self) -> &'static str {
            "stalled"
        }
    }

    #[tokio::test]
    async fn test_render_global_timeout_bounds_page_open() {
        let renderer = Renderer::new(
            Arc::new(StalledBackend),
            1,
            Duration::from_millis(1),
            Duration::from_millis(50),
        );

        let started = Instant::now();
        let result = renderer.render(&url(), &WaitStrategy::immediate()).await;

        assert!(matches!(result, Err(RenderError::Timeout { .. })));
        assert!(started.elapsed() < Duration::from_millis(1000));

        // The permit came back, so the next fetch is not stuck behind the first
        let started = Instant::now();
        let _ = renderer.render(&url(), &WaitStrategy::immediate()).await;
        assert!(started.elapsed() < Duration::from_millis(1000));
    }

    #[tokio::test]
    async fn test_render_global_timeout_bounds_wait_steps() {
        let backend = FakeBackend::new(200);
        let closed = backend.closed.clone();
        let renderer = renderer(backend, Duration::from_millis(30));

        let wait = WaitStrategy::immediate().then_delay(Duration::from_secs(10));
        let result = renderer.render(&url(), &wait).await;

        assert!(matches!(result, Err(RenderError::Timeout { .. })));
        assert!(closed.load(Ordering::SeqCst));
    }
}
