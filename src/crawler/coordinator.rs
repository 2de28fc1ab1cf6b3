//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the main crawl loop, which:
//! - Seeds the frontier from the configured start stage
//! - Renders up to `max-concurrent-renders` work units at once on a `JoinSet`
//! - Feeds children back into the frontier (offsite and duplicate units dropped)
//! - Forwards product records to the sink, the only writer
//! - Consults the retry policy for failed renders
//! - Returns the session report once nothing is queued or in flight

use crate::config::{BackendKind, Config};
use crate::crawler::retry::{FailureClass, RetryPolicy};
use crate::crawler::stages::{StageOutput, Traversal};
use crate::crawler::{Frontier, WorkUnit};
use crate::output::{JsonLinesSink, RecordSink, SessionReport};
use crate::render::{HttpBackend, RenderBackend, RenderError, Renderer};
use crate::state::CrawlSession;
use crate::url::is_allowed_host;
use crate::ScoutError;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;

/// Result of one spawned render task
enum TaskOutcome {
    Parsed { unit: WorkUnit, output: StageOutput },
    Failed { unit: WorkUnit, error: RenderError },
}

/// Main crawler coordinator structure
pub struct Coordinator {
    renderer: Arc<Renderer>,
    traversal: Arc<Traversal>,
    retry: RetryPolicy,
    frontier: Frontier,
    session: Arc<CrawlSession>,
    sink: Box<dyn RecordSink>,
    allowed_domains: Vec<String>,
    max_in_flight: usize,
}

impl Coordinator {
    /// Creates a new coordinator instance
    ///
    /// # Arguments
    ///
    /// * `config` - Validated crawler configuration
    /// * `renderer` - Renderer wrapping the chosen backend
    /// * `sink` - Destination for product records
    pub fn new(config: &Config, renderer: Renderer, sink: Box<dyn RecordSink>) -> Result<Self, ScoutError> {
        let traversal = Traversal::new(&config.crawler, &config.render)?;

        Ok(Self {
            renderer: Arc::new(renderer),
            traversal: Arc::new(traversal),
            retry: RetryPolicy::from_config(&config.retry),
            frontier: Frontier::new(),
            session: Arc::new(CrawlSession::new()),
            sink,
            allowed_domains: config.crawler.allowed_domains.clone(),
            max_in_flight: config.crawler.max_concurrent_renders.max(1) as usize,
        })
    }

    /// Counters of the current run
    pub fn session(&self) -> &Arc<CrawlSession> {
        &self.session
    }

    /// Runs the crawl to completion
    ///
    /// Failures of single pages or records never end the run; only a sink
    /// that cannot be flushed at the end does.
    pub async fn run(&mut self) -> Result<SessionReport, ScoutError> {
        self.session.reset();
        self.frontier = Frontier::new();
        let start_time = Instant::now();

        let seed = self.traversal.seed_unit();
        tracing::info!(
            "Starting crawl at {} ({} stage, {} backend, up to {} concurrent renders)",
            seed.url,
            seed.stage,
            self.renderer.backend_name(),
            self.max_in_flight
        );
        tracing::info!("Retry policy: {}", self.retry.describe());
        self.frontier.push(seed);

        let mut tasks = JoinSet::new();
        let mut completed: u64 = 0;

        loop {
            while tasks.len() < self.max_in_flight {
                let Some(unit) = self.frontier.pop() else {
                    break;
                };
                self.spawn_render(&mut tasks, unit);
            }

            match tasks.join_next().await {
                Some(Ok(TaskOutcome::Parsed { unit, output })) => self.handle_output(&unit, output),
                Some(Ok(TaskOutcome::Failed { unit, error })) => self.handle_failure(&unit, &error),
                Some(Err(e)) => {
                    tracing::error!("Render task failed: {}", e);
                    self.session.record_stage_fault();
                }
                None => {
                    tracing::info!("Frontier is empty, crawl complete");
                    break;
                }
            }

            completed += 1;
            if completed % 10 == 0 {
                let elapsed = start_time.elapsed();
                tracing::info!(
                    "Progress: {} units done, {} queued, {} in flight, {} records, {:.2} pages/sec",
                    completed,
                    self.frontier.len(),
                    tasks.len(),
                    self.session.records_emitted(),
                    completed as f64 / elapsed.as_secs_f64().max(f64::EPSILON)
                );
            }
        }

        self.sink.finish()?;

        let mut report = self.session.report();
        report.seed_url = self.traversal.seed_url().to_string();
        report.backend = self.renderer.backend_name().to_string();

        tracing::info!(
            "Crawl completed in {:?}: {} pages processed, {} records emitted, {} failed records, {} retries, {} abandoned",
            start_time.elapsed(),
            report.units_processed,
            report.records_emitted,
            report.failed_records,
            report.retries_scheduled,
            report.units_abandoned
        );

        Ok(report)
    }

    fn spawn_render(&self, tasks: &mut JoinSet<TaskOutcome>, unit: WorkUnit) {
        let renderer = Arc::clone(&self.renderer);
        let traversal = Arc::clone(&self.traversal);
        let session = Arc::clone(&self.session);

        tracing::debug!("Rendering {} page {} (retry {})", unit.stage, unit.url, unit.retry_count);

        tasks.spawn(async move {
            match renderer.render(&unit.url, &unit.wait).await {
                Ok(page) => {
                    session.record_processed();
                    let output = traversal.parse(&unit, &page, &session);
                    TaskOutcome::Parsed { unit, output }
                }
                Err(error) => TaskOutcome::Failed { unit, error },
            }
        });
    }

    fn handle_output(&mut self, unit: &WorkUnit, output: StageOutput) {
        if output.fault.is_some() {
            self.session.record_stage_fault();
        }

        for child in output.children {
            self.enqueue(child, unit);
        }

        for record in output.records {
            match self.sink.accept(&record) {
                Ok(()) => self.session.record_emitted(record.category.as_deref()),
                Err(e) => {
                    self.session.record_failed();
                    tracing::error!("Failed to write record for {}: {}", record.url, e);
                }
            }
        }
    }

    fn handle_failure(&mut self, unit: &WorkUnit, error: &RenderError) {
        if let Some(retry) = self.retry.on_failure(unit, error) {
            self.session.record_retry();
            self.frontier.push(retry);
            return;
        }

        match self.retry.classify(error) {
            FailureClass::Ignored => self.session.record_ignored(),
            FailureClass::Retryable => self.session.record_abandoned(),
        }
    }

    /// Queues a child unit unless it is offsite or a duplicate
    fn enqueue(&mut self, child: WorkUnit, parent: &WorkUnit) {
        if !is_allowed_host(&child.url, &self.allowed_domains) {
            self.session.record_offsite();
            tracing::debug!("Filtered offsite request to {} from {}", child.url, parent.url);
            return;
        }

        let url = child.url.clone();
        if !self.frontier.push(child) {
            self.session.record_duplicate();
            tracing::debug!("Filtered duplicate request to {}", url);
        }
    }
}

/// Builds the renderer for the configured backend
pub async fn build_renderer(config: &Config) -> Result<Renderer, ScoutError> {
    let fetch_timeout = Duration::from_millis(config.render.fetch_timeout_ms);

    let backend: Arc<dyn RenderBackend> = match config.render.backend {
        BackendKind::Http => Arc::new(HttpBackend::new(&config.user_agent, fetch_timeout)?),
        BackendKind::Chromium => launch_chromium(config).await?,
    };

    Ok(Renderer::new(
        backend,
        config.crawler.max_concurrent_renders as usize,
        Duration::from_millis(config.render.selector_poll_interval_ms),
        fetch_timeout,
    ))
}

#[cfg(feature = "chromium")]
async fn launch_chromium(config: &Config) -> Result<Arc<dyn RenderBackend>, ScoutError> {
    let backend = crate::render::ChromiumBackend::launch(&config.user_agent.header_value()).await?;
    Ok(Arc::new(backend))
}

#[cfg(not(feature = "chromium"))]
async fn launch_chromium(_config: &Config) -> Result<Arc<dyn RenderBackend>, ScoutError> {
    Err(crate::ConfigError::Validation(
        "backend \"chromium\" requires building with the `chromium` feature".to_string(),
    )
    .into())
}

/// Runs a complete crawl, writing records to `records_path`
pub async fn run_crawl(config: &Config, records_path: &Path) -> Result<SessionReport, ScoutError> {
    let renderer = build_renderer(config).await?;
    let sink = JsonLinesSink::create(records_path)?;

    let mut coordinator = Coordinator::new(config, renderer, Box::new(sink))?;
    coordinator.run().await
}
