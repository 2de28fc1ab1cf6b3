//! Stage parsers: what each rendered page yields
//!
//! The crawl walks a fixed tree:
//!
//! ```text
//! Home ──> Category ──> Subcategory ──> ProductDetail ──> ProductRecord
//!                       ProductList ──┘
//! ```
//!
//! Every parser is synchronous and works on the HTML the renderer captured.
//! A fault while iterating a page's matches stops that page's iteration;
//! children found before the fault are kept.

use crate::config::{CrawlerConfig, RenderConfig, StartStage};
use crate::crawler::work_unit::{CATEGORY_KEY, PRODUCT_URL_KEY, SUBCATEGORY_KEY};
use crate::crawler::{CrawlContext, Stage, WorkUnit};
use crate::extract::{extract, own_text};
use crate::normalize::{normalize, ProductRecord};
use crate::render::{RenderedPage, WaitStrategy};
use crate::state::CrawlSession;
use crate::url::resolve_link;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Category links in the home page side navigation
pub const NAV_LINK_SELECTOR: &str = ".pc-sidenavbar a";
/// Label element inside a navigation link
pub const NAV_LABEL_SELECTOR: &str = "span";
/// One carousel per subcategory on a category page
pub const CAROUSEL_SELECTOR: &str = ".plp-carousel";
pub const CAROUSEL_TITLE_SELECTOR: &str = ".plp-carousel__title-name";
/// "View all" link of a carousel
pub const CAROUSEL_LINK_SELECTOR: &str = ".plp-carousel__link";
/// Product images in a listing grid; present once the grid has rendered
pub const LISTING_IMAGE_SELECTOR: &str = ".product-item-image";
/// Product tile links in a listing
pub const PRODUCT_LINK_SELECTOR: &str = ".product-item a";
/// Add-to-cart control; present once a detail page has hydrated
pub const ADD_TO_CART_SELECTOR: &str = ".product-Details-page-root .add-to-cart";

/// Unexpected fault while iterating a page's matches
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StageFault {
    #[error("{element} has no href")]
    MissingHref { element: &'static str },

    #[error("Cannot resolve link '{href}': {message}")]
    BadLink { href: String, message: String },

    #[error("Invalid selector '{0}'")]
    InvalidSelector(&'static str),
}

/// Everything a parsed page produced
#[derive(Debug, Default)]
pub struct StageOutput {
    /// Work units to schedule
    pub children: Vec<WorkUnit>,

    /// Normalized records, only from product detail pages
    pub records: Vec<ProductRecord>,

    /// Set when iteration stopped early
    pub fault: Option<StageFault>,
}

/// The crawl's stage machine, configured with the category allow-list and
/// the wait timings for each stage
#[derive(Debug, Clone)]
pub struct Traversal {
    seed_url: Url,
    start_stage: StartStage,
    categories: HashSet<String>,
    selector_timeout: Duration,
    home_settle: Duration,
    scroll_interval: Duration,
    scroll_max_rounds: u32,
}

impl Traversal {
    /// Builds the traversal from validated configuration
    pub fn new(crawler: &CrawlerConfig, render: &RenderConfig) -> Result<Self, url::ParseError> {
        Ok(Self {
            seed_url: Url::parse(&crawler.seed_url)?,
            start_stage: crawler.start_stage,
            categories: crawler
                .categories
                .iter()
                .map(|label| label.trim().to_string())
                .collect(),
            selector_timeout: Duration::from_millis(render.selector_wait_timeout_ms),
            home_settle: Duration::from_millis(render.home_settle_ms),
            scroll_interval: Duration::from_millis(render.scroll_convergence_interval_ms),
            scroll_max_rounds: render.scroll_convergence_max_rounds,
        })
    }

    pub fn seed_url(&self) -> &Url {
        &self.seed_url
    }

    /// The unit the crawl starts from
    pub fn seed_unit(&self) -> WorkUnit {
        match self.start_stage {
            StartStage::Home => WorkUnit::new(
                self.seed_url.clone(),
                Stage::Home,
                CrawlContext::new(),
                self.home_wait(),
            ),
            StartStage::ProductList => WorkUnit::new(
                self.seed_url.clone(),
                Stage::ProductList,
                CrawlContext::new(),
                self.listing_wait(),
            ),
        }
    }

    /// Navigation links, then a short settle delay
    pub fn home_wait(&self) -> WaitStrategy {
        WaitStrategy::for_selector(NAV_LINK_SELECTOR, self.selector_timeout).then_delay(self.home_settle)
    }

    pub fn category_wait(&self) -> WaitStrategy {
        WaitStrategy::for_selector(CAROUSEL_LINK_SELECTOR, self.selector_timeout)
    }

    /// Grid images, then scroll until the number of product links stops growing
    pub fn listing_wait(&self) -> WaitStrategy {
        WaitStrategy::for_selector(LISTING_IMAGE_SELECTOR, self.selector_timeout).then_scroll_until_stable(
            PRODUCT_LINK_SELECTOR,
            self.scroll_interval,
            self.scroll_max_rounds,
        )
    }

    pub fn detail_wait(&self) -> WaitStrategy {
        WaitStrategy::for_selector(ADD_TO_CART_SELECTOR, self.selector_timeout)
    }

    /// Returns true if `label` is in the category allow-list
    pub fn is_allowed_category(&self, label: &str) -> bool {
        self.categories.contains(label.trim())
    }

    /// Parses a rendered page according to the unit's stage
    ///
    /// Rejected product records are counted on `session`; faults are logged
    /// with the stage and URL and returned in [`StageOutput::fault`].
    pub fn parse(&self, unit: &WorkUnit, page: &RenderedPage, session: &CrawlSession) -> StageOutput {
        let mut output = StageOutput::default();
        let document = Html::parse_document(&page.html);

        let result = match unit.stage {
            Stage::Home => self.parse_home(unit, &document, &page.final_url, &mut output),
            Stage::Category => self.parse_category(unit, &document, &page.final_url, &mut output),
            Stage::Subcategory | Stage::ProductList => {
                self.parse_listing(unit, &document, &page.final_url, &mut output)
            }
            Stage::ProductDetail => {
                self.parse_detail(unit, page, session, &mut output);
                Ok(())
            }
        };

        if let Err(fault) = result {
            tracing::error!("Unexpected error in {} stage for {}: {}", unit.stage, unit.url, fault);
            output.fault = Some(fault);
        }

        tracing::debug!(
            "Parsed {} page {}: {} children, {} records",
            unit.stage,
            unit.url,
            output.children.len(),
            output.records.len()
        );
        output
    }

    fn parse_home(
        &self,
        unit: &WorkUnit,
        document: &Html,
        base: &Url,
        output: &mut StageOutput,
    ) -> Result<(), StageFault> {
        let links = selector(NAV_LINK_SELECTOR)?;
        let label_selector = selector(NAV_LABEL_SELECTOR)?;

        for link in document.select(&links) {
            let Some(label) = link
                .select(&label_selector)
                .next()
                .map(|span| own_text(span).trim().to_string())
            else {
                continue;
            };

            if !self.is_allowed_category(&label) {
                tracing::trace!("Skipping category '{}'", label);
                continue;
            }

            let url = link_target(link, NAV_LINK_SELECTOR, base)?;
            tracing::debug!("Category '{}' at {}", label, url);

            output.children.push(WorkUnit::new(
                url,
                Stage::Category,
                unit.context.with(CATEGORY_KEY, label),
                self.category_wait(),
            ));
        }

        Ok(())
    }

    fn parse_category(
        &self,
        unit: &WorkUnit,
        document: &Html,
        base: &Url,
        output: &mut StageOutput,
    ) -> Result<(), StageFault> {
        let carousels = selector(CAROUSEL_SELECTOR)?;
        let titles = selector(CAROUSEL_TITLE_SELECTOR)?;
        let view_all = selector(CAROUSEL_LINK_SELECTOR)?;

        for carousel in document.select(&carousels) {
            let title = carousel
                .select(&titles)
                .next()
                .map(|element| own_text(element).trim().to_string())
                .unwrap_or_default();

            let link = carousel.select(&view_all).next().ok_or(StageFault::MissingHref {
                element: CAROUSEL_LINK_SELECTOR,
            })?;
            let url = link_target(link, CAROUSEL_LINK_SELECTOR, base)?;
            tracing::debug!("Subcategory '{}' at {}", title, url);

            output.children.push(WorkUnit::new(
                url,
                Stage::Subcategory,
                unit.context.with(SUBCATEGORY_KEY, title),
                self.listing_wait(),
            ));
        }

        Ok(())
    }

    fn parse_listing(
        &self,
        unit: &WorkUnit,
        document: &Html,
        base: &Url,
        output: &mut StageOutput,
    ) -> Result<(), StageFault> {
        let products = selector(PRODUCT_LINK_SELECTOR)?;

        for link in document.select(&products) {
            let url = link_target(link, PRODUCT_LINK_SELECTOR, base)?;

            output.children.push(WorkUnit::new(
                url.clone(),
                Stage::ProductDetail,
                unit.context.with(PRODUCT_URL_KEY, url.as_str()),
                self.detail_wait(),
            ));
        }

        Ok(())
    }

    fn parse_detail(
        &self,
        unit: &WorkUnit,
        page: &RenderedPage,
        session: &CrawlSession,
        output: &mut StageOutput,
    ) {
        let raw = extract(&page.html, &unit.context, unit.url.as_str());

        match normalize(raw) {
            Ok(record) => output.records.push(record),
            Err(e) => {
                session.record_failed();
                tracing::warn!("Dropped product {}: {}", unit.url, e);
            }
        }
    }
}

fn selector(css: &'static str) -> Result<Selector, StageFault> {
    Selector::parse(css).map_err(|_| StageFault::InvalidSelector(css))
}

/// Resolves an element's href against the page URL
fn link_target(element: ElementRef<'_>, name: &'static str, base: &Url) -> Result<Url, StageFault> {
    let href = element
        .value()
        .attr("href")
        .ok_or(StageFault::MissingHref { element: name })?;

    resolve_link(href, base).map_err(|e| StageFault::BadLink {
        href: href.to_string(),
        message: e.to_string(),
    })
}
