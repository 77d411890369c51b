//! Walking listing pages one at a time.
//!
//! [`Paginator`] is a small state machine:
//!
//! ```text
//! AtPage(n) --scan ok, n < max, next affordance--> AtPage(n + 1)
//! AtPage(n) --scan ok, n = max or no affordance---> Exhausted
//! AtPage(n) --n > max-----------------------------> Exhausted
//! AtPage(n) --listing fetch failed----------------> Aborted
//! ```
//!
//! Each call to [`Paginator::next_page`] fetches and scans exactly one
//! listing page. For linked listings every article page is fetched in turn;
//! an article that cannot be fetched is logged and skipped without affecting
//! the rest of the page.

use crate::config::{ListingConfig, ListingMode, SourceConfig};
use crate::error::Result;
use crate::extract::{compile, compile_opt, ArticleExtractor, CompiledSelectors};
use crate::models::{ArticleLocation, ArticleRecord, ListingPage};
use crate::outputs::html_cache::HtmlCache;
use crate::sources::PageSource;
use chrono::{Local, NaiveDateTime};
use itertools::Itertools;
use scraper::{Html, Selector};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, info, instrument, warn};
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaginatorState {
    AtPage(u32),
    Exhausted,
    Aborted,
}

/// The outcome of scanning one listing page.
#[derive(Debug)]
pub struct PageBatch {
    pub page: u32,
    pub records: Vec<ArticleRecord>,
    /// Article locations that could not be fetched.
    pub failed: Vec<ArticleLocation>,
}

#[derive(Debug, Clone, Copy)]
pub struct PaginatorSettings {
    pub start_page: u32,
    pub max_pages: u32,
    /// Pause between successive network requests. Zero disables it.
    pub per_item_delay: Duration,
}

/// A profile's listing configuration with every selector parsed.
#[derive(Debug, Clone)]
pub struct ListingPlan {
    kind: PlanKind,
    next_page: Option<Selector>,
}

#[derive(Debug, Clone)]
enum PlanKind {
    Linked {
        article_link: Selector,
        article: CompiledSelectors,
    },
    Inline {
        container: Option<Selector>,
        fields: CompiledSelectors,
    },
}

impl ListingPlan {
    pub fn compile(listing: &ListingConfig) -> Result<Self> {
        let kind = match &listing.mode {
            ListingMode::Linked { article_link, article } => PlanKind::Linked {
                article_link: compile(article_link)?,
                article: CompiledSelectors::compile(article)?,
            },
            ListingMode::Inline { container, fields } => PlanKind::Inline {
                container: compile_opt(container.as_deref())?,
                fields: CompiledSelectors::compile(fields)?,
            },
        };
        Ok(Self {
            kind,
            next_page: compile_opt(listing.next_page.as_deref())?,
        })
    }

    pub fn is_inline(&self) -> bool {
        matches!(self.kind, PlanKind::Inline { .. })
    }

    /// Selectors for per-article pages. `None` for inline plans.
    pub fn article_selectors(&self) -> Option<&CompiledSelectors> {
        match &self.kind {
            PlanKind::Linked { article, .. } => Some(article),
            PlanKind::Inline { .. } => None,
        }
    }

    /// Records carried directly by listing markup. Empty for linked plans.
    pub fn extract_inline(
        &self,
        extractor: &mut ArticleExtractor,
        content: &str,
        reference: NaiveDateTime,
    ) -> Vec<ArticleRecord> {
        match &self.kind {
            PlanKind::Inline {
                container: Some(container),
                fields,
            } => extractor.extract_containers(content, container, fields, reference),
            PlanKind::Inline {
                container: None,
                fields,
            } => extractor.extract_aligned(content, fields, reference),
            PlanKind::Linked { .. } => Vec::new(),
        }
    }

    /// Whether the listing offers a way to the next page.
    fn has_next(&self, document: &Html) -> bool {
        match &self.next_page {
            Some(selector) => document.select(selector).next().is_some(),
            None => true,
        }
    }

    /// Deduplicated article locations on a linked listing, resolved against its URL.
    fn article_locations(&self, listing: &ListingPage, document: &Html) -> Vec<ArticleLocation> {
        let PlanKind::Linked { article_link, .. } = &self.kind else {
            return Vec::new();
        };
        let base = Url::parse(&listing.url).ok();
        document
            .select(article_link)
            .filter_map(|el| el.value().attr("href"))
            .map(|href| {
                base.as_ref()
                    .and_then(|b| b.join(href).ok())
                    .map(String::from)
                    .unwrap_or_else(|| href.to_string())
            })
            .unique()
            .map(ArticleLocation)
            .collect()
    }
}

pub struct Paginator<'a, S: PageSource + ?Sized> {
    source: &'a mut S,
    config: &'a SourceConfig,
    plan: &'a ListingPlan,
    extractor: &'a mut ArticleExtractor,
    cache: Option<&'a HtmlCache>,
    settings: PaginatorSettings,
    state: PaginatorState,
    throttle: Throttle,
}

impl<'a, S: PageSource + ?Sized> Paginator<'a, S> {
    pub fn new(
        source: &'a mut S,
        config: &'a SourceConfig,
        plan: &'a ListingPlan,
        extractor: &'a mut ArticleExtractor,
        settings: PaginatorSettings,
    ) -> Self {
        Self {
            source,
            config,
            plan,
            extractor,
            cache: None,
            settings,
            state: PaginatorState::AtPage(settings.start_page.max(1)),
            throttle: Throttle::new(settings.per_item_delay),
        }
    }

    /// Append every fetched listing page to `cache`.
    pub fn with_cache(mut self, cache: &'a HtmlCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn state(&self) -> PaginatorState {
        self.state
    }

    /// Scan the next listing page.
    ///
    /// Returns `None` once the paginator is exhausted or aborted. A listing
    /// fetch failure is returned once as `Some(Err(..))` and moves the
    /// paginator to [`PaginatorState::Aborted`].
    #[instrument(level = "info", skip(self), fields(state = ?self.state))]
    pub async fn next_page(&mut self) -> Option<Result<PageBatch>> {
        let page = match self.state {
            PaginatorState::AtPage(n) if n <= self.settings.max_pages => n,
            PaginatorState::AtPage(n) => {
                info!(page = n, max_pages = self.settings.max_pages, "Reached page limit");
                self.state = PaginatorState::Exhausted;
                return None;
            }
            PaginatorState::Exhausted | PaginatorState::Aborted => return None,
        };

        let url = self.config.listing_url_for(page);
        info!(page, %url, "Scraping listing page");
        self.throttle.pause().await;
        let content = match self.source.fetch(&url).await {
            Ok(content) => content,
            Err(e) => {
                error!(page, error = %e, transport = e.is_transport(), "Listing page fetch failed; aborting run");
                self.state = PaginatorState::Aborted;
                return Some(Err(e));
            }
        };
        let listing = ListingPage { index: page, url, content };

        if let Some(cache) = self.cache {
            if let Err(e) = cache.append(&listing.content).await {
                error!(page, error = %e, "Failed to write HTML cache; aborting run");
                self.state = PaginatorState::Aborted;
                return Some(Err(e));
            }
        }

        let plan = self.plan;
        let (locations, has_next) = {
            let document = Html::parse_document(&listing.content);
            (plan.article_locations(&listing, &document), plan.has_next(&document))
        };

        let (batch, yielded_nothing) = match plan.article_selectors() {
            None => {
                let records = plan.extract_inline(&mut *self.extractor, &listing.content, now());
                info!(page = listing.index, count = records.len(), "Extracted inline records");
                let empty = records.is_empty();
                (PageBatch { page, records, failed: Vec::new() }, empty)
            }
            Some(article) => {
                info!(page = listing.index, count = locations.len(), "Found article links");
                let empty = locations.is_empty();
                let batch = fetch_articles(
                    &mut *self.source,
                    &mut *self.extractor,
                    article,
                    &mut self.throttle,
                    page,
                    locations,
                )
                .await;
                (batch, empty)
            }
        };

        self.state = if page < self.settings.max_pages && has_next && !yielded_nothing {
            PaginatorState::AtPage(page + 1)
        } else {
            info!(page, has_next, yielded_nothing, "No further listing pages");
            PaginatorState::Exhausted
        };

        Some(Ok(batch))
    }
}

/// Enforces the politeness delay between successive network requests.
#[derive(Debug)]
pub struct Throttle {
    delay: Duration,
    requested_any: bool,
}

impl Throttle {
    pub fn new(delay: Duration) -> Self {
        Self { delay, requested_any: false }
    }

    /// Sleep before every request but the first.
    pub async fn pause(&mut self) {
        if self.requested_any && !self.delay.is_zero() {
            sleep(self.delay).await;
        }
        self.requested_any = true;
    }
}

/// Fetch and extract each article in turn. A location that cannot be
/// fetched is logged and reported in [`PageBatch::failed`].
pub async fn fetch_articles<S: PageSource + ?Sized>(
    source: &mut S,
    extractor: &mut ArticleExtractor,
    article: &CompiledSelectors,
    throttle: &mut Throttle,
    page: u32,
    locations: Vec<ArticleLocation>,
) -> PageBatch {
    let mut records = Vec::with_capacity(locations.len());
    let mut failed = Vec::new();
    for location in locations {
        throttle.pause().await;
        match source.fetch(&location.0).await {
            Ok(markup) => {
                let mut record = extractor.extract(&markup, article, now());
                record.location = Some(location.0);
                debug!(title = %record.title, "Extracted article");
                records.push(record);
            }
            Err(e) => {
                warn!(%location, error = %e, "Article fetch failed; skipping");
                failed.push(location);
            }
        }
    }
    PageBatch { page, records, failed }
}

fn now() -> NaiveDateTime {
    Local::now().naive_local()
}
