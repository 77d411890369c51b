//! The collection run: checkpoint → pagination → extraction → record store.
//!
//! All mutable run state lives in [`RunState`], which is built from the
//! checkpoint at start, updated after every listing page, and handed back in
//! the [`RunOutcome`]. Completing a page means writing its records to the
//! output table first and only then saving the checkpoint, so an interrupted
//! run never checkpoints a page whose rows are not on disk. The checkpoint
//! advances only over pages whose articles were all collected; once a page
//! loses an article the checkpoint stays put for the rest of the run, so the
//! next run resumes at that page.

pub mod checkpoint;
pub mod links;
pub mod paginator;

use crate::config::SourceConfig;
use crate::error::{CollectError, Result};
use crate::extract::ArticleExtractor;
use crate::models::Checkpoint;
use crate::outputs::html_cache::HtmlCache;
use crate::outputs::table::{FlushMode, RecordStore, TableWriter};
use crate::sources::{run_setup, PageSource};
use checkpoint::ProgressCheckpoint;
use chrono::Local;
use paginator::{ListingPlan, Paginator, PaginatorSettings};
use std::time::Duration;
use tracing::{error, info, instrument, warn};

#[derive(Debug)]
pub struct RunState {
    pub start_page: u32,
    /// Highest page such that it and every page before it completed cleanly.
    pub last_completed_page: u32,
    /// Set once a page lost an article; the checkpoint no longer advances.
    pub checkpoint_held: bool,
    pub pages_scanned: u32,
    pub article_failures: usize,
    pub records: RecordStore,
}

impl RunState {
    pub fn resume_from(checkpoint: Checkpoint) -> Self {
        Self {
            start_page: checkpoint.next_page(),
            last_completed_page: checkpoint.last_completed_page,
            checkpoint_held: false,
            pages_scanned: 0,
            article_failures: 0,
            records: RecordStore::new(),
        }
    }

    /// Whether this run continues an earlier one rather than starting fresh.
    pub fn is_resumed(&self) -> bool {
        self.start_page > 1
    }

    /// A resumed run appends to the table; a fresh one replaces it.
    pub fn flush_mode(&self) -> FlushMode {
        if self.is_resumed() {
            FlushMode::Append
        } else {
            FlushMode::Overwrite
        }
    }
}

#[derive(Debug)]
pub enum RunEnd {
    Exhausted,
    Aborted(CollectError),
}

#[derive(Debug)]
pub struct RunOutcome {
    pub state: RunState,
    pub end: RunEnd,
}

#[derive(Debug, Clone, Copy)]
pub struct RunSettings {
    pub max_pages: u32,
    pub per_item_delay: Duration,
}

impl RunSettings {
    pub fn from_config(config: &SourceConfig) -> Self {
        Self {
            max_pages: config.max_pages,
            per_item_delay: config.delay(),
        }
    }
}

/// Collect records from every listing page from `state.start_page` on.
///
/// Each page's records are written through `table` as the page completes.
/// Never returns early with an error: a fatal failure ends the run as
/// [`RunEnd::Aborted`], and every page finished before it is already in the
/// table.
#[allow(clippy::too_many_arguments)]
#[instrument(level = "info", skip_all, fields(source = %config.name, start_page = state.start_page))]
pub async fn collect<S: PageSource + ?Sized>(
    source: &mut S,
    config: &SourceConfig,
    plan: &ListingPlan,
    extractor: &mut ArticleExtractor,
    checkpoint: &ProgressCheckpoint,
    table: &mut TableWriter,
    cache: Option<&HtmlCache>,
    settings: RunSettings,
    mut state: RunState,
) -> RunOutcome {
    if let Err(e) = prepare(source, config, cache, &state).await {
        error!(error = %e, "Run setup failed");
        return RunOutcome { state, end: RunEnd::Aborted(e) };
    }

    let paginator_settings = PaginatorSettings {
        start_page: state.start_page,
        max_pages: settings.max_pages,
        per_item_delay: settings.per_item_delay,
    };
    let mut paginator = Paginator::new(source, config, plan, extractor, paginator_settings);
    if let Some(cache) = cache {
        paginator = paginator.with_cache(cache);
    }

    let mut end = RunEnd::Exhausted;
    while let Some(result) = paginator.next_page().await {
        let batch = match result {
            Ok(batch) => batch,
            Err(e) => {
                end = RunEnd::Aborted(e);
                break;
            }
        };

        state.pages_scanned += 1;
        state.article_failures += batch.failed.len();
        let page = batch.page;
        let failed = batch.failed.len();
        if let Err(e) = table.write_batch(&batch.records).await {
            error!(page, error = %e, "Failed to write page records");
            end = RunEnd::Aborted(e);
            break;
        }
        state.records.extend(batch.records);

        if failed > 0 {
            if !state.checkpoint_held {
                warn!(
                    page,
                    failed,
                    checkpoint = state.last_completed_page,
                    "Page lost articles; holding checkpoint"
                );
            }
            state.checkpoint_held = true;
        } else if !state.checkpoint_held {
            if let Err(e) = checkpoint.save(page).await {
                error!(page, error = %e, "Failed to save checkpoint");
                end = RunEnd::Aborted(e);
                break;
            }
            state.last_completed_page = page;
        }
        info!(page, total_records = state.records.len(), "Page complete");
    }
    let final_state = paginator.state();

    let quality = state.records.quality();
    info!(
        pages = state.pages_scanned,
        records = state.records.len(),
        rows_written = table.rows_written(),
        article_failures = state.article_failures,
        date_fallbacks = quality.date_fallbacks,
        degraded = quality.degraded,
        checkpoint = state.last_completed_page,
        state = ?final_state,
        "Collection finished"
    );
    RunOutcome { state, end }
}

async fn prepare<S: PageSource + ?Sized>(
    source: &mut S,
    config: &SourceConfig,
    cache: Option<&HtmlCache>,
    state: &RunState,
) -> Result<()> {
    if let Some(cache) = cache {
        if !state.is_resumed() {
            cache.clear().await?;
        }
    }
    run_setup(source, &config.setup).await
}

/// Re-run inline extraction over the HTML cache without fetching anything.
#[instrument(level = "info", skip_all, fields(path = %cache.path().display()))]
pub async fn extract_from_cache(
    cache: &HtmlCache,
    plan: &ListingPlan,
    extractor: &mut ArticleExtractor,
) -> Result<RecordStore> {
    if !plan.is_inline() {
        return Err(CollectError::Config(
            "re-extraction from the HTML cache needs an inline listing profile".to_string(),
        ));
    }
    let markup = cache.read_all().await?;
    let mut store = RecordStore::new();
    store.extend(plan.extract_inline(extractor, &markup, Local::now().naive_local()));
    info!(records = store.len(), "Extracted records from HTML cache");
    Ok(store)
}
