//! # News Collector
//!
//! Collects news articles from paginated listing pages and normalizes them
//! into a flat `title, text, subject, date` CSV for dataset construction
//! (for example, fake-vs-real news classification).
//!
//! ## Usage
//!
//! ```sh
//! news_collector -c profiles/globalnation.yaml -o newsinfo_scraped_articles.csv
//! ```
//!
//! ## Architecture
//!
//! 1. **Resume**: read the checkpoint to pick the starting listing page
//! 2. **Paginate**: fetch listing pages one at a time, with a politeness delay
//! 3. **Extract**: build one record per article, filling gaps with fallbacks
//!    and normalizing relative or free-form dates
//! 4. **Output**: append each finished page's records to the CSV, then
//!    advance the checkpoint
//!
//! With `--links-from`, steps 1 and 2 are replaced by a CSV of article links.

use clap::Parser;
use std::error::Error;
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{fmt as tfmt, EnvFilter};

mod cli;
mod config;
mod dates;
mod error;
mod extract;
mod models;
mod outputs;
mod pipeline;
mod sources;
mod utils;

use cli::Cli;
use config::SourceConfig;
use extract::ArticleExtractor;
use outputs::html_cache::HtmlCache;
use outputs::table::{FlushMode, FlushReport, RecordStore, TableWriter};
use pipeline::checkpoint::ProgressCheckpoint;
use pipeline::links::{collect_from_links, load_locations};
use pipeline::paginator::ListingPlan;
use pipeline::{RunEnd, RunSettings, RunState};
use sources::http::HttpPageSource;
use utils::{ensure_parent_writable, truncate_for_log};

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("news_collector starting up");

    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    let mut config = SourceConfig::load(&args.config).await?;
    config.apply_overrides(args.max_pages, args.delay_ms)?;
    let plan = ListingPlan::compile(&config.listing)?;

    // Early check: fail before any fetching if the output cannot be written
    if let Err(e) = ensure_parent_writable(&args.output).await {
        error!(
            path = %args.output.display(),
            error = %e,
            "Output directory is not writable (fix perms or choose a different path)"
        );
        return Err(e);
    }

    let mut extractor = ArticleExtractor::new(args.seed);
    let cache = args.html_cache.as_ref().map(HtmlCache::new);

    if args.from_cache {
        let Some(cache) = cache.as_ref() else {
            return Err("--from-cache needs --html-cache".into());
        };
        let store = pipeline::extract_from_cache(cache, &plan, &mut extractor).await?;
        report_flush(&store, &args.output, &config).await?;
        info!(elapsed = ?start_time.elapsed(), "Execution complete");
        return Ok(());
    }

    let mut source = HttpPageSource::new()?;

    if let Some(links_path) = &args.links_from {
        let locations = load_locations(links_path, &args.links_column, args.limit).await?;
        let mut table = TableWriter::new(&args.output, config.columns, FlushMode::Overwrite);
        let outcome =
            collect_from_links(&mut source, &plan, &mut extractor, locations, config.delay(), &mut table)
                .await?;
        report_written(&table, &outcome.records, &config);
        info!(elapsed = ?start_time.elapsed(), failed = outcome.failed.len(), "Execution complete");
        return Ok(());
    }

    let checkpoint = ProgressCheckpoint::new(&args.checkpoint);
    if args.fresh {
        checkpoint.reset().await?;
        info!(path = %checkpoint.path().display(), "Checkpoint reset");
    }
    let state = RunState::resume_from(checkpoint.load().await?);
    let mode = state.flush_mode();
    info!(start_page = state.start_page, max_pages = config.max_pages, ?mode, "Starting collection");

    let mut table = TableWriter::new(&args.output, config.columns, mode);
    let outcome = pipeline::collect(
        &mut source,
        &config,
        &plan,
        &mut extractor,
        &checkpoint,
        &mut table,
        cache.as_ref(),
        RunSettings::from_config(&config),
        state,
    )
    .await;

    // Pages are written as they complete, so this holds after an abort too
    report_written(&table, &outcome.state.records, &config);

    let elapsed = start_time.elapsed();
    match outcome.end {
        RunEnd::Exhausted => {
            info!(
                ?elapsed,
                secs = elapsed.as_secs(),
                last_completed_page = outcome.state.last_completed_page,
                "Execution complete"
            );
            Ok(())
        }
        RunEnd::Aborted(e) => {
            error!(
                error = %e,
                last_completed_page = outcome.state.last_completed_page,
                "Scraping stopped early; progress saved"
            );
            Err(e.into())
        }
    }
}

async fn report_flush(
    store: &RecordStore,
    output: &std::path::Path,
    config: &SourceConfig,
) -> Result<(), Box<dyn Error>> {
    match store.flush_to_table(output, config.columns, FlushMode::Overwrite).await? {
        FlushReport::NothingToSave => {
            warn!(source = %config.name, "No records collected; nothing to save");
        }
        FlushReport::Written { path, rows } => {
            log_first_record(store);
            info!(path = %path.display(), rows, "Data saved successfully");
        }
    }
    Ok(())
}

fn report_written(table: &TableWriter, store: &RecordStore, config: &SourceConfig) {
    if table.rows_written() == 0 {
        warn!(source = %config.name, "No records collected; nothing to save");
        return;
    }
    log_first_record(store);
    info!(path = %table.path().display(), rows = table.rows_written(), "Data saved successfully");
}

fn log_first_record(store: &RecordStore) {
    if let Some(first) = store.records().first() {
        debug!(
            title = %truncate_for_log(&first.title, 80),
            text = %truncate_for_log(&first.body_text, 200),
            "First record"
        );
    }
}
