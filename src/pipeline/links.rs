//! Collecting articles from a table of links instead of listing pages.
//!
//! The links file is any CSV with a header row; one named column holds the
//! article URLs. Each article goes through the same fetch-and-extract path as
//! a linked listing, and its record is written to the output table as soon as
//! it is extracted.

use super::paginator::{fetch_articles, ListingPlan, Throttle};
use crate::error::{CollectError, Result};
use crate::extract::ArticleExtractor;
use crate::models::ArticleLocation;
use crate::outputs::table::{RecordStore, TableWriter};
use crate::sources::PageSource;
use itertools::Itertools;
use std::path::Path;
use std::time::Duration;
use tracing::{info, instrument};

#[derive(Debug, Default)]
pub struct LinksOutcome {
    pub records: RecordStore,
    pub failed: Vec<ArticleLocation>,
}

/// Read article locations from `column` of the CSV at `path`, in file order.
///
/// Blank cells are skipped and repeated links kept once. `limit` caps how
/// many locations are returned.
#[instrument(level = "info", skip_all, fields(path = %path.display(), column = %column))]
pub async fn load_locations(
    path: &Path,
    column: &str,
    limit: Option<usize>,
) -> Result<Vec<ArticleLocation>> {
    let bytes = tokio::fs::read(path).await?;
    let mut reader = csv::Reader::from_reader(bytes.as_slice());
    let index = reader
        .headers()?
        .iter()
        .position(|h| h.trim() == column)
        .ok_or_else(|| {
            CollectError::Config(format!(
                "column {column:?} not found in {}",
                path.display()
            ))
        })?;

    let mut links = Vec::new();
    for row in reader.records() {
        let row = row?;
        if let Some(link) = row.get(index).map(str::trim).filter(|l| !l.is_empty()) {
            links.push(link.to_string());
        }
    }

    let locations: Vec<_> = links
        .into_iter()
        .unique()
        .take(limit.unwrap_or(usize::MAX))
        .map(ArticleLocation)
        .collect();
    info!(count = locations.len(), "Loaded article links");
    Ok(locations)
}

/// Fetch every location with the plan's article selectors.
///
/// Unreachable articles are skipped and listed in [`LinksOutcome::failed`].
/// A failed table write stops the run.
#[instrument(level = "info", skip_all, fields(count = locations.len()))]
pub async fn collect_from_links<S: PageSource + ?Sized>(
    source: &mut S,
    plan: &ListingPlan,
    extractor: &mut ArticleExtractor,
    locations: Vec<ArticleLocation>,
    delay: Duration,
    table: &mut TableWriter,
) -> Result<LinksOutcome> {
    let article = plan.article_selectors().ok_or_else(|| {
        CollectError::Config("collecting from links needs a linked listing profile".to_string())
    })?;

    let mut throttle = Throttle::new(delay);
    let mut outcome = LinksOutcome::default();
    for location in locations {
        let batch = fetch_articles(
            &mut *source,
            &mut *extractor,
            article,
            &mut throttle,
            0,
            vec![location],
        )
        .await;
        table.write_batch(&batch.records).await?;
        outcome.records.extend(batch.records);
        outcome.failed.extend(batch.failed);
    }

    info!(
        records = outcome.records.len(),
        failed = outcome.failed.len(),
        rows_written = table.rows_written(),
        "Link collection finished"
    );
    Ok(outcome)
}
