//! Command-line interface definitions for the news collector.
//!
//! Everything about *what* to scrape lives in the YAML source profile; the
//! flags here pick file locations and override run limits.

use clap::Parser;
use std::path::PathBuf;

/// Command-line arguments for a collection run.
///
/// # Examples
///
/// ```sh
/// # Fresh or resumed run against a profile
/// news_collector -c profiles/globalnation.yaml -o newsinfo_scraped_articles.csv
///
/// # Pre-rendered search listing, keeping raw markup for later re-extraction
/// news_collector -c profiles/bbc.yaml --html-cache News.html
///
/// # Re-extract from the cached markup without fetching
/// news_collector -c profiles/bbc.yaml --html-cache News.html --from-cache
///
/// # Fill in article text for a table of links
/// news_collector -c profiles/bbc_article.yaml --links-from Data.csv --limit 51 -o Updated_Data.csv
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Path to the YAML source profile
    #[arg(short, long, env = "NEWS_COLLECTOR_CONFIG")]
    pub config: PathBuf,

    /// Output CSV file
    #[arg(short, long, default_value = "Data.csv")]
    pub output: PathBuf,

    /// File recording the last fully completed listing page
    #[arg(long, default_value = "progress.txt")]
    pub checkpoint: PathBuf,

    /// Append raw listing markup to this file
    #[arg(long)]
    pub html_cache: Option<PathBuf>,

    /// Override the profile's page limit
    #[arg(long)]
    pub max_pages: Option<u32>,

    /// Override the profile's delay between requests, in milliseconds
    #[arg(long)]
    pub delay_ms: Option<u64>,

    /// Seed for fallback dates and subjects
    #[arg(long, env = "NEWS_COLLECTOR_SEED")]
    pub seed: Option<u64>,

    /// Extract from the HTML cache instead of fetching
    #[arg(long, requires = "html_cache")]
    pub from_cache: bool,

    /// Ignore and reset the checkpoint, starting from page 1
    #[arg(long)]
    pub fresh: bool,

    /// Fetch articles listed in this CSV instead of walking listing pages
    #[arg(long, conflicts_with = "from_cache")]
    pub links_from: Option<PathBuf>,

    /// Column of the links CSV holding article URLs
    #[arg(long, default_value = "Links")]
    pub links_column: String,

    /// Only fetch the first N links
    #[arg(long, requires = "links_from")]
    pub limit: Option<usize>,
}
