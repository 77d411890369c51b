//! Source profiles loaded from YAML.
//!
//! A profile describes one collection job: where the listing pages live, how
//! to find articles on them, and which selectors pull each field.
//!
//! ```yaml
//! name: globalnation
//! listing_url: "https://globalnation.inquirer.net/category/latest-stories/page/{page}"
//! max_pages: 5
//! delay_ms: 2000
//! listing:
//!   mode: linked
//!   article_link: "div#ch-ls-box a[href]"
//!   article:
//!     title: "h1.entry-title"
//!     body: "div#article_content"
//!     date: "div#ch-postdate"
//!     subject: "div#bc-share"
//! ```

use crate::error::{CollectError, Result};
use crate::models::ColumnSchema;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::{info, instrument};

fn default_max_pages() -> u32 {
    5
}

fn default_delay_ms() -> u64 {
    2000
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    pub name: String,
    /// Listing URL template. `{page}` is replaced with the 1-based page
    /// number and `{query}` with the url-encoded `query`.
    pub listing_url: String,
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
    #[serde(default)]
    pub columns: ColumnSchema,
    /// Interactions run once against the page source before pagination.
    #[serde(default)]
    pub setup: Vec<SetupStep>,
    pub listing: ListingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListingConfig {
    /// Selector for the "next page" affordance. When unset, pagination is
    /// bounded by `max_pages` and by pages that yield no articles.
    #[serde(default)]
    pub next_page: Option<String>,
    #[serde(flatten)]
    pub mode: ListingMode,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ListingMode {
    /// Listing pages link to one page per article.
    Linked {
        article_link: String,
        article: ArticleSelectors,
    },
    /// Listing pages carry the article fields themselves.
    Inline {
        /// One element per article; fields are looked up inside it.
        #[serde(default)]
        container: Option<String>,
        fields: ArticleSelectors,
    },
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ArticleSelectors {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    /// Read the date from this attribute (e.g. `datetime`) instead of text.
    #[serde(default)]
    pub date_attribute: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub default_subject: Option<String>,
    /// Subjects picked from at random when neither selector nor default applies.
    #[serde(default)]
    pub subject_pool: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum SetupStep {
    Click { selector: String },
    Type { selector: String, text: String },
    Submit,
}

impl SourceConfig {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: SourceConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    #[instrument(level = "info", skip_all, fields(path = %path.display()))]
    pub async fn load(path: &Path) -> Result<Self> {
        let yaml = tokio::fs::read_to_string(path).await?;
        let config = Self::from_yaml(&yaml)?;
        info!(name = %config.name, max_pages = config.max_pages, "Loaded source profile");
        Ok(config)
    }

    /// Apply command-line limits and re-check the profile against them.
    pub fn apply_overrides(&mut self, max_pages: Option<u32>, delay_ms: Option<u64>) -> Result<()> {
        if let Some(max_pages) = max_pages {
            self.max_pages = max_pages;
        }
        if let Some(delay_ms) = delay_ms {
            self.delay_ms = delay_ms;
        }
        self.validate()
    }

    fn validate(&self) -> Result<()> {
        if !self.listing_url.contains("{page}") && self.max_pages > 1 {
            return Err(CollectError::Config(format!(
                "listing_url {:?} has no {{page}} placeholder but max_pages is {}",
                self.listing_url, self.max_pages
            )));
        }
        if self.listing_url.contains("{query}") && self.query.is_none() {
            return Err(CollectError::Config(
                "listing_url uses {query} but no query is set".to_string(),
            ));
        }
        Ok(())
    }

    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    /// The URL of listing page `page`.
    pub fn listing_url_for(&self, page: u32) -> String {
        let url = self.listing_url.replace("{page}", &page.to_string());
        match &self.query {
            Some(query) => url.replace("{query}", &urlencoding::encode(query)),
            None => url,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LINKED: &str = r#"
name: globalnation
listing_url: "https://example.com/latest/page/{page}"
listing:
  mode: linked
  article_link: "div#ch-ls-box a[href]"
  article:
    title: "h1.entry-title"
    body: "div#article_content"
    date: "div#ch-postdate"
    subject: "div#bc-share"
"#;

    const INLINE: &str = r#"
name: bbc-search
listing_url: "https://example.com/search?q={query}&page={page}"
query: "Climate change"
max_pages: 30
delay_ms: 0
columns: titles
setup:
  - action: click
    selector: "button[aria-label='Search']"
  - action: type
    selector: "input"
    text: "Technology"
  - action: submit
listing:
  mode: inline
  next_page: "button[aria-label='Next Page']"
  fields:
    title: "h2"
    body: "p"
    date: "span.time"
    subject: "span.location"
"#;

    #[test]
    fn test_linked_profile_defaults() {
        let config = SourceConfig::from_yaml(LINKED).unwrap();
        assert_eq!(config.max_pages, 5);
        assert_eq!(config.delay(), Duration::from_secs(2));
        assert_eq!(config.columns, ColumnSchema::Standard);
        assert!(config.setup.is_empty());
        assert!(config.listing.next_page.is_none());
        match &config.listing.mode {
            ListingMode::Linked { article_link, article } => {
                assert_eq!(article_link, "div#ch-ls-box a[href]");
                assert_eq!(article.title.as_deref(), Some("h1.entry-title"));
                assert!(article.subject_pool.is_empty());
            }
            other => panic!("expected linked mode, got {other:?}"),
        }
        assert_eq!(config.listing_url_for(3), "https://example.com/latest/page/3");
    }

    #[test]
    fn test_inline_profile() {
        let config = SourceConfig::from_yaml(INLINE).unwrap();
        assert_eq!(config.columns, ColumnSchema::Titles);
        assert_eq!(config.setup.len(), 3);
        assert_eq!(config.setup[2], SetupStep::Submit);
        assert_eq!(
            config.listing.next_page.as_deref(),
            Some("button[aria-label='Next Page']")
        );
        assert!(matches!(
            config.listing.mode,
            ListingMode::Inline { container: None, .. }
        ));
        assert_eq!(
            config.listing_url_for(2),
            "https://example.com/search?q=Climate%20change&page=2"
        );
    }

    #[test]
    fn test_missing_page_placeholder_rejected() {
        let yaml = LINKED.replace("/page/{page}", "/latest");
        let err = SourceConfig::from_yaml(&yaml).unwrap_err();
        assert!(matches!(err, CollectError::Config(_)));
    }

    #[test]
    fn test_missing_query_rejected() {
        let yaml = INLINE.replace("query: \"Climate change\"\n", "");
        assert!(matches!(
            SourceConfig::from_yaml(&yaml),
            Err(CollectError::Config(_))
        ));
    }

    #[test]
    fn test_bundled_profiles_parse() {
        for yaml in [
            include_str!("../profiles/globalnation.yaml"),
            include_str!("../profiles/toronto99.yaml"),
            include_str!("../profiles/bbc_search.yaml"),
            include_str!("../profiles/bbc_article.yaml"),
        ] {
            let config = SourceConfig::from_yaml(yaml).unwrap();
            assert!(config.max_pages >= 1);
        }
    }

    #[test]
    fn test_overrides_are_validated() {
        let yaml = LINKED
            .replace("/page/{page}", "/latest")
            .replace("listing:", "max_pages: 1\nlisting:");
        let mut config = SourceConfig::from_yaml(&yaml).unwrap();

        config.apply_overrides(None, Some(0)).unwrap();
        assert_eq!(config.delay(), Duration::ZERO);

        let err = config.apply_overrides(Some(5), None).unwrap_err();
        assert!(matches!(err, CollectError::Config(_)));
    }

    #[test]
    fn test_unknown_mode_is_yaml_error() {
        let yaml = LINKED.replace("mode: linked", "mode: scrolling");
        assert!(matches!(
            SourceConfig::from_yaml(&yaml),
            Err(CollectError::Yaml(_))
        ));
    }
}
