//! Data models shared by the extraction pipeline.
//!
//! - [`ArticleRecord`]: one normalized row of the output table
//! - [`DateValue`]: a publication date plus how it was obtained
//! - [`ListingPage`] / [`ArticleLocation`]: transient pagination values
//! - [`Checkpoint`]: last fully completed listing page
//! - [`ColumnSchema`]: the fixed header layout of the output table

use chrono::NaiveDate;
use serde::Deserialize;
use std::fmt;

/// Placeholder for a missing position in an aligned field list.
pub const SENTINEL: &str = "N/A";
pub const NO_TITLE: &str = "No Title";
pub const NO_CONTENT: &str = "No Content";
pub const NO_SUBJECT: &str = "No Subject";

/// Why a date could not be taken from the page as written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackReason {
    /// No date element was found; the processing date was used.
    Missing,
    /// A date string was found but matched no known form; a random date
    /// from the preceding year was used.
    Unparseable(String),
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FallbackReason::Missing => write!(f, "no date element"),
            FallbackReason::Unparseable(raw) => write!(f, "unparseable date {raw:?}"),
        }
    }
}

/// A calendar date and the path taken to produce it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DateValue {
    Parsed(NaiveDate),
    Fallback { date: NaiveDate, reason: FallbackReason },
}

impl DateValue {
    pub fn date(&self) -> NaiveDate {
        match self {
            DateValue::Parsed(date) => *date,
            DateValue::Fallback { date, .. } => *date,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, DateValue::Fallback { .. })
    }

    /// ISO calendar form, `YYYY-MM-DD`.
    pub fn iso(&self) -> String {
        self.date().format("%Y-%m-%d").to_string()
    }
}

/// A normalized news article.
///
/// All text fields are non-empty: gaps are filled with fallback values at
/// extraction time, never left blank.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleRecord {
    pub title: String,
    pub body_text: String,
    pub subject: String,
    pub published: DateValue,
    /// Set when a field had to be padded during positional alignment.
    pub degraded: bool,
    /// Where the article came from, if it had its own page.
    pub location: Option<String>,
}

impl ArticleRecord {
    /// The row written to the output table, in column order.
    pub fn row(&self) -> [String; 4] {
        [
            self.title.clone(),
            self.body_text.clone(),
            self.subject.clone(),
            self.published.iso(),
        ]
    }
}

/// One fetched listing page. Dropped once its article locations are consumed.
#[derive(Debug)]
pub struct ListingPage {
    /// 1-based page ordinal.
    pub index: u32,
    pub url: String,
    pub content: String,
}

/// A resolvable reference to a single article.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArticleLocation(pub String);

impl fmt::Display for ArticleLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Checkpoint {
    pub last_completed_page: u32,
}

impl Checkpoint {
    /// The page a resumed run starts from.
    pub fn next_page(&self) -> u32 {
        self.last_completed_page + 1
    }
}

/// Header layout of the output table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnSchema {
    /// `title, text, subject, date`
    #[default]
    Standard,
    /// `titles, text, subject, date`
    Titles,
}

impl ColumnSchema {
    pub fn headers(&self) -> [&'static str; 4] {
        match self {
            ColumnSchema::Standard => ["title", "text", "subject", "date"],
            ColumnSchema::Titles => ["titles", "text", "subject", "date"],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_date_value_iso() {
        assert_eq!(DateValue::Parsed(date(2024, 11, 7)).iso(), "2024-11-07");
        let fallback = DateValue::Fallback {
            date: date(2024, 1, 2),
            reason: FallbackReason::Missing,
        };
        assert_eq!(fallback.iso(), "2024-01-02");
        assert!(fallback.is_fallback());
    }

    #[test]
    fn test_record_row_order() {
        let record = ArticleRecord {
            title: "Headline".to_string(),
            body_text: "Body".to_string(),
            subject: "World".to_string(),
            published: DateValue::Parsed(date(2024, 11, 7)),
            degraded: false,
            location: None,
        };
        assert_eq!(record.row(), ["Headline", "Body", "World", "2024-11-07"]);
    }

    #[test]
    fn test_checkpoint_next_page() {
        assert_eq!(Checkpoint::default().next_page(), 1);
        assert_eq!(Checkpoint { last_completed_page: 4 }.next_page(), 5);
    }

    #[test]
    fn test_column_schema_headers() {
        assert_eq!(ColumnSchema::Standard.headers(), ["title", "text", "subject", "date"]);
        assert_eq!(ColumnSchema::Titles.headers()[0], "titles");
        let parsed: ColumnSchema = serde_yaml::from_str("titles").unwrap();
        assert_eq!(parsed, ColumnSchema::Titles);
    }

    #[test]
    fn test_fallback_reason_display() {
        let reason = FallbackReason::Unparseable("yesterday-ish".to_string());
        assert_eq!(reason.to_string(), "unparseable date \"yesterday-ish\"");
    }
}
