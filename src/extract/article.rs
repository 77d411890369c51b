//! Per-article field extraction with fallbacks.
//!
//! Every field is looked up independently. A selector that matches nothing
//! degrades that one field to its fallback instead of failing the record:
//!
//! | Field   | Fallback |
//! |---------|----------|
//! | title   | `"No Title"` |
//! | body    | `"No Content"` |
//! | subject | profile default, else a random pick from the subject pool, else `"No Subject"` |
//! | date    | processing date when no date text exists; otherwise [`DateNormalizer`] rules |

use super::aligner::{self, AlignedRow, Field};
use super::{compile_opt, element_text};
use crate::config::ArticleSelectors;
use crate::dates::DateNormalizer;
use crate::error::Result;
use crate::models::{ArticleRecord, DateValue, NO_CONTENT, NO_SUBJECT, NO_TITLE};
use chrono::NaiveDateTime;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::SeedableRng;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

/// An [`ArticleSelectors`] set with its selectors parsed.
#[derive(Debug, Clone)]
pub struct CompiledSelectors {
    title: Option<Selector>,
    body: Option<Selector>,
    date: Option<Selector>,
    subject: Option<Selector>,
    date_attribute: Option<String>,
    default_subject: Option<String>,
    subject_pool: Vec<String>,
}

impl CompiledSelectors {
    pub fn compile(config: &ArticleSelectors) -> Result<Self> {
        Ok(Self {
            title: compile_opt(config.title.as_deref())?,
            body: compile_opt(config.body.as_deref())?,
            date: compile_opt(config.date.as_deref())?,
            subject: compile_opt(config.subject.as_deref())?,
            date_attribute: config.date_attribute.clone(),
            default_subject: config.default_subject.clone(),
            subject_pool: config.subject_pool.clone(),
        })
    }
}

/// Where field selectors are applied: a whole document or one element.
#[derive(Clone, Copy)]
enum Scope<'a> {
    Document(&'a Html),
    Element(ElementRef<'a>),
}

impl<'a> Scope<'a> {
    fn first(self, selector: &Selector) -> Option<ElementRef<'a>> {
        match self {
            Scope::Document(doc) => doc.select(selector).next(),
            Scope::Element(el) => el.select(selector).next(),
        }
    }
}

pub struct ArticleExtractor {
    dates: DateNormalizer,
    rng: StdRng,
}

impl ArticleExtractor {
    /// A fixed `seed` makes date and subject fallbacks reproducible.
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(1)),
            None => StdRng::from_os_rng(),
        };
        Self {
            dates: DateNormalizer::new(seed),
            rng,
        }
    }

    /// Build a record from a full article page.
    pub fn extract(
        &mut self,
        page_content: &str,
        selectors: &CompiledSelectors,
        reference: NaiveDateTime,
    ) -> ArticleRecord {
        let document = Html::parse_document(page_content);
        self.record_from_scope(Scope::Document(&document), selectors, reference)
    }

    /// Build one record per `container` match, looking fields up inside it.
    pub fn extract_containers(
        &mut self,
        page_content: &str,
        container: &Selector,
        selectors: &CompiledSelectors,
        reference: NaiveDateTime,
    ) -> Vec<ArticleRecord> {
        let document = Html::parse_document(page_content);
        document
            .select(container)
            .map(|el| self.record_from_scope(Scope::Element(el), selectors, reference))
            .collect()
    }

    /// Scan each field across the whole page and align the results by position.
    pub fn extract_aligned(
        &mut self,
        page_content: &str,
        selectors: &CompiledSelectors,
        reference: NaiveDateTime,
    ) -> Vec<ArticleRecord> {
        let document = Html::parse_document(page_content);
        let mut lists = Vec::new();
        for (field, selector) in [
            (Field::Title, &selectors.title),
            (Field::Body, &selectors.body),
            (Field::Subject, &selectors.subject),
            (Field::Date, &selectors.date),
        ] {
            let Some(selector) = selector else { continue };
            let values: Vec<String> = document
                .select(selector)
                .map(|el| match field {
                    Field::Date => date_text(el, selectors.date_attribute.as_deref()),
                    _ => element_text(el),
                })
                .collect();
            debug!(?field, count = values.len(), "Scanned field");
            lists.push((field, values));
        }

        aligner::align(lists)
            .into_iter()
            .map(|row| self.record_from_row(&row, selectors, reference))
            .collect()
    }

    fn record_from_scope(
        &mut self,
        scope: Scope<'_>,
        selectors: &CompiledSelectors,
        reference: NaiveDateTime,
    ) -> ArticleRecord {
        let text_of = |selector: &Option<Selector>| {
            selector
                .as_ref()
                .and_then(|s| scope.first(s))
                .map(element_text)
                .filter(|t| !t.is_empty())
        };

        let title = text_of(&selectors.title);
        let body = text_of(&selectors.body);
        let subject = text_of(&selectors.subject);
        let raw_date = selectors
            .date
            .as_ref()
            .and_then(|s| scope.first(s))
            .map(|el| date_text(el, selectors.date_attribute.as_deref()))
            .filter(|t| !t.is_empty());

        if title.is_none() {
            debug!("No title found; using fallback");
        }
        if body.is_none() {
            debug!("No body found; using fallback");
        }

        ArticleRecord {
            title: title.unwrap_or_else(|| NO_TITLE.to_string()),
            body_text: body.unwrap_or_else(|| NO_CONTENT.to_string()),
            subject: subject.unwrap_or_else(|| self.fallback_subject(selectors)),
            published: self.date_value(raw_date.as_deref(), reference),
            degraded: false,
            location: None,
        }
    }

    fn record_from_row(
        &mut self,
        row: &AlignedRow,
        selectors: &CompiledSelectors,
        reference: NaiveDateTime,
    ) -> ArticleRecord {
        if row.is_degraded() {
            debug!(padded = ?row.padded(), "Row built from padded field lists");
        }
        ArticleRecord {
            title: row.get(Field::Title).unwrap_or(NO_TITLE).to_string(),
            body_text: row.get(Field::Body).unwrap_or(NO_CONTENT).to_string(),
            subject: match row.get(Field::Subject) {
                Some(subject) => subject.to_string(),
                None => self.fallback_subject(selectors),
            },
            published: self.date_value(row.get(Field::Date), reference),
            degraded: row.is_degraded(),
            location: None,
        }
    }

    fn date_value(&mut self, raw: Option<&str>, reference: NaiveDateTime) -> DateValue {
        let value = match raw {
            Some(raw) => self.dates.normalize(raw, reference),
            None => self.dates.processing_date(reference),
        };
        if let DateValue::Fallback { reason, date } = &value {
            debug!(%reason, %date, "Date fallback taken");
        }
        value
    }

    fn fallback_subject(&mut self, selectors: &CompiledSelectors) -> String {
        if let Some(default) = &selectors.default_subject {
            return default.clone();
        }
        selectors
            .subject_pool
            .choose(&mut self.rng)
            .cloned()
            .unwrap_or_else(|| NO_SUBJECT.to_string())
    }
}

fn date_text(el: ElementRef<'_>, attribute: Option<&str>) -> String {
    match attribute.and_then(|a| el.value().attr(a)) {
        Some(value) => value.trim().to_string(),
        None => element_text(el),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::compile;
    use crate::models::FallbackReason;
    use chrono::NaiveDate;

    fn reference() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 11, 20)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap()
    }

    fn selectors(yaml: &str) -> CompiledSelectors {
        let config: ArticleSelectors = serde_yaml::from_str(yaml).unwrap();
        CompiledSelectors::compile(&config).unwrap()
    }

    fn article_selectors() -> CompiledSelectors {
        selectors(
            r#"
title: "h1.entry-title"
body: "div#article_content"
date: "div#ch-postdate"
subject: "div#bc-share"
"#,
        )
    }

    const ARTICLE: &str = r#"
<html><body>
  <h1 class="entry-title">  Typhoon  makes landfall </h1>
  <div id="ch-postdate">07 Nov 2024</div>
  <div id="bc-share">Global Nation</div>
  <div id="article_content"><p>Winds reached</p><p>200 km/h.</p></div>
</body></html>"#;

    #[test]
    fn test_extract_full_article() {
        let mut extractor = ArticleExtractor::new(Some(1));
        let record = extractor.extract(ARTICLE, &article_selectors(), reference());
        assert_eq!(record.title, "Typhoon makes landfall");
        assert_eq!(record.body_text, "Winds reached 200 km/h.");
        assert_eq!(record.subject, "Global Nation");
        assert_eq!(
            record.published,
            DateValue::Parsed(NaiveDate::from_ymd_opt(2024, 11, 7).unwrap())
        );
        assert!(!record.degraded);
    }

    #[test]
    fn test_missing_body_uses_fallback() {
        let markup = ARTICLE.replace("id=\"article_content\"", "id=\"other\"");
        let mut extractor = ArticleExtractor::new(Some(1));
        let record = extractor.extract(&markup, &article_selectors(), reference());
        assert_eq!(record.body_text, "No Content");
        assert_eq!(record.title, "Typhoon makes landfall");
        assert_eq!(record.subject, "Global Nation");
        assert_eq!(record.published.iso(), "2024-11-07");
    }

    #[test]
    fn test_empty_page_degrades_every_field() {
        let mut extractor = ArticleExtractor::new(Some(1));
        let record = extractor.extract("<html></html>", &article_selectors(), reference());
        assert_eq!(record.title, "No Title");
        assert_eq!(record.body_text, "No Content");
        assert_eq!(record.subject, "No Subject");
        assert_eq!(
            record.published,
            DateValue::Fallback {
                date: reference().date(),
                reason: FallbackReason::Missing
            }
        );
    }

    #[test]
    fn test_subject_default_and_pool() {
        let mut extractor = ArticleExtractor::new(Some(3));
        let with_default = selectors("title: h1\ndefault_subject: Politics\n");
        let record = extractor.extract("<h1>Hi</h1>", &with_default, reference());
        assert_eq!(record.subject, "Politics");

        let pool = ["News", "Middle-east", "US_News"];
        let with_pool = selectors("title: h1\nsubject_pool: [News, Middle-east, US_News]\n");
        for _ in 0..20 {
            let record = extractor.extract("<h1>Hi</h1>", &with_pool, reference());
            assert!(pool.contains(&record.subject.as_str()));
        }
    }

    #[test]
    fn test_date_from_attribute() {
        let sel = selectors("date: time.entry-date\ndate_attribute: datetime\n");
        let markup = r#"<time class="entry-date" datetime="2024-10-01T08:00:00+00:00">Oct 1</time>"#;
        let mut extractor = ArticleExtractor::new(Some(1));
        let record = extractor.extract(markup, &sel, reference());
        assert_eq!(record.published.iso(), "2024-10-01");
    }

    #[test]
    fn test_containers_keep_fields_together() {
        let sel = selectors("title: h2\nbody: p\ndate: span.time\nsubject: span.where\n");
        let container = compile("div.card").unwrap();
        let markup = r#"
<div class="card"><h2>First</h2><p>One</p><span class="where">Asia</span></div>
<div class="card"><h2>Second</h2><p>Two</p><span class="time">2 days ago</span><span class="where">Europe</span></div>"#;
        let mut extractor = ArticleExtractor::new(Some(1));
        let records = extractor.extract_containers(markup, &container, &sel, reference());
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].title, "First");
        assert!(records[0].published.is_fallback());
        assert_eq!(records[1].subject, "Europe");
        assert_eq!(records[1].published.iso(), "2024-11-18");
    }

    #[test]
    fn test_aligned_extraction_pads_and_flags() {
        let sel = selectors("title: h2\nbody: p\ndate: span.time\n");
        let markup = r#"
<h2>First</h2><p>One</p><span class="time">3 hrs ago</span>
<h2>Second</h2><p>Two</p>
<h2>Third</h2>"#;
        let mut extractor = ArticleExtractor::new(Some(1));
        let records = extractor.extract_aligned(markup, &sel, reference());
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].published.iso(), "2024-11-20");
        assert!(!records[0].degraded);
        assert_eq!(records[1].body_text, "Two");
        assert!(records[1].degraded);
        assert!(records[1].published.is_fallback());
        assert_eq!(records[2].body_text, "N/A");
        // No subject selector configured: fallback, not sentinel.
        assert_eq!(records[2].subject, "No Subject");
    }

    #[test]
    fn test_aligned_extraction_empty_page() {
        let sel = selectors("title: h2\nbody: p\n");
        let mut extractor = ArticleExtractor::new(Some(1));
        assert!(extractor.extract_aligned("<div></div>", &sel, reference()).is_empty());
    }
}
