//! Turning page markup into [`ArticleRecord`](crate::models::ArticleRecord)s.
//!
//! - [`article`]: field lookup with per-field fallbacks, for whole article
//!   pages, per-container listing cards, or aligned listing scans
//! - [`aligner`]: positional alignment of parallel field lists

pub mod aligner;
pub mod article;

pub use article::{ArticleExtractor, CompiledSelectors};

use crate::error::{CollectError, Result};
use crate::utils::normalize_whitespace;
use scraper::{ElementRef, Selector};

/// Parse a CSS selector, reporting which one was invalid.
pub fn compile(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| CollectError::Selector {
        selector: selector.to_string(),
        message: e.to_string(),
    })
}

pub(crate) fn compile_opt(selector: Option<&str>) -> Result<Option<Selector>> {
    selector.map(compile).transpose()
}

/// The element's text nodes joined by spaces, whitespace-normalized.
pub(crate) fn element_text(el: ElementRef<'_>) -> String {
    normalize_whitespace(&el.text().collect::<Vec<_>>().join(" "))
}
