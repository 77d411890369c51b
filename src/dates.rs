//! Publication date normalization.
//!
//! Listing and article pages publish dates in a mix of forms: relative
//! ("3 hrs ago", "2 months ago"), day-month-year ("07 Nov 2024"), or ISO
//! timestamps in `datetime` attributes. [`DateNormalizer::normalize`] turns
//! any of them into a calendar date and never fails: input it cannot read
//! yields a random date from the year before the reference time, tagged as
//! a fallback so it can be audited or filtered later.
//!
//! # Matching order
//!
//! 1. `N hour(s)/hr(s) ago`
//! 2. `N minute(s)/min(s) ago`
//! 3. `N day(s) ago`
//! 4. `N month(s) ago` (calendar months, clamped to the end of shorter months)
//! 5. `DD Mon YYYY`, then `YYYY-MM-DD`, then RFC 3339

use crate::models::{DateValue, FallbackReason};
use chrono::{DateTime, Days, Months, NaiveDate, NaiveDateTime, TimeDelta};
use once_cell::sync::Lazy;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use regex::Regex;

/// How far back a fallback date may reach.
const FALLBACK_WINDOW_DAYS: u64 = 365;

#[derive(Debug, Clone, Copy)]
enum Offset {
    Hours,
    Minutes,
    Days,
    Months,
}

static RELATIVE_PATTERNS: Lazy<Vec<(Offset, Regex)>> = Lazy::new(|| {
    [
        (Offset::Hours, r"(?i)\b(\d+)\s*(?:hours?|hrs?)\s+ago\b"),
        (Offset::Minutes, r"(?i)\b(\d+)\s*(?:minutes?|mins?)\s+ago\b"),
        (Offset::Days, r"(?i)\b(\d+)\s*days?\s+ago\b"),
        (Offset::Months, r"(?i)\b(\d+)\s*months?\s+ago\b"),
    ]
    .into_iter()
    .map(|(offset, pattern)| (offset, Regex::new(pattern).expect("static date pattern")))
    .collect()
});

pub struct DateNormalizer {
    rng: StdRng,
}

impl DateNormalizer {
    /// Create a normalizer. A fixed `seed` makes fallback dates reproducible.
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self { rng }
    }

    /// Convert `input` to a calendar date relative to `reference`.
    pub fn normalize(&mut self, input: &str, reference: NaiveDateTime) -> DateValue {
        let trimmed = input.trim();

        if let Some(date) = parse_relative(trimmed, reference) {
            return DateValue::Parsed(date);
        }
        if let Some(date) = parse_absolute(trimmed) {
            return DateValue::Parsed(date);
        }

        let date = self.random_recent_date(reference);
        DateValue::Fallback {
            date,
            reason: FallbackReason::Unparseable(trimmed.to_string()),
        }
    }

    /// The date used when a page carries no date element at all.
    pub fn processing_date(&self, reference: NaiveDateTime) -> DateValue {
        DateValue::Fallback {
            date: reference.date(),
            reason: FallbackReason::Missing,
        }
    }

    fn random_recent_date(&mut self, reference: NaiveDateTime) -> NaiveDate {
        let days_back = self.rng.random_range(1..=FALLBACK_WINDOW_DAYS);
        let today = reference.date();
        today.checked_sub_days(Days::new(days_back)).unwrap_or(today)
    }
}

fn parse_relative(input: &str, reference: NaiveDateTime) -> Option<NaiveDate> {
    for (offset, pattern) in RELATIVE_PATTERNS.iter() {
        let Some(caps) = pattern.captures(input) else {
            continue;
        };
        let n: u32 = caps[1].parse().ok()?;
        let shifted = match offset {
            Offset::Hours => reference.checked_sub_signed(TimeDelta::try_hours(n.into())?),
            Offset::Minutes => reference.checked_sub_signed(TimeDelta::try_minutes(n.into())?),
            Offset::Days => reference.checked_sub_signed(TimeDelta::try_days(n.into())?),
            Offset::Months => reference.checked_sub_months(Months::new(n)),
        };
        return shifted.map(|dt| dt.date());
    }
    None
}

fn parse_absolute(input: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(input, "%d %b %Y")
        .or_else(|_| NaiveDate::parse_from_str(input, "%Y-%m-%d"))
        .ok()
        .or_else(|| {
            DateTime::parse_from_rfc3339(input)
                .ok()
                .map(|dt| dt.date_naive())
        })
}
