//! Positional alignment of parallel field lists.
//!
//! Pre-rendered listings are often scanned one selector at a time: all
//! titles, then all summaries, then all dates. The scans are independent, so
//! a missing date on one card makes the date list shorter than the others.
//! [`align`] pads every short list with [`SENTINEL`] at its tail and zips the
//! lists by position.
//!
//! The Nth entries are assumed to belong to the same article. That only holds
//! when each selector matches in document order and the lists differ solely by
//! trailing gaps, so rows containing padding are flagged (see
//! [`AlignedRow::is_degraded`]). Prefer container-scoped extraction where the
//! markup allows it.

use crate::models::SENTINEL;
use crate::utils::normalize_whitespace;
use tracing::warn;

/// A field of an article record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Title,
    Body,
    Subject,
    Date,
}

/// One row produced by [`align`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlignedRow {
    values: Vec<(Field, String)>,
    padded: Vec<Field>,
}

impl AlignedRow {
    /// The normalized value of `field`, if the field took part in alignment.
    pub fn get(&self, field: Field) -> Option<&str> {
        self.values
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, v)| v.as_str())
    }

    /// Fields that were filled with the sentinel because their list ran short.
    pub fn padded(&self) -> &[Field] {
        &self.padded
    }

    pub fn is_degraded(&self) -> bool {
        !self.padded.is_empty()
    }
}

/// Zip per-field value lists into rows, padding short lists with the sentinel.
///
/// Values are whitespace-normalized; a value that normalizes to nothing is
/// replaced by the sentinel as well. All-empty input yields no rows.
pub fn align(field_lists: Vec<(Field, Vec<String>)>) -> Vec<AlignedRow> {
    let max_len = field_lists.iter().map(|(_, v)| v.len()).max().unwrap_or(0);
    if max_len == 0 {
        return Vec::new();
    }

    for (field, values) in &field_lists {
        if values.len() < max_len {
            warn!(
                ?field,
                found = values.len(),
                expected = max_len,
                "Field list shorter than others; padding with sentinel"
            );
        }
    }

    let mut columns: Vec<(Field, std::vec::IntoIter<String>)> = field_lists
        .into_iter()
        .map(|(field, values)| (field, values.into_iter()))
        .collect();

    (0..max_len)
        .map(|_| {
            let mut values = Vec::with_capacity(columns.len());
            let mut padded = Vec::new();
            for (field, column) in columns.iter_mut() {
                let value = match column.next() {
                    Some(raw) => {
                        let cleaned = normalize_whitespace(&raw);
                        if cleaned.is_empty() {
                            SENTINEL.to_string()
                        } else {
                            cleaned
                        }
                    }
                    None => {
                        padded.push(*field);
                        SENTINEL.to_string()
                    }
                };
                values.push((*field, value));
            }
            AlignedRow { values, padded }
        })
        .collect()
}
