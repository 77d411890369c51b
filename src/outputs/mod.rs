//! Persistent outputs of a collection run.
//!
//! - [`table`]: the CSV dataset (`title, text, subject, date`)
//! - [`html_cache`]: raw listing markup kept for offline re-extraction
//!
//! The checkpoint file lives with the pipeline in
//! [`crate::pipeline::checkpoint`].

pub mod html_cache;
pub mod table;
