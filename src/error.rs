//! Error types for the collector.
//!
//! Only failures that stop a page or a run are errors. Missing selectors,
//! misaligned field lists, and unparseable dates degrade to fallback values
//! and are carried as data (see [`crate::models::DateValue`]).

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CollectError>;

#[derive(Debug, Error)]
pub enum CollectError {
    /// The page source could not produce markup for a location.
    #[error("transport error fetching {url}: {message}")]
    Transport { url: String, message: String },

    /// The page source does not implement an interaction primitive.
    #[error("page source does not support {0}")]
    Unsupported(&'static str),

    #[error("invalid selector `{selector}`: {message}")]
    Selector { selector: String, message: String },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl CollectError {
    pub fn transport(url: impl Into<String>, message: impl ToString) -> Self {
        CollectError::Transport {
            url: url.into(),
            message: message.to_string(),
        }
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, CollectError::Transport { .. })
    }
}
