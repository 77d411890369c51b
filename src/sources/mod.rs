//! Page sources: the transport that turns a location into markup.
//!
//! The pipeline never talks to the network directly. It asks a
//! [`PageSource`] for markup, so the same extraction code runs against the
//! live HTTP client ([`http::HttpPageSource`]) or an in-memory replay in
//! tests. Interactive sources (a driven browser) can additionally implement
//! the `click` / `type_text` / `submit` primitives used by profile setup
//! steps; plain HTTP does not.

use crate::config::SetupStep;
use crate::error::{CollectError, Result};
use async_trait::async_trait;
use tracing::{info, instrument};

pub mod http;

#[async_trait]
pub trait PageSource: Send {
    /// Fetch the markup at `url`. Any failure is a transport error.
    async fn fetch(&mut self, url: &str) -> Result<String>;

    async fn click(&mut self, _selector: &str) -> Result<()> {
        Err(CollectError::Unsupported("click"))
    }

    async fn type_text(&mut self, _selector: &str, _text: &str) -> Result<()> {
        Err(CollectError::Unsupported("type"))
    }

    async fn submit(&mut self) -> Result<()> {
        Err(CollectError::Unsupported("submit"))
    }
}

/// Run a profile's setup interactions in order, stopping at the first failure.
#[instrument(level = "info", skip_all, fields(steps = steps.len()))]
pub async fn run_setup<S: PageSource + ?Sized>(source: &mut S, steps: &[SetupStep]) -> Result<()> {
    for step in steps {
        match step {
            SetupStep::Click { selector } => source.click(selector).await?,
            SetupStep::Type { selector, text } => source.type_text(selector, text).await?,
            SetupStep::Submit => source.submit().await?,
        }
        info!(?step, "Setup step done");
    }
    Ok(())
}
