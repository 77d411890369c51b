//! HTTP page source backed by `reqwest`.

use super::PageSource;
use crate::error::{CollectError, Result};
use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, instrument};

/// Browser-like agent string; several news sites reject the default one.
const USER_AGENT: &str = "Mozilla/5.0";

pub struct HttpPageSource {
    client: Client,
}

impl HttpPageSource {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| CollectError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PageSource for HttpPageSource {
    #[instrument(level = "debug", skip(self))]
    async fn fetch(&mut self, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| CollectError::transport(url, e))?;
        let body = response
            .text()
            .await
            .map_err(|e| CollectError::transport(url, e))?;
        debug!(bytes = body.len(), "Fetched page");
        Ok(body)
    }
}
