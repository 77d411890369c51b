//! Side file of raw listing markup.
//!
//! Each fetched listing page is appended to the cache so extraction can be
//! re-run later without fetching again. Starting a run from page 1 clears it.

use crate::error::Result;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, instrument};

#[derive(Debug, Clone)]
pub struct HtmlCache {
    path: PathBuf,
}

impl HtmlCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove any markup left over from a previous run.
    #[instrument(level = "info", skip_all, fields(path = %self.path.display()))]
    pub async fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path).await {
            Ok(()) => {
                info!("Cleared HTML cache");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn append(&self, markup: &str) -> Result<()> {
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(markup.as_bytes()).await?;
        file.write_all(b"\n").await?;
        file.flush().await?;
        debug!(bytes = markup.len(), path = %self.path.display(), "Appended to HTML cache");
        Ok(())
    }

    /// Everything appended so far, as one document.
    pub async fn read_all(&self) -> Result<String> {
        Ok(fs::read_to_string(&self.path).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_append_then_read() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = HtmlCache::new(tmp.path().join("News.html"));
        cache.append("<h2>One</h2>").await.unwrap();
        cache.append("<h2>Two</h2>").await.unwrap();
        assert_eq!(cache.read_all().await.unwrap(), "<h2>One</h2>\n<h2>Two</h2>\n");
    }

    #[tokio::test]
    async fn test_clear_is_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = HtmlCache::new(tmp.path().join("News.html"));
        cache.clear().await.unwrap();
        cache.append("<p>x</p>").await.unwrap();
        cache.clear().await.unwrap();
        assert!(!cache.path().exists());
        assert!(cache.read_all().await.is_err());
    }
}
