//! Durable record of the last fully completed listing page.
//!
//! The file holds a single integer and is overwritten on every save. A
//! missing file means nothing has completed yet.

use crate::error::Result;
use crate::models::Checkpoint;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Clone)]
pub struct ProgressCheckpoint {
    path: PathBuf,
}

impl ProgressCheckpoint {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the checkpoint; absent or unreadable content counts as page 0.
    #[instrument(level = "info", skip_all, fields(path = %self.path.display()))]
    pub async fn load(&self) -> Result<Checkpoint> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No checkpoint; starting from page 1");
                return Ok(Checkpoint::default());
            }
            Err(e) => return Err(e.into()),
        };

        match content.trim().parse::<u32>() {
            Ok(last_completed_page) => {
                info!(last_completed_page, "Resuming from checkpoint");
                Ok(Checkpoint { last_completed_page })
            }
            Err(e) => {
                warn!(content = %content.trim(), error = %e, "Checkpoint is not a page number; ignoring it");
                Ok(Checkpoint::default())
            }
        }
    }

    pub async fn save(&self, page: u32) -> Result<()> {
        fs::write(&self.path, page.to_string()).await?;
        debug!(page, path = %self.path.display(), "Saved checkpoint");
        Ok(())
    }

    /// Forget all progress.
    pub async fn reset(&self) -> Result<()> {
        match fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
