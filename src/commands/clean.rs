use anyhow::{anyhow, Result};
use std::path::PathBuf;
use tracing::info;

use crate::staging::StagingDir;

/// Command to clear out the staging directory
pub struct CleanCommand {
    download_dir: PathBuf,
    keep: Option<usize>,
}

impl CleanCommand {
    pub fn new(download_dir: PathBuf, keep: Option<usize>) -> Self {
        Self { download_dir, keep }
    }

    pub async fn execute(&self) -> Result<()> {
        if !self.download_dir.exists() {
            return Err(anyhow!(
                "Download directory does not exist: {:?}",
                self.download_dir
            ));
        }

        if !self.download_dir.is_dir() {
            return Err(anyhow!("Path is not a directory: {:?}", self.download_dir));
        }

        let staging = StagingDir::new(self.download_dir.clone());
        let removed = match self.keep {
            Some(keep) if keep > 0 => {
                info!("🧹 Keeping the {} newest files...", keep);
                staging.prune(keep).await?
            }
            _ => {
                info!("🧹 Removing all staged files...");
                staging.clean().await?
            }
        };

        info!("✅ Cleanup complete. Removed {} files.", removed);
        Ok(())
    }
}
