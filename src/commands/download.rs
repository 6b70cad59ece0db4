use anyhow::Result;
use std::path::PathBuf;
use tracing::info;

use crate::config::Config;
use crate::staging::StagingDir;
use crate::task::load_task_list;
use crate::workflow::{Orchestrator, WorkflowOptions};
use crate::ytdlp::YtDlp;

use super::shutdown_signal;

/// Command to download the listed URLs into the staging directory only
pub struct DownloadCommand {
    urls_file: PathBuf,
    config: Config,
    background_mode: bool,
}

impl DownloadCommand {
    pub fn new(urls_file: PathBuf, config: Config, background_mode: bool) -> Self {
        Self {
            urls_file,
            config,
            background_mode,
        }
    }

    pub async fn execute(&self) -> Result<()> {
        let tasks = load_task_list(&self.urls_file).await?;
        if tasks.is_empty() {
            info!("No video URLs found in {:?}.", self.urls_file);
            return Ok(());
        }

        let staging = StagingDir::new(self.config.download_dir.clone());
        staging.init().await?;

        let downloader = YtDlp::new(self.config.downloader.clone(), self.background_mode);
        // Nothing is uploaded here, so staged files must survive until the upload command
        let options = WorkflowOptions {
            delete_after_upload: false,
            max_staged_files: 0,
        };

        info!("Starting download of {} videos...", tasks.len());
        let summary = Orchestrator::new(&staging, options)
            .with_downloader(&downloader)
            .run(tasks, shutdown_signal())
            .await;

        summary.log();
        info!("All download attempts completed.");

        summary.ensure_success("downloads")?;
        Ok(())
    }
}
