use anyhow::Result;
use std::path::PathBuf;
use tracing::info;

use crate::config::Config;
use crate::staging::StagingDir;
use crate::task::load_task_list;
use crate::upload::StreamtapeClient;
use crate::workflow::{Orchestrator, WorkflowOptions};
use crate::ytdlp::YtDlp;

use super::shutdown_signal;

/// Command to download every listed URL and upload the results
pub struct RunCommand {
    urls_file: PathBuf,
    config: Config,
    keep_files: bool,
    report: Option<PathBuf>,
    background_mode: bool,
}

impl RunCommand {
    pub fn new(
        urls_file: PathBuf,
        config: Config,
        keep_files: bool,
        report: Option<PathBuf>,
        background_mode: bool,
    ) -> Self {
        Self {
            urls_file,
            config,
            keep_files,
            report,
            background_mode,
        }
    }

    pub async fn execute(&self) -> Result<()> {
        info!("--- Starting the video processing workflow ---");

        let tasks = load_task_list(&self.urls_file).await?;
        if tasks.is_empty() {
            info!("No video URLs found in {:?}.", self.urls_file);
            return Ok(());
        }

        // Credentials are checked before anything is downloaded
        let uploader = StreamtapeClient::new(&self.config.streamtape)?;
        let downloader = YtDlp::new(self.config.downloader.clone(), self.background_mode);

        let staging = StagingDir::new(self.config.download_dir.clone());
        staging.init().await?;

        let options = WorkflowOptions {
            delete_after_upload: !self.keep_files,
            max_staged_files: self.config.max_staged_files,
        };

        info!("Starting processing of {} videos...", tasks.len());
        let summary = Orchestrator::new(&staging, options)
            .with_downloader(&downloader)
            .with_uploader(&uploader)
            .run(tasks, shutdown_signal())
            .await;

        summary.log();
        if let Some(report) = &self.report {
            summary.write_report(report).await?;
        }

        summary.ensure_success("videos")?;

        info!("--- Video processing workflow completed ---");
        Ok(())
    }
}
