use anyhow::Result;
use std::path::PathBuf;
use tracing::info;

use crate::config::Config;
use crate::staging::StagingDir;
use crate::task::VideoTask;
use crate::upload::StreamtapeClient;
use crate::workflow::{Orchestrator, WorkflowOptions};

use super::shutdown_signal;

/// Command to upload every video already sitting in the staging directory
pub struct UploadCommand {
    config: Config,
    keep_files: bool,
    report: Option<PathBuf>,
}

impl UploadCommand {
    pub fn new(config: Config, keep_files: bool, report: Option<PathBuf>) -> Self {
        Self {
            config,
            keep_files,
            report,
        }
    }

    pub async fn execute(&self) -> Result<()> {
        let staging = StagingDir::new(self.config.download_dir.clone());
        let files = staging.video_files()?;
        if files.is_empty() {
            info!("No video files found in {:?}.", staging.root);
            return Ok(());
        }

        let uploader = StreamtapeClient::new(&self.config.streamtape)?;
        let options = WorkflowOptions {
            delete_after_upload: !self.keep_files,
            max_staged_files: 0,
        };

        info!("📤 Uploading {} files from {:?}", files.len(), staging.root);
        let tasks = files.into_iter().map(VideoTask::from_local_file).collect();
        let summary = Orchestrator::new(&staging, options)
            .with_uploader(&uploader)
            .run(tasks, shutdown_signal())
            .await;

        summary.log();
        if let Some(report) = &self.report {
            summary.write_report(report).await?;
        }

        summary.ensure_success("uploads")?;

        info!("✅ All videos uploaded successfully!");
        Ok(())
    }
}
