use anyhow::{anyhow, Result};
use serde::Serialize;
use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use tracing::{error, info, warn};

use crate::staging::StagingDir;
use crate::task::{FailureStage, TaskStatus, VideoTask};
use crate::upload::Uploader;
use crate::ytdlp::Downloader;

/// Knobs that differ between the run, download and upload commands
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorkflowOptions {
    /// Delete the staged file once its upload succeeded
    pub delete_after_upload: bool,
    /// Prune the staging directory to this many files after each task; 0 disables
    pub max_staged_files: usize,
}

impl Default for WorkflowOptions {
    fn default() -> Self {
        Self {
            delete_after_upload: true,
            max_staged_files: 10,
        }
    }
}

/// Drives each task through download and then upload, one at a time
pub struct Orchestrator<'a> {
    staging: &'a StagingDir,
    downloader: Option<&'a dyn Downloader>,
    uploader: Option<&'a dyn Uploader>,
    options: WorkflowOptions,
}

impl<'a> Orchestrator<'a> {
    pub fn new(staging: &'a StagingDir, options: WorkflowOptions) -> Self {
        Self {
            staging,
            downloader: None,
            uploader: None,
            options,
        }
    }

    pub fn with_downloader(mut self, downloader: &'a dyn Downloader) -> Self {
        self.downloader = Some(downloader);
        self
    }

    pub fn with_uploader(mut self, uploader: &'a dyn Uploader) -> Self {
        self.uploader = Some(uploader);
        self
    }

    /// Process every task in order. Individual failures are recorded and the
    /// run moves on. `shutdown` is checked before each download and before
    /// each upload; a step already running is allowed to finish.
    pub async fn run<F>(&self, mut tasks: Vec<VideoTask>, shutdown: F) -> RunSummary
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut stopped = false;
        let total = tasks.len();

        for (index, task) in tasks.iter_mut().enumerate() {
            if let TaskStatus::Failed { reason, .. } = &task.status {
                warn!("⚠️ SKIPPING [{}/{}]: {}", index + 1, total, reason);
                continue;
            }

            if shutdown_requested(&mut shutdown, &mut stopped).await {
                info!("🛑 Shutdown signal received. Stopping after {} of {} tasks.", index, total);
                break;
            }

            info!("--- Processing video {}/{}: {} ---", index + 1, total, task.source);

            if task.is_pending() {
                self.download_step(task).await;
            }

            if task.status == TaskStatus::Downloaded && self.uploader.is_some() {
                if shutdown_requested(&mut shutdown, &mut stopped).await {
                    info!("🛑 Shutdown signal received. {} stays staged for a later upload.", task.source);
                    break;
                }
                self.upload_step(task).await;
            }

            if let Err(e) = self.staging.prune(self.options.max_staged_files).await {
                error!("Error during cleanup: {}", e);
            }
        }

        let mut summary = RunSummary::new(tasks);
        summary.interrupted = stopped;
        summary
    }

    async fn download_step(&self, task: &mut VideoTask) {
        let Some(downloader) = self.downloader else {
            task.mark_failed(FailureStage::Download, "no downloader configured");
            return;
        };

        match downloader.download(&task.source, &self.staging.root).await {
            Ok(path) => {
                info!("Successfully downloaded: {}", task.source);
                task.mark_downloaded(path);
            }
            Err(e) => {
                error!("❌ Error downloading {}: {:#}", task.source, e);
                task.mark_failed(FailureStage::Download, format!("{e:#}"));
            }
        }
    }

    async fn upload_step(&self, task: &mut VideoTask) {
        let (Some(uploader), Some(path)) = (self.uploader, task.local_path.clone()) else {
            return;
        };

        match uploader.upload(&path).await {
            Ok(link) => {
                if let Err(e) = task.mark_uploaded(link) {
                    task.mark_failed(FailureStage::Upload, e.to_string());
                    return;
                }
                info!("🎉 Upload complete: {:?} -> {}", path, task.link().unwrap_or_default());

                if self.options.delete_after_upload {
                    match tokio::fs::remove_file(&path).await {
                        Ok(_) => info!("Removed downloaded file: {:?}", path),
                        Err(e) => warn!("Error removing downloaded file {:?}: {}", path, e),
                    }
                }
            }
            Err(e) => {
                error!("❌ Failed to upload {:?}: {:#}", path, e);
                task.mark_failed(FailureStage::Upload, format!("{e:#}"));
            }
        }
    }
}

/// Check `shutdown` without waiting on it. Once it has fired the answer stays true.
async fn shutdown_requested<F>(shutdown: &mut Pin<&mut F>, stopped: &mut bool) -> bool
where
    F: Future<Output = ()>,
{
    if !*stopped {
        *stopped = tokio::select! {
            biased;
            _ = shutdown.as_mut() => true,
            _ = std::future::ready(()) => false,
        };
    }
    *stopped
}

/// Outcome tally of one run
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub total: usize,
    pub uploaded: usize,
    pub downloaded: usize,
    pub failed: usize,
    pub pending: usize,
    /// Set when a shutdown signal stopped the run early
    pub interrupted: bool,
    pub tasks: Vec<VideoTask>,
}

impl RunSummary {
    pub fn new(tasks: Vec<VideoTask>) -> Self {
        let count = |f: fn(&TaskStatus) -> bool| tasks.iter().filter(|t| f(&t.status)).count();
        Self {
            total: tasks.len(),
            uploaded: count(|s| matches!(s, TaskStatus::Uploaded { .. })),
            downloaded: count(|s| matches!(s, TaskStatus::Downloaded)),
            failed: count(|s| matches!(s, TaskStatus::Failed { .. })),
            pending: count(|s| matches!(s, TaskStatus::Pending)),
            interrupted: false,
            tasks,
        }
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }

    /// Every task was taken to its final state and nothing was left behind by a shutdown
    pub fn is_complete(&self) -> bool {
        !self.interrupted && self.pending == 0
    }

    /// Turn the tally into the command's outcome. `what` names the unit, e.g. "uploads".
    pub fn ensure_success(&self, what: &str) -> Result<()> {
        if self.has_failures() {
            return Err(anyhow!("{} of {} {} failed", self.failed, self.total, what));
        }
        if !self.is_complete() {
            return Err(anyhow!(
                "Run interrupted: {} of {} {} not started",
                self.pending,
                self.total,
                what
            ));
        }
        Ok(())
    }

    pub fn failed_tasks(&self) -> impl Iterator<Item = &VideoTask> {
        self.tasks.iter().filter(|t| t.is_failed())
    }

    /// Log the per-run tally and every failure
    pub fn log(&self) {
        info!("--- Run Summary ---");
        info!("Total tasks: {}", self.total);
        info!("Downloaded (not uploaded): {}", self.downloaded);
        info!("Successfully uploaded: {}", self.uploaded);
        for task in &self.tasks {
            if let Some(link) = task.link() {
                info!("  {} -> {}", task.source, link);
            }
        }
        if self.pending > 0 {
            warn!("Not processed: {}", self.pending);
        }
        if self.interrupted {
            warn!("Run was interrupted by a shutdown signal");
        }
        if self.has_failures() {
            warn!("Failed: {}", self.failed);
            for task in self.failed_tasks() {
                if let TaskStatus::Failed { stage, reason } = &task.status {
                    warn!("  [{}] {}: {}", stage, task.source, reason);
                }
            }
        } else {
            info!("✅ No failures.");
        }
    }

    /// Write the summary as pretty JSON
    pub async fn write_report(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, json).await?;
        info!("Wrote run report: {:?}", path);
        Ok(())
    }
}
