use anyhow::{anyhow, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use uuid::Uuid;

/// Step of the workflow at which a task failed
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FailureStage {
    Validate,
    Download,
    Upload,
}

impl fmt::Display for FailureStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FailureStage::Validate => "validate",
            FailureStage::Download => "download",
            FailureStage::Upload => "upload",
        };
        f.write_str(name)
    }
}

/// Progress of a single video through the workflow
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Downloaded,
    Uploaded { link: String },
    Failed { stage: FailureStage, reason: String },
}

/// A video source moving through download and upload
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VideoTask {
    pub id: Uuid,
    pub source: String,
    pub local_path: Option<PathBuf>,
    pub status: TaskStatus,
}

impl VideoTask {
    /// Create a pending task, or a task already failed at validation if the
    /// source is not an http(s) URL
    pub fn new(source: impl Into<String>) -> Self {
        let source = source.into();
        let status = if is_valid_source(&source) {
            TaskStatus::Pending
        } else {
            TaskStatus::Failed {
                stage: FailureStage::Validate,
                reason: format!("not an http(s) URL: {source}"),
            }
        };

        Self {
            id: Uuid::new_v4(),
            source,
            local_path: None,
            status,
        }
    }

    /// Task for a file that is already staged locally
    pub fn from_local_file(path: PathBuf) -> Self {
        Self {
            id: Uuid::new_v4(),
            source: path.display().to_string(),
            local_path: Some(path),
            status: TaskStatus::Downloaded,
        }
    }

    pub fn mark_downloaded(&mut self, path: PathBuf) {
        self.local_path = Some(path);
        self.status = TaskStatus::Downloaded;
    }

    /// Record a successful upload. Fails if the task was never downloaded.
    pub fn mark_uploaded(&mut self, link: String) -> Result<()> {
        if self.status != TaskStatus::Downloaded || self.local_path.is_none() {
            return Err(anyhow!(
                "task {} cannot be marked uploaded from state {:?}",
                self.id,
                self.status
            ));
        }
        self.status = TaskStatus::Uploaded { link };
        Ok(())
    }

    pub fn mark_failed(&mut self, stage: FailureStage, reason: impl Into<String>) {
        self.status = TaskStatus::Failed {
            stage,
            reason: reason.into(),
        };
    }

    pub fn is_pending(&self) -> bool {
        self.status == TaskStatus::Pending
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.status, TaskStatus::Failed { .. })
    }

    pub fn link(&self) -> Option<&str> {
        match &self.status {
            TaskStatus::Uploaded { link } => Some(link),
            _ => None,
        }
    }
}

fn source_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^https?://[^\s/$.?#][^\s]*$").expect("valid source regex"))
}

/// Check whether a task list line looks like a downloadable URL
pub fn is_valid_source(source: &str) -> bool {
    source_regex().is_match(source)
}

/// Parse task list content: one URL per line, blank lines and `#` comments skipped
pub fn parse_task_list(content: &str) -> Vec<VideoTask> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(VideoTask::new)
        .collect()
}

/// Read and parse a task list file
pub async fn load_task_list(path: &Path) -> Result<Vec<VideoTask>> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| anyhow!("Failed to read task list {path:?}: {e}"))?;
    Ok(parse_task_list(&content))
}
