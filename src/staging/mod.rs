use anyhow::{anyhow, Result};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tokio::fs as async_fs;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// File extensions treated as uploadable video
pub const VIDEO_EXTENSIONS: [&str; 5] = ["mp4", "mkv", "avi", "mov", "webm"];

/// Local directory holding downloaded media until it is uploaded
pub struct StagingDir {
    pub root: PathBuf,
}

impl StagingDir {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Create the staging directory if it is missing
    pub async fn init(&self) -> Result<()> {
        if self.root.is_dir() {
            info!("Download directory already exists: {:?}", self.root);
            return Ok(());
        }
        if self.root.exists() {
            return Err(anyhow!(
                "Download path exists but is not a directory: {:?}",
                self.root
            ));
        }

        info!("Creating download directory: {:?}", self.root);
        async_fs::create_dir_all(&self.root).await?;
        Ok(())
    }

    /// Video files directly inside the staging directory, sorted by name
    pub fn video_files(&self) -> Result<Vec<PathBuf>> {
        if !self.root.is_dir() {
            return Err(anyhow!("Download directory does not exist: {:?}", self.root));
        }

        let mut files: Vec<PathBuf> = self
            .regular_files()
            .into_iter()
            .filter(|path| is_video_file(path))
            .collect();
        files.sort();
        Ok(files)
    }

    /// Delete the oldest files until at most `max_files` remain. Zero disables pruning.
    pub async fn prune(&self, max_files: usize) -> Result<usize> {
        if max_files == 0 || !self.root.is_dir() {
            return Ok(0);
        }

        let mut files: Vec<(SystemTime, PathBuf)> = Vec::new();
        for path in self.regular_files() {
            let modified = async_fs::metadata(&path)
                .await
                .and_then(|m| m.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            files.push((modified, path));
        }

        if files.len() <= max_files {
            return Ok(0);
        }

        files.sort();
        let excess = files.len() - max_files;
        let mut removed = 0;
        for (_, path) in files.into_iter().take(excess) {
            match async_fs::remove_file(&path).await {
                Ok(_) => {
                    info!("Cleaned up old file: {:?}", path);
                    removed += 1;
                }
                Err(e) => warn!("Error removing old file {:?}: {}", path, e),
            }
        }
        Ok(removed)
    }

    /// Remove every file in the staging directory, keeping the directory itself
    pub async fn clean(&self) -> Result<usize> {
        if !self.root.is_dir() {
            return Err(anyhow!("Download directory does not exist: {:?}", self.root));
        }

        let mut removed = 0;
        for path in self.regular_files() {
            async_fs::remove_file(&path).await?;
            debug!("Removed staged file: {:?}", path);
            removed += 1;
        }
        Ok(removed)
    }

    fn regular_files(&self) -> Vec<PathBuf> {
        WalkDir::new(&self.root)
            .min_depth(1)
            .max_depth(1)
            .follow_links(false)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .collect()
    }
}

/// Check a path's extension against the known video extensions
pub fn is_video_file(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .is_some_and(|ext| VIDEO_EXTENSIONS.contains(&ext.as_str()))
}
