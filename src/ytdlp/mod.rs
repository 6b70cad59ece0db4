use anyhow::{anyhow, Result};
use async_trait::async_trait;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::OnceLock;
use tokio::process::Command;
use tracing::{debug, error, info};

use crate::config::DownloaderConfig;

/// Something that can fetch a video URL into a local directory
#[async_trait]
pub trait Downloader: Send + Sync {
    /// Download `url` into `dest_dir` and return the path of the finished file
    async fn download(&self, url: &str, dest_dir: &Path) -> Result<PathBuf>;
}

/// yt-dlp wrapper; ffmpeg is used by yt-dlp itself to merge streams
pub struct YtDlp {
    config: DownloaderConfig,
    background_mode: bool,
}

impl YtDlp {
    pub fn new(config: DownloaderConfig, background_mode: bool) -> Self {
        Self {
            config,
            background_mode,
        }
    }

    /// Build base command, wrapped in `nice` for background workers
    fn build_base_command(&self, program: &str) -> Command {
        if self.background_mode {
            let mut c = Command::new("nice");
            c.args(["-n", "19"]);
            c.arg(program);
            c
        } else {
            Command::new(program)
        }
    }

    /// Assemble the full yt-dlp command line for one URL
    fn build_download_command(&self, url: &str, dest_dir: &Path) -> Command {
        let mut cmd = self.build_base_command(&self.config.ytdlp_bin);
        let template = dest_dir.join("%(title)s.%(ext)s");

        cmd.args(["-f", &self.config.format]);
        cmd.args(["--merge-output-format", "mp4"]);
        cmd.arg("--no-playlist");
        cmd.args(["--retries", &self.config.retries.to_string()]);
        cmd.args(["--buffer-size", "16K"]);
        cmd.arg("--newline");
        if let Some(location) = &self.config.ffmpeg_location {
            cmd.args(["--ffmpeg-location", location]);
        }
        cmd.arg("-o");
        cmd.arg(&template);
        cmd.args(["--print", "after_move:filepath"]);
        cmd.arg(url);
        cmd
    }

    /// Report the installed yt-dlp version
    pub async fn version(&self) -> Result<String> {
        tool_version(&self.config.ytdlp_bin, "--version").await
    }

    /// Report the first line of `ffmpeg -version`
    pub async fn ffmpeg_version(&self) -> Result<String> {
        tool_version(&self.config.ffmpeg_bin, "-version").await
    }
}

#[async_trait]
impl Downloader for YtDlp {
    async fn download(&self, url: &str, dest_dir: &Path) -> Result<PathBuf> {
        tokio::fs::create_dir_all(dest_dir).await?;

        let mut cmd = self.build_download_command(url, dest_dir);
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        // Dropping this future must not leave yt-dlp running
        cmd.kill_on_drop(true);

        debug!("Executing yt-dlp command: {:?}", cmd);

        let output = cmd
            .output()
            .await
            .map_err(|e| anyhow!("Failed to launch {}: {e}", self.config.ytdlp_bin))?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        debug!("yt-dlp output: {}", stdout);

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            error!("yt-dlp failed: {}", stderr);
            return Err(anyhow!(
                "yt-dlp exited with {}: {}",
                output.status,
                stderr.trim()
            ));
        }

        let path = resolve_output_path(&stdout)
            .ok_or_else(|| anyhow!("Could not find downloaded file path in yt-dlp output"))?;
        info!("✅ Download successful: {} -> {:?}", url, path);
        Ok(path)
    }
}

async fn tool_version(program: &str, flag: &str) -> Result<String> {
    let output = Command::new(program)
        .arg(flag)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|e| anyhow!("{program} is not available: {e}"))?;

    if !output.status.success() {
        return Err(anyhow!("{program} {flag} exited with {}", output.status));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    Ok(stdout.lines().next().unwrap_or_default().trim().to_string())
}

struct OutputPatterns {
    merger: Regex,
    already: Regex,
    destination: Regex,
}

fn output_patterns() -> &'static OutputPatterns {
    static PATTERNS: OnceLock<OutputPatterns> = OnceLock::new();
    PATTERNS.get_or_init(|| OutputPatterns {
        merger: Regex::new(r#"^\[Merger\] Merging formats into "(.+)"$"#).expect("merger regex"),
        already: Regex::new(r"^\[download\] (.+) has already been downloaded")
            .expect("already-downloaded regex"),
        destination: Regex::new(r"^\[download\] Destination: (.+)$").expect("destination regex"),
    })
}

/// Candidate output paths in yt-dlp stdout, most reliable first.
///
/// Lines printed by `--print after_move:filepath` come first, then merger
/// output, then already-downloaded notices, then download destinations.
/// Within each group later lines win.
pub fn candidate_paths(stdout: &str) -> Vec<PathBuf> {
    let patterns = output_patterns();
    let mut printed = Vec::new();
    let mut merged = Vec::new();
    let mut already = Vec::new();
    let mut destinations = Vec::new();

    for line in stdout.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if let Some(caps) = patterns.merger.captures(line) {
            merged.push(PathBuf::from(&caps[1]));
        } else if let Some(caps) = patterns.already.captures(line) {
            already.push(PathBuf::from(&caps[1]));
        } else if let Some(caps) = patterns.destination.captures(line) {
            destinations.push(PathBuf::from(caps[1].trim()));
        } else if !line.starts_with('[') && !line.starts_with("Deleting original file") {
            printed.push(PathBuf::from(line));
        }
    }

    [printed, merged, already, destinations]
        .into_iter()
        .flat_map(|group| group.into_iter().rev())
        .collect()
}

/// First candidate from yt-dlp stdout that names an existing file
pub fn resolve_output_path(stdout: &str) -> Option<PathBuf> {
    candidate_paths(stdout).into_iter().find(|p| p.is_file())
}
