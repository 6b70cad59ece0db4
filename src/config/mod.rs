use std::env;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "https://api.streamtape.com";
pub const DEFAULT_FORMAT: &str = "bestvideo[height<=1080]+bestaudio/best[height<=1080]/best";
pub const DEFAULT_DOWNLOAD_DIR: &str = "downloaded_videos";
pub const DEFAULT_URLS_FILE: &str = "youtube_urls.txt";

/// Streamtape account and endpoint settings
#[derive(Debug, Clone, PartialEq)]
pub struct StreamtapeConfig {
    pub username: Option<String>,
    pub api_key: Option<String>,
    pub api_url: String,
    pub folder: Option<String>,
    pub timeout: Duration,
}

/// Settings for the yt-dlp invocation
#[derive(Debug, Clone, PartialEq)]
pub struct DownloaderConfig {
    pub ytdlp_bin: String,
    pub ffmpeg_bin: String,
    /// Passed as `--ffmpeg-location`; yt-dlp needs a real path here, a bare
    /// program name makes it run without ffmpeg
    pub ffmpeg_location: Option<String>,
    pub format: String,
    pub retries: u32,
}

/// Configuration for the downloader, the uploader and the staging area
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub streamtape: StreamtapeConfig,
    pub downloader: DownloaderConfig,
    pub download_dir: PathBuf,
    pub max_staged_files: usize,
}

impl Config {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let ffmpeg_bin = non_empty_var("FFMPEG_BIN");
        let ffmpeg_location = non_empty_var("FFMPEG_LOCATION")
            .or_else(|| ffmpeg_bin.clone().filter(|bin| is_explicit_path(bin)));

        Self {
            streamtape: StreamtapeConfig {
                username: non_empty_var("STREAMTAPE_API_USERNAME"),
                api_key: non_empty_var("STREAMTAPE_API_KEY"),
                api_url: env::var("STREAMTAPE_API_URL")
                    .unwrap_or(defaults.streamtape.api_url),
                folder: non_empty_var("STREAMTAPE_FOLDER"),
                timeout: Duration::from_secs(parse_var(
                    "UPLOAD_TIMEOUT_SECS",
                    defaults.streamtape.timeout.as_secs(),
                )),
            },
            downloader: DownloaderConfig {
                ytdlp_bin: env::var("YTDLP_BIN").unwrap_or(defaults.downloader.ytdlp_bin),
                ffmpeg_bin: ffmpeg_bin.unwrap_or(defaults.downloader.ffmpeg_bin),
                ffmpeg_location,
                format: env::var("YTDLP_FORMAT").unwrap_or(defaults.downloader.format),
                retries: parse_var("YTDLP_RETRIES", defaults.downloader.retries),
            },
            download_dir: env::var("DOWNLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.download_dir),
            max_staged_files: parse_var("MAX_STAGED_FILES", defaults.max_staged_files),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            streamtape: StreamtapeConfig {
                username: None,
                api_key: None,
                api_url: DEFAULT_API_URL.to_string(),
                folder: None,
                timeout: Duration::from_secs(3600),
            },
            downloader: DownloaderConfig {
                ytdlp_bin: "yt-dlp".to_string(),
                ffmpeg_bin: "ffmpeg".to_string(),
                ffmpeg_location: None,
                format: DEFAULT_FORMAT.to_string(),
                retries: 5,
            },
            download_dir: PathBuf::from(DEFAULT_DOWNLOAD_DIR),
            max_staged_files: 10,
        }
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// A bare name like `ffmpeg` is looked up on PATH; anything with a separator is a location
fn is_explicit_path(value: &str) -> bool {
    value.contains('/') || value.contains(std::path::MAIN_SEPARATOR)
}

fn parse_var<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}
