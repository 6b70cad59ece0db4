use anyhow::{anyhow, Result};
use tracing::{info, warn};

use crate::config::Config;
use crate::ytdlp::YtDlp;

/// Command to verify the external tools are installed
pub struct CheckCommand {
    config: Config,
}

impl CheckCommand {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub async fn execute(&self) -> Result<()> {
        let ytdlp = YtDlp::new(self.config.downloader.clone(), false);

        let version = ytdlp
            .version()
            .await
            .map_err(|e| anyhow!("yt-dlp check failed: {e}"))?;
        info!("✅ yt-dlp {}", version);

        match ytdlp.ffmpeg_version().await {
            Ok(version) => info!("✅ {}", version),
            Err(e) => warn!(
                "⚠️ ffmpeg not found ({}); formats that need merging will fail",
                e
            ),
        }

        if self.config.streamtape.username.is_none() || self.config.streamtape.api_key.is_none() {
            warn!("⚠️ Streamtape credentials are not set; uploads will fail");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DownloaderConfig;

    #[tokio::test]
    async fn test_check_missing_ytdlp() {
        let config = Config {
            downloader: DownloaderConfig {
                ytdlp_bin: "/nonexistent/yt-dlp".to_string(),
                ..Config::default().downloader
            },
            ..Config::default()
        };

        let result = CheckCommand::new(config).execute().await;
        assert!(result.is_err());
    }
}
