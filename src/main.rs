//! # vidrelay - Video Download and Upload CLI
//!
//! Downloads videos listed in a text file with yt-dlp, stages them in a local
//! directory and uploads each one to Streamtape.
//!
//! ## Features
//!
//! - **Sequential Workflow**: Every URL is downloaded, then uploaded, before the next one starts
//! - **Failure Isolation**: A failed download or upload is recorded and the run moves on
//! - **Staging Cleanup**: Uploaded files are deleted and the staging directory is kept small
//! - **Configurable**: Credentials, yt-dlp format and limits via environment variables
//! - **Signal Handling**: Graceful shutdown on SIGINT between videos
//!
//! ## Usage
//!
//! ```bash
//! # Download and upload every URL in youtube_urls.txt
//! vidrelay run
//!
//! # Only download
//! vidrelay download --urls my_list.txt
//!
//! # Upload what is already in the staging directory
//! vidrelay upload --dir downloaded_videos
//!
//! # Verify yt-dlp and ffmpeg are installed
//! vidrelay check
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vidrelay::commands::{
    check::CheckCommand, clean::CleanCommand, download::DownloadCommand, run::RunCommand,
    upload::UploadCommand,
};
use vidrelay::config::{Config, DEFAULT_URLS_FILE};

/// vidrelay - Download videos and relay them to Streamtape
#[derive(Parser)]
#[command(
    name = "vidrelay",
    about = "Download videos with yt-dlp and upload them to Streamtape",
    long_about = "Reads one video URL per line, downloads each with yt-dlp into a staging directory and uploads the result to Streamtape.",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Available commands
#[derive(Subcommand)]
enum Commands {
    /// Download every listed URL and upload the results
    Run {
        /// File with one video URL per line
        #[arg(long, short = 'u', default_value = DEFAULT_URLS_FILE)]
        urls: PathBuf,
        /// Staging directory (defaults to $DOWNLOAD_DIR or downloaded_videos)
        #[arg(long, short = 'd')]
        dir: Option<PathBuf>,
        /// Keep staged files after a successful upload
        #[arg(long, short = 'k')]
        keep_files: bool,
        /// Write a JSON run report to this path
        #[arg(long, short = 'r')]
        report: Option<PathBuf>,
        /// Run yt-dlp with low priority
        #[arg(long, short)]
        background: bool,
    },
    /// Download every listed URL into the staging directory
    Download {
        /// File with one video URL per line
        #[arg(long, short = 'u', default_value = DEFAULT_URLS_FILE)]
        urls: PathBuf,
        /// Staging directory (defaults to $DOWNLOAD_DIR or downloaded_videos)
        #[arg(long, short = 'd')]
        dir: Option<PathBuf>,
        /// Run yt-dlp with low priority
        #[arg(long, short)]
        background: bool,
    },
    /// Upload every video file in the staging directory
    Upload {
        /// Staging directory (defaults to $DOWNLOAD_DIR or downloaded_videos)
        #[arg(long, short = 'd')]
        dir: Option<PathBuf>,
        /// Keep files after a successful upload
        #[arg(long, short = 'k')]
        keep_files: bool,
        /// Write a JSON run report to this path
        #[arg(long, short = 'r')]
        report: Option<PathBuf>,
    },
    /// Remove staged files
    Clean {
        /// Staging directory (defaults to $DOWNLOAD_DIR or downloaded_videos)
        #[arg(long, short = 'd')]
        dir: Option<PathBuf>,
        /// Keep this many of the newest files instead of removing all
        #[arg(long)]
        keep: Option<usize>,
    },
    /// Check that yt-dlp and ffmpeg are available
    Check,
}

fn config_with_dir(dir: Option<PathBuf>) -> Config {
    let mut config = Config::from_env();
    if let Some(dir) = dir {
        config.download_dir = dir;
    }
    config
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vidrelay=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run {
            urls,
            dir,
            keep_files,
            report,
            background,
        } => {
            let config = config_with_dir(dir);
            info!(
                "Starting run command for urls: {:?}, dir: {:?}, background: {}",
                urls, config.download_dir, background
            );
            RunCommand::new(urls, config, keep_files, report, background)
                .execute()
                .await
        }
        Commands::Download {
            urls,
            dir,
            background,
        } => {
            let config = config_with_dir(dir);
            info!(
                "Starting download command for urls: {:?}, dir: {:?}",
                urls, config.download_dir
            );
            DownloadCommand::new(urls, config, background).execute().await
        }
        Commands::Upload {
            dir,
            keep_files,
            report,
        } => {
            let config = config_with_dir(dir);
            info!("Starting upload command for dir: {:?}", config.download_dir);
            UploadCommand::new(config, keep_files, report).execute().await
        }
        Commands::Clean { dir, keep } => {
            let config = config_with_dir(dir);
            info!("Starting clean command for dir: {:?}", config.download_dir);
            CleanCommand::new(config.download_dir, keep).execute().await
        }
        Commands::Check => CheckCommand::new(Config::from_env()).execute().await,
    };

    if let Err(e) = result {
        error!("Command failed: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}
