//! Streamtape upload client.
//!
//! An upload is two requests: `GET /file/ul` hands out a one-shot upload
//! server URL, then the file is posted there as multipart part `file1`.

use async_trait::async_trait;
use regex::Regex;
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client};
use serde::Deserialize;
use std::path::Path;
use std::sync::OnceLock;
use thiserror::Error;
use tokio_util::io::ReaderStream;
use tracing::{debug, info};

use crate::config::StreamtapeConfig;

pub const WATCH_URL_BASE: &str = "https://streamtape.com/v";

/// Something that can publish a local file and return its public link
#[async_trait]
pub trait Uploader: Send + Sync {
    async fn upload(&self, path: &Path) -> anyhow::Result<String>;
}

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Streamtape credentials missing: set STREAMTAPE_API_USERNAME and STREAMTAPE_API_KEY")]
    MissingCredentials,
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Streamtape API error (status {status}): {msg}")]
    Api { status: u16, msg: String },
    #[error("Streamtape response did not contain a file link")]
    MissingLink,
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Common `{status, msg, result}` envelope of every API response
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    status: u16,
    #[serde(default)]
    msg: Option<String>,
    result: Option<T>,
}

impl<T> ApiResponse<T> {
    fn into_result(self) -> Result<T, UploadError> {
        if self.status != 200 {
            return Err(UploadError::Api {
                status: self.status,
                msg: self.msg.unwrap_or_else(|| "Unknown error".to_string()),
            });
        }
        self.result.ok_or_else(|| UploadError::Api {
            status: self.status,
            msg: "response has no result".to_string(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct UploadServer {
    url: String,
}

#[derive(Debug, Deserialize)]
struct UploadedFile {
    #[serde(default)]
    url: Option<String>,
    #[serde(default, alias = "code", alias = "filecode")]
    id: Option<String>,
}

impl UploadedFile {
    fn link(self) -> Result<String, UploadError> {
        match (self.url, self.id) {
            (Some(url), _) if !url.is_empty() => Ok(url),
            (_, Some(code)) if !code.is_empty() => Ok(format!("{WATCH_URL_BASE}/{code}")),
            _ => Err(UploadError::MissingLink),
        }
    }
}

fn unsafe_chars() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^\w\s-]").expect("unsafe chars regex"))
}

fn whitespace() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("whitespace regex"))
}

/// Upload name for a staged file: characters other than word characters,
/// spaces and dashes are dropped, whitespace runs become `_`, the extension is kept.
pub fn clean_filename(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stem = unsafe_chars().replace_all(stem.trim(), "");
    let stem = whitespace().replace_all(stem.trim(), "_");
    let stem = if stem.is_empty() { "video" } else { stem.as_ref() };

    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("{stem}.{}", ext.to_lowercase()),
        None => stem.to_string(),
    }
}

pub struct StreamtapeClient {
    client: Client,
    api_url: String,
    username: String,
    api_key: String,
    folder: Option<String>,
}

impl StreamtapeClient {
    /// Build a client, failing early if credentials are not configured
    pub fn new(config: &StreamtapeConfig) -> Result<Self, UploadError> {
        let (Some(username), Some(api_key)) = (&config.username, &config.api_key) else {
            return Err(UploadError::MissingCredentials);
        };

        let client = Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            username: username.clone(),
            api_key: api_key.clone(),
            folder: config.folder.clone(),
        })
    }

    /// Ask the API for a one-shot upload server URL
    async fn upload_server(&self) -> Result<String, UploadError> {
        let mut query = vec![
            ("login", self.username.as_str()),
            ("key", self.api_key.as_str()),
        ];
        if let Some(folder) = &self.folder {
            query.push(("folder", folder.as_str()));
        }

        let response: ApiResponse<UploadServer> = self
            .client
            .get(format!("{}/file/ul", self.api_url))
            .query(&query)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(response.into_result()?.url)
    }

    /// Upload a file and return its public watch link
    pub async fn upload_file(&self, path: &Path) -> Result<String, UploadError> {
        let io_err = |source| UploadError::Io {
            path: path.display().to_string(),
            source,
        };
        let file = tokio::fs::File::open(path).await.map_err(io_err)?;
        let len = file.metadata().await.map_err(io_err)?.len();
        let file_name = clean_filename(path);

        info!("Starting upload for: {:?} ({} bytes)", path, len);

        let server = self.upload_server().await?;
        debug!("Obtained Streamtape upload URL: {}", server);

        let part = Part::stream_with_length(Body::wrap_stream(ReaderStream::new(file)), len)
            .file_name(file_name);
        let form = Form::new().part("file1", part);

        let response: ApiResponse<UploadedFile> = self
            .client
            .post(&server)
            .multipart(form)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let link = response.into_result()?.link()?;
        info!("File uploaded successfully to Streamtape. URL: {}", link);
        Ok(link)
    }
}

#[async_trait]
impl Uploader for StreamtapeClient {
    async fn upload(&self, path: &Path) -> anyhow::Result<String> {
        Ok(self.upload_file(path).await?)
    }
}
