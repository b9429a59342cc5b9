//! Result presenter: shows the finished portrait and saves a local copy

use reqwest::Client;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::config::ClientConfig;
use crate::workflow::client::TransformResult;
use crate::workflow::controller::WorkflowController;
use crate::workflow::encoder;

const DOWNLOAD_TIMEOUT_SECS: u64 = 60;

/// Saving the result failed; the displayed result is unaffected
#[derive(Error, Debug)]
pub enum DownloadError {
    #[error("Failed to download image: {0}")]
    Fetch(#[from] reqwest::Error),

    #[error("Failed to download image: server returned {0}")]
    Status(reqwest::StatusCode),

    #[error("Failed to download image: invalid data URL")]
    InvalidDataUrl,

    #[error("Failed to save image: {0}")]
    Write(#[from] std::io::Error),
}

pub struct ResultPresenter {
    http: Client,
    download_dir: PathBuf,
    file_prefix: String,
}

impl ResultPresenter {
    pub fn new(download_dir: impl Into<PathBuf>, file_prefix: impl Into<String>) -> Self {
        let http = Client::builder()
            .timeout(Duration::from_secs(DOWNLOAD_TIMEOUT_SECS))
            .build()
            .unwrap_or_default();

        Self {
            http,
            download_dir: download_dir.into(),
            file_prefix: file_prefix.into(),
        }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(&config.download_dir, &config.file_prefix)
    }

    pub fn download_dir(&self) -> &Path {
        &self.download_dir
    }

    /// Text shown to the user for a result
    pub fn render(&self, result: &TransformResult) -> String {
        match result {
            TransformResult::Success { result_image_url } => {
                format!("Your anime portrait is ready: {}", result_image_url)
            }
            TransformResult::Failure { message } => {
                format!("Transformation failed: {} (try again)", message)
            }
        }
    }

    /// Re-fetch the image at `url` and write it under the download directory
    pub async fn download(&self, url: &str) -> Result<PathBuf, DownloadError> {
        let bytes = self.fetch(url).await?;

        let ext = encoder::detect_image_format(&bytes).unwrap_or("png");

        tokio::fs::create_dir_all(&self.download_dir).await?;
        let path = self
            .write_new(chrono::Utc::now().timestamp_millis(), ext, &bytes)
            .await?;

        info!(path = %path.display(), size = bytes.len(), "Saved portrait");
        Ok(path)
    }

    /// `<prefix>-<millis>.<ext>`, or `<prefix>-<millis>-<n>.<ext>` for the n-th clash
    pub fn file_name(&self, millis: i64, attempt: u32, ext: &str) -> String {
        match attempt {
            0 => format!("{}-{}.{}", self.file_prefix, millis, ext),
            n => format!("{}-{}-{}.{}", self.file_prefix, millis, n, ext),
        }
    }

    /// Write to the first free name; an existing file is never overwritten
    async fn write_new(&self, millis: i64, ext: &str, bytes: &[u8]) -> Result<PathBuf, DownloadError> {
        let mut attempt = 0;
        loop {
            let path = self.download_dir.join(self.file_name(millis, attempt, ext));
            match OpenOptions::new().write(true).create_new(true).open(&path).await {
                Ok(mut file) => {
                    file.write_all(bytes).await?;
                    file.flush().await?;
                    return Ok(path);
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => attempt += 1,
                Err(e) => return Err(e.into()),
            }
        }
    }

    async fn fetch(&self, url: &str) -> Result<Vec<u8>, DownloadError> {
        if url.starts_with("data:") {
            return encoder::decode(url).map_err(|_| DownloadError::InvalidDataUrl);
        }

        debug!(url = %url, "Fetching result for download");
        let response = self.http.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::Status(status));
        }
        Ok(response.bytes().await?.to_vec())
    }

    /// "Start new transform": hand control back to the controller
    pub fn start_new(&self, controller: &WorkflowController) {
        controller.new_transform();
    }
}
