//! Cloudinary signed-upload client

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::time::Duration;
use tracing::debug;

use crate::config::HostingConfig;
use crate::error::{AppError, Result};
use crate::provider::traits::{AssetHost, HostedAsset};

pub const UPLOAD_TIMEOUT_SECS: u64 = 60;

/// Asset host backed by Cloudinary's image upload endpoint
pub struct CloudinaryHost {
    client: Client,
    cloud_name: String,
    api_key: String,
    api_secret: String,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: String,
    public_id: String,
}

#[derive(Debug, Deserialize)]
struct UploadErrorResponse {
    error: UploadErrorDetail,
}

#[derive(Debug, Deserialize)]
struct UploadErrorDetail {
    message: String,
}

impl CloudinaryHost {
    pub fn new(config: &HostingConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(UPLOAD_TIMEOUT_SECS))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            cloud_name: config.cloud_name.clone(),
            api_key: config.api_key.clone(),
            api_secret: config.api_secret.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn upload_url(&self) -> String {
        format!("{}/v1_1/{}/image/upload", self.base_url, self.cloud_name)
    }
}

/// Hex SHA-256 over the alphabetically sorted signed parameters followed by the secret
pub fn sign_params(params: &[(&str, &str)], secret: &str) -> String {
    let mut sorted = params.to_vec();
    sorted.sort_by(|a, b| a.0.cmp(b.0));

    let to_sign = sorted
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha256::new();
    hasher.update(to_sign.as_bytes());
    hasher.update(secret.as_bytes());
    hex::encode(hasher.finalize())
}

#[async_trait]
impl AssetHost for CloudinaryHost {
    fn name(&self) -> &str {
        "cloudinary"
    }

    async fn upload(&self, image_base64: &str, folder: &str) -> Result<HostedAsset> {
        let timestamp = chrono::Utc::now().timestamp().to_string();
        let signature = sign_params(
            &[("folder", folder), ("timestamp", timestamp.as_str())],
            &self.api_secret,
        );
        let file = format!("data:image/png;base64,{}", image_base64);

        let form = [
            ("file", file.as_str()),
            ("folder", folder),
            ("timestamp", timestamp.as_str()),
            ("api_key", self.api_key.as_str()),
            ("signature", signature.as_str()),
            ("signature_algorithm", "sha256"),
        ];

        debug!(cloud = %self.cloud_name, folder = %folder, "Uploading image to asset host");

        let response = self.client.post(self.upload_url()).form(&form[..]).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<UploadErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or_else(|_| format!("Asset host returned {}", status));
            return Err(AppError::Provider(message));
        }

        let uploaded: UploadResponse = response
            .json()
            .await
            .map_err(|e| AppError::Provider(format!("Failed to parse upload response: {}", e)))?;

        Ok(HostedAsset {
            secure_url: uploaded.secure_url,
            public_id: uploaded.public_id,
        })
    }
}
