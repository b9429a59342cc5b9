//! Common traits and types for the external collaborators

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A durable copy of an uploaded image held by the asset host
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HostedAsset {
    /// HTTPS URL of the stored asset
    pub secure_url: String,

    /// Host-assigned identifier
    pub public_id: String,
}

/// Text-to-image generation service
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    /// Provider name used in logs
    fn name(&self) -> &str;

    /// Generate one image from an instruction and return its hosted URL
    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// Asset-hosting service that stores base64 image bytes
#[async_trait]
pub trait AssetHost: Send + Sync {
    /// Provider name used in logs
    fn name(&self) -> &str;

    /// Store the image under `folder` and return where it now lives
    async fn upload(&self, image_base64: &str, folder: &str) -> Result<HostedAsset>;
}
