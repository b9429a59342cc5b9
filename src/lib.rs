//! Photo-to-anime portrait transform
//!
//! The gateway half forwards an uploaded photo and a style instruction to an
//! image-generation provider, best-effort hosting the upload on the way. The
//! workflow half is the client that validates, encodes, and sends one transform
//! per user action, then presents and saves the result.

pub mod api;
pub mod config;
pub mod error;
pub mod provider;
pub mod workflow;

pub use error::{AppError, Result};

use std::sync::Arc;

use provider::cloudinary::CloudinaryHost;
use provider::openai::OpenAiGenerator;
use provider::{AssetHost, ImageGenerator};

/// Application state shared across all handlers
pub struct AppState {
    pub settings: config::Settings,
    pub generator: Arc<dyn ImageGenerator>,
    pub asset_host: Option<Arc<dyn AssetHost>>,
}

impl AppState {
    /// Wire the configured providers; hosting is skipped without credentials
    pub fn from_settings(settings: config::Settings) -> Result<Self> {
        let generator: Arc<dyn ImageGenerator> =
            Arc::new(OpenAiGenerator::new(&settings.generation)?);

        let asset_host: Option<Arc<dyn AssetHost>> = if settings.hosting.is_configured() {
            Some(Arc::new(CloudinaryHost::new(&settings.hosting)?))
        } else {
            None
        };

        Ok(Self {
            settings,
            generator,
            asset_host,
        })
    }
}
