//! Application settings and configuration management

use crate::error::{AppError, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing_subscriber::EnvFilter;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    pub server: ServerConfig,
    pub generation: GenerationConfig,
    #[serde(default)]
    pub hosting: HostingConfig,
    pub client: ClientConfig,
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    /// Upper bound on request bodies; a 4 MiB image is ~5.4 MiB once base64-encoded.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
    #[serde(default = "default_prompt")]
    pub default_prompt: String,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_request_timeout() -> u64 {
    200
}

fn default_max_body_bytes() -> usize {
    8 * 1024 * 1024
}

fn default_prompt() -> String {
    "Create an anime style portrait with soft, dreamlike quality and expressive features"
        .to_string()
}

/// Image-generation provider configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GenerationConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_generation_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_size")]
    pub size: String,
    #[serde(default = "default_style")]
    pub style: String,
    #[serde(default = "default_quality")]
    pub quality: String,
    #[serde(default = "default_generation_timeout")]
    pub timeout_ms: u64,
}

fn default_generation_url() -> String {
    "https://api.openai.com".to_string()
}

fn default_model() -> String {
    "dall-e-3".to_string()
}

fn default_size() -> String {
    "1024x1024".to_string()
}

fn default_style() -> String {
    "vivid".to_string()
}

fn default_quality() -> String {
    "hd".to_string()
}

fn default_generation_timeout() -> u64 {
    120_000
}

/// Asset-hosting provider configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HostingConfig {
    #[serde(default)]
    pub cloud_name: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub api_secret: String,
    #[serde(default = "default_folder")]
    pub folder: String,
    #[serde(default = "default_hosting_url")]
    pub base_url: String,
}

fn default_folder() -> String {
    "portrait-uploads".to_string()
}

fn default_hosting_url() -> String {
    "https://api.cloudinary.com".to_string()
}

impl Default for HostingConfig {
    fn default() -> Self {
        Self {
            cloud_name: String::new(),
            api_key: String::new(),
            api_secret: String::new(),
            folder: default_folder(),
            base_url: default_hosting_url(),
        }
    }
}

impl HostingConfig {
    /// Hosting is only attempted when every credential is present
    pub fn is_configured(&self) -> bool {
        !self.cloud_name.is_empty() && !self.api_key.is_empty() && !self.api_secret.is_empty()
    }
}

/// Settings for the command-line client workflow
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ClientConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_client_timeout")]
    pub timeout_ms: u64,
    #[serde(default = "default_download_dir")]
    pub download_dir: String,
    #[serde(default = "default_file_prefix")]
    pub file_prefix: String,
}

fn default_endpoint() -> String {
    "http://localhost:8080".to_string()
}

fn default_client_timeout() -> u64 {
    120_000
}

fn default_download_dir() -> String {
    ".".to_string()
}

fn default_file_prefix() -> String {
    "anime-portrait".to_string()
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl LoggingConfig {
    /// `RUST_LOG` when set, otherwise the configured level
    pub fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.level))
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

impl Settings {
    /// Load settings from configuration files and environment variables
    pub fn load() -> Result<Self> {
        Self::load_from_path("config/default.toml")
    }

    /// Load settings from a specific configuration file path
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::builder()
            .set_default("server.host", default_host())?
            .set_default("server.port", 8080)?
            .set_default("generation.base_url", default_generation_url())?
            .set_default("client.endpoint", default_endpoint())?
            .set_default("logging.level", default_log_level())?
            .set_default("logging.format", default_log_format())?
            .add_source(File::with_name(path.as_ref().to_str().unwrap_or("config/default")).required(false))
            // Override with environment variables (prefixed with PORTRAIT__)
            .add_source(
                Environment::with_prefix("PORTRAIT")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut settings: Settings = config.try_deserialize()?;
        settings.apply_conventional_env();
        Ok(settings)
    }

    /// Fill empty credentials from the providers' conventional variable names
    fn apply_conventional_env(&mut self) {
        fill_from_env(&mut self.generation.api_key, "OPENAI_API_KEY");
        fill_from_env(&mut self.hosting.cloud_name, "CLOUDINARY_CLOUD_NAME");
        fill_from_env(&mut self.hosting.api_key, "CLOUDINARY_API_KEY");
        fill_from_env(&mut self.hosting.api_secret, "CLOUDINARY_API_SECRET");
    }

    /// Validate the configuration required to run the gateway
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(config_error("Server port cannot be 0"));
        }
        if self.server.max_body_bytes == 0 {
            return Err(config_error("server.max_body_bytes must be positive"));
        }
        if self.generation.api_key.is_empty() {
            return Err(config_error(
                "Generation provider API key is missing (set OPENAI_API_KEY or PORTRAIT__GENERATION__API_KEY)",
            ));
        }
        if !self.generation.base_url.starts_with("http") {
            return Err(config_error(&format!(
                "Generation base URL '{}' must be an http(s) URL",
                self.generation.base_url
            )));
        }

        Ok(())
    }
}

fn fill_from_env(slot: &mut String, var: &str) {
    if slot.is_empty() {
        if let Ok(value) = std::env::var(var) {
            *slot = value;
        }
    }
}

fn config_error(message: &str) -> AppError {
    AppError::Config(config::ConfigError::Message(message.to_string()))
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: default_host(),
                port: default_port(),
                request_timeout_secs: default_request_timeout(),
                max_body_bytes: default_max_body_bytes(),
                default_prompt: default_prompt(),
            },
            generation: GenerationConfig {
                api_key: String::new(),
                base_url: default_generation_url(),
                model: default_model(),
                size: default_size(),
                style: default_style(),
                quality: default_quality(),
                timeout_ms: default_generation_timeout(),
            },
            hosting: HostingConfig::default(),
            client: ClientConfig {
                endpoint: default_endpoint(),
                timeout_ms: default_client_timeout(),
                download_dir: default_download_dir(),
                file_prefix: default_file_prefix(),
            },
            logging: LoggingConfig {
                level: default_log_level(),
                format: default_log_format(),
            },
        }
    }
}
