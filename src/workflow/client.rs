//! Transform client: one request to the gateway per user action

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::error::{AppError, Result};

const GENERIC_FAILURE: &str = "Failed to generate image";

/// Body of `POST /transform`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformRequest {
    pub image_base64: String,
    pub prompt: String,
}

/// Wire shape of the gateway's answer; only read inside [`TransformResult::from_body`]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformResponseBody {
    #[serde(default)]
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Outcome of a single transform attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransformResult {
    Success { result_image_url: String },
    Failure { message: String },
}

impl TransformResult {
    pub fn failure(message: impl Into<String>) -> Self {
        Self::Failure {
            message: message.into(),
        }
    }

    /// Collapse the optional wire fields into a success or a failure
    pub fn from_body(body: TransformResponseBody) -> Self {
        match body {
            TransformResponseBody {
                success: true,
                result_image_url: Some(url),
                ..
            } if !url.is_empty() => Self::Success {
                result_image_url: url,
            },
            TransformResponseBody { error, message, .. } => Self::Failure {
                message: error
                    .filter(|m| !m.is_empty())
                    .or(message.filter(|m| !m.is_empty()))
                    .unwrap_or_else(|| GENERIC_FAILURE.to_string()),
            },
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

/// Anything that can carry out a transform request
#[async_trait]
pub trait Transformer: Send + Sync {
    /// Resolve exactly once; failures are returned as [`TransformResult::Failure`]
    async fn transform(&self, request: &TransformRequest) -> TransformResult;
}

/// HTTP client for the gateway's `/transform` route
pub struct TransformClient {
    client: Client,
    url: String,
    timeout: Duration,
}

impl TransformClient {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let timeout = Duration::from_millis(config.timeout_ms);
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url: format!("{}/transform", config.endpoint.trim_end_matches('/')),
            timeout,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn timed_out(&self) -> TransformResult {
        TransformResult::failure(format!("Transformation timed out after {:?}", self.timeout))
    }

    fn map_error_status(status: StatusCode, body: &str) -> TransformResult {
        match serde_json::from_str::<TransformResponseBody>(body) {
            Ok(parsed) if parsed.error.is_some() || parsed.message.is_some() => {
                TransformResult::from_body(TransformResponseBody {
                    success: false,
                    ..parsed
                })
            }
            _ => TransformResult::failure(format!("Server returned {}", status)),
        }
    }
}

#[async_trait]
impl Transformer for TransformClient {
    async fn transform(&self, request: &TransformRequest) -> TransformResult {
        debug!(url = %self.url, prompt_len = request.prompt.len(), "Sending transform request");

        let response = match self.client.post(&self.url).json(request).send().await {
            Ok(response) => response,
            Err(e) if e.is_timeout() => {
                warn!(error = %e, "Transform request timed out");
                return self.timed_out();
            }
            Err(e) => {
                warn!(error = %e, "Transform request failed");
                return TransformResult::failure(format!("Failed to transform image: {}", e));
            }
        };

        let status = response.status();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) if e.is_timeout() => return self.timed_out(),
            Err(e) => return TransformResult::failure(format!("Failed to transform image: {}", e)),
        };

        if !status.is_success() {
            warn!(status = %status, "Gateway rejected transform");
            return Self::map_error_status(status, &body);
        }

        match serde_json::from_str::<TransformResponseBody>(&body) {
            Ok(parsed) => TransformResult::from_body(parsed),
            Err(e) => {
                warn!(error = %e, "Malformed transform response");
                TransformResult::failure("Malformed response from server")
            }
        }
    }
}
