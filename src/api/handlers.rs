//! Route handlers for the transform gateway

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::workflow::client::TransformResponseBody;
use crate::AppState;

const MISSING_IMAGE: &str = "No image provided. Please provide a base64 encoded image.";

/// Incoming transform body; every field is optional on the wire
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformBody {
    #[serde(default)]
    pub image_base64: Option<String>,
    #[serde(default)]
    pub prompt: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

/// `POST /transform`
pub async fn transform(
    State(state): State<Arc<AppState>>,
    body: std::result::Result<Json<TransformBody>, JsonRejection>,
) -> Result<Json<TransformResponseBody>> {
    let Json(body) = body.map_err(|e| AppError::InvalidRequest(e.body_text()))?;
    let request_id = Uuid::new_v4();

    let image_base64 = body
        .image_base64
        .filter(|img| !img.trim().is_empty())
        .ok_or_else(|| AppError::InvalidRequest(MISSING_IMAGE.to_string()))?;

    debug!(%request_id, encoded_len = image_base64.len(), "Transform request received");

    // Hosting the upload is best-effort: a failure is logged and the transform continues.
    if let Some(host) = &state.asset_host {
        match host.upload(&image_base64, &state.settings.hosting.folder).await {
            Ok(asset) => {
                debug!(%request_id, host = host.name(), url = %asset.secure_url, "Upload hosted")
            }
            Err(e) => {
                warn!(%request_id, host = host.name(), error = %e, "Asset upload failed; continuing")
            }
        }
    }

    let prompt = body
        .prompt
        .filter(|p| !p.trim().is_empty())
        .unwrap_or_else(|| state.settings.server.default_prompt.clone());

    let result_image_url = state.generator.generate(&prompt).await.map_err(|e| {
        warn!(%request_id, provider = state.generator.name(), error = %e, "Generation failed");
        e
    })?;

    info!(%request_id, "Image transformed");

    Ok(Json(TransformResponseBody {
        success: true,
        result_image_url: Some(result_image_url),
        message: Some("Image transformed successfully".to_string()),
        error: None,
    }))
}
