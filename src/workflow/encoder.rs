//! Base64 encoding of accepted uploads and data-URL helpers

use base64::{engine::general_purpose::STANDARD, Engine};
use thiserror::Error;
use tracing::debug;

use crate::workflow::validator::{CandidateFile, FileSource, MediaType};

/// The file could not be turned into its transmissible form
#[derive(Error, Debug)]
pub enum EncodingError {
    #[error("Failed to process image: {0}")]
    Read(#[from] std::io::Error),

    #[error("Failed to process image: encoder task aborted")]
    Aborted,
}

/// An accepted upload together with its encoded and preview forms
#[derive(Debug, Clone)]
pub struct EncodedImage {
    pub media_type: MediaType,
    pub bytes: Vec<u8>,
    pub base64: String,
    pub preview: String,
}

/// Read the candidate's bytes and produce its base64 body and preview data URL
pub async fn encode(
    candidate: &CandidateFile,
    media_type: MediaType,
) -> Result<EncodedImage, EncodingError> {
    let bytes = match &candidate.source {
        FileSource::Path(path) => tokio::fs::read(path).await?,
        FileSource::Memory(bytes) => bytes.clone(),
    };

    // Keep base64 work off the task that drives the workflow.
    let (bytes, base64) = tokio::task::spawn_blocking(move || {
        let encoded = encode_bytes(&bytes);
        (bytes, encoded)
    })
    .await
    .map_err(|_| EncodingError::Aborted)?;

    let preview = create_data_url(&base64, media_type);
    debug!(name = %candidate.name, size = bytes.len(), "Encoded upload");

    Ok(EncodedImage {
        media_type,
        bytes,
        base64,
        preview,
    })
}

/// Encode binary data to base64 string
pub fn encode_bytes(data: &[u8]) -> String {
    STANDARD.encode(data)
}

fn strip_data_url(encoded: &str) -> &str {
    match encoded.split_once(',') {
        Some((_, payload)) => payload,
        None => encoded,
    }
}

/// Decode base64 string to binary data, accepting a `data:` URL prefix
pub fn decode(encoded: &str) -> Result<Vec<u8>, base64::DecodeError> {
    STANDARD.decode(strip_data_url(encoded).trim())
}

/// Wrap an already encoded body in a data URL for `media_type`
pub fn create_data_url(base64: &str, media_type: MediaType) -> String {
    format!("data:image/{};base64,{}", media_type.subtype(), base64)
}

/// Detect image format from binary data using magic bytes
pub fn detect_image_format(data: &[u8]) -> Option<&'static str> {
    if data.len() < 8 {
        return None;
    }

    // PNG: 89 50 4E 47 0D 0A 1A 0A
    if data.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
        return Some("png");
    }

    // JPEG: FF D8 FF
    if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return Some("jpg");
    }

    // WebP: RIFF....WEBP
    if data.len() >= 12 && data.starts_with(b"RIFF") && &data[8..12] == b"WEBP" {
        return Some("webp");
    }

    if data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a") {
        return Some("gif");
    }

    None
}
