//! Upload validation: media type and size gate before anything is read

use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Largest accepted upload, inclusive
pub const MAX_UPLOAD_BYTES: u64 = 4 * 1024 * 1024;

/// Accepted image formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaType {
    Jpeg,
    Png,
    Webp,
}

impl MediaType {
    /// Parse a declared MIME type such as `image/png`
    pub fn from_mime(mime: &str) -> Option<Self> {
        match mime.trim().to_ascii_lowercase().as_str() {
            "image/jpeg" | "image/jpg" => Some(Self::Jpeg),
            "image/png" => Some(Self::Png),
            "image/webp" => Some(Self::Webp),
            _ => None,
        }
    }

    /// Map a file extension to the MIME type it declares
    pub fn mime_for_extension(ext: &str) -> Option<&'static str> {
        match ext.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Some("image/jpeg"),
            "png" => Some("image/png"),
            "webp" => Some("image/webp"),
            "gif" => Some("image/gif"),
            "bmp" => Some("image/bmp"),
            _ => None,
        }
    }

    pub fn mime(&self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Webp => "image/webp",
        }
    }

    /// Subtype used in data URLs (`jpeg`, `png`, `webp`)
    pub fn subtype(&self) -> &'static str {
        match self {
            Self::Jpeg => "jpeg",
            Self::Png => "png",
            Self::Webp => "webp",
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mime())
    }
}

/// Where the bytes of a candidate live
#[derive(Debug, Clone)]
pub enum FileSource {
    Path(PathBuf),
    Memory(Vec<u8>),
}

/// A file the user picked, described by what it declares about itself
#[derive(Debug, Clone)]
pub struct CandidateFile {
    pub name: String,
    pub declared_type: Option<String>,
    pub size: u64,
    pub source: FileSource,
}

impl CandidateFile {
    /// Describe a file on disk from its metadata and extension without reading it
    pub async fn from_path(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let metadata = tokio::fs::metadata(path).await?;
        let declared_type = path
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(MediaType::mime_for_extension)
            .map(String::from);

        Ok(Self {
            name: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            declared_type,
            size: metadata.len(),
            source: FileSource::Path(path.to_path_buf()),
        })
    }

    /// Wrap bytes already in memory
    pub fn from_bytes(name: impl Into<String>, declared_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            declared_type: Some(declared_type.into()),
            size: bytes.len() as u64,
            source: FileSource::Memory(bytes),
        }
    }
}

/// Why a candidate was turned away
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Please upload a valid image file (JPEG, PNG, or WebP)")]
    UnsupportedType { declared: Option<String> },

    #[error("Image size should be less than 4MB")]
    TooLarge { size: u64, limit: u64 },
}

impl ValidationError {
    /// Short machine-friendly reason
    pub fn reason(&self) -> &'static str {
        match self {
            Self::UnsupportedType { .. } => "invalid type",
            Self::TooLarge { .. } => "too large",
        }
    }
}

/// Accept JPEG, PNG or WebP files of at most [`MAX_UPLOAD_BYTES`]
pub fn validate(candidate: &CandidateFile) -> Result<MediaType, ValidationError> {
    let media_type = candidate
        .declared_type
        .as_deref()
        .and_then(MediaType::from_mime)
        .ok_or_else(|| ValidationError::UnsupportedType {
            declared: candidate.declared_type.clone(),
        })?;

    if candidate.size > MAX_UPLOAD_BYTES {
        return Err(ValidationError::TooLarge {
            size: candidate.size,
            limit: MAX_UPLOAD_BYTES,
        });
    }

    Ok(media_type)
}
