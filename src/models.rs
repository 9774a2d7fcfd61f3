use base64::Engine;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ImageInputError;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum GenerationStatus {
    Idle,
    Loading,
    Success,
    Error,
}

/// Per-style result record. `id` correlates to `StyleConfig::id`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct GeneratedImage {
    pub id: String,
    pub status: GenerationStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// A status transition for a single item.
#[derive(Debug, Clone, PartialEq)]
pub enum ItemUpdate {
    Loading,
    Succeeded(String),
    Failed(String),
    Reset,
}

impl GeneratedImage {
    pub fn idle(id: impl Into<String>) -> Self {
        Self { id: id.into(), status: GenerationStatus::Idle, image_url: None, error: None, updated_at: Utc::now() }
    }

    /// Returns the record after `update`. Every variant rewrites both
    /// `image_url` and `error`, so status and payload never disagree.
    pub fn apply(self, update: ItemUpdate) -> Self {
        let (status, image_url, error) = match update {
            ItemUpdate::Loading => (GenerationStatus::Loading, None, None),
            ItemUpdate::Succeeded(url) => (GenerationStatus::Success, Some(url), None),
            ItemUpdate::Failed(msg) => (GenerationStatus::Error, None, Some(msg)),
            ItemUpdate::Reset => (GenerationStatus::Idle, None, None),
        };
        Self { id: self.id, status, image_url, error, updated_at: Utc::now() }
    }
}

/// Decoded upload: raw bytes plus the declared MIME type.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceImage {
    pub mime_type: String,
    pub bytes: Bytes,
}

impl SourceImage {
    /// Parses `data:<mime>;base64,<payload>`. Only `image/*` types are accepted.
    pub fn from_data_url(url: &str) -> Result<Self, ImageInputError> {
        let rest = url.strip_prefix("data:").ok_or(ImageInputError::Malformed)?;
        let (header, payload) = rest.split_once(',').ok_or(ImageInputError::Malformed)?;
        let mime_type = header.strip_suffix(";base64").ok_or(ImageInputError::Malformed)?;
        if !mime_type.starts_with("image/") {
            return Err(ImageInputError::NotAnImage(mime_type.to_string()));
        }
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(payload.trim())
            .map_err(|_| ImageInputError::Malformed)?;
        Ok(Self { mime_type: mime_type.to_string(), bytes: Bytes::from(bytes) })
    }

    pub fn to_data_url(&self) -> String {
        encode_data_url(&self.mime_type, &self.bytes)
    }
}

pub fn encode_data_url(mime_type: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime_type, base64::engine::general_purpose::STANDARD.encode(bytes))
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct UploadRequest {
    /// Data URL of the portrait, as produced by a browser `FileReader`.
    pub image: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SessionSnapshot {
    pub session_id: Uuid,
    pub original_image: Option<String>,
    pub images: Vec<GeneratedImage>,
}
