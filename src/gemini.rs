use async_trait::async_trait;
use base64::Engine;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, error, info};

use crate::config::Config;
use crate::models::SourceImage;

/// Appended to every style prompt so the subject stays recognisable.
pub const IDENTITY_DIRECTIVE: &str = "Keep the facial features resembling the original person but change the style, clothing, and background completely to match the description. High quality, detailed.";

/// Content type declared for the uploaded portrait.
const UPLOAD_MIME_TYPE: &str = "image/jpeg";

#[derive(Debug, Error)]
pub enum GeminiError {
    #[error("HTTP error: {0}")] Http(String),
    #[error("no API key configured")] MissingApiKey,
    #[error("no image data found in response")] NoImage,
    #[error("Other: {0}")] Other(String),
}

/// Anything that can restyle a portrait with a prompt.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    /// Returns a displayable data URL for the generated image.
    async fn generate_styled_photo(&self, image: &SourceImage, prompt: &str) -> Result<String, GeminiError>;
}

// Helper function to truncate base64 data in JSON for cleaner logging
fn truncate_base64_in_json(value: &mut serde_json::Value) {
    match value {
        serde_json::Value::Object(map) => {
            for (key, val) in map.iter_mut() {
                if key == "data" {
                    if let serde_json::Value::String(s) = val {
                        if s.len() > 100 && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '/' || c == '=') {
                            *val = serde_json::Value::String(format!("{}...[truncated {} chars]", &s[..50], s.len() - 50));
                        }
                    }
                } else {
                    truncate_base64_in_json(val);
                }
            }
        }
        serde_json::Value::Array(arr) => {
            for val in arr.iter_mut() {
                truncate_base64_in_json(val);
            }
        }
        _ => {}
    }
}

fn loggable(value: &serde_json::Value) -> String {
    let mut copy = value.clone();
    truncate_base64_in_json(&mut copy);
    copy.to_string()
}

pub struct GeminiClient {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    model: String,
}

impl GeminiClient {
    pub fn new(config: &Config) -> Self {
        Self {
            client: Client::new(),
            api_key: config.api_key.clone(),
            base_url: config.api_base.trim_end_matches('/').to_string(),
            model: config.model.clone(),
        }
    }

    pub fn build_prompt(style_prompt: &str) -> String {
        format!("{style_prompt} {IDENTITY_DIRECTIVE}")
    }

    pub fn build_request_body(image: &SourceImage, style_prompt: &str) -> serde_json::Value {
        json!({
            "contents": [{
                "parts": [
                    {
                        "inlineData": {
                            "mimeType": UPLOAD_MIME_TYPE,
                            "data": base64::engine::general_purpose::STANDARD.encode(&image.bytes),
                        }
                    },
                    { "text": Self::build_prompt(style_prompt) }
                ]
            }],
            "generationConfig": {
                "responseModalities": ["TEXT", "IMAGE"],
                "candidateCount": 1
            }
        })
    }

    async fn perform_api_call(&self, api_key: &str, body: &serde_json::Value) -> Result<String, GeminiError> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        info!("🔗 Making request to: {}", url);
        debug!("📤 Request body: {}", loggable(body));

        let response = self.client
            .post(&url)
            .query(&[("key", api_key)])
            .json(body)
            .send()
            .await
            .map_err(|e| GeminiError::Http(e.to_string()))?;

        let status = response.status();
        info!("📥 Response status: {}", status);

        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            error!("❌ API Error response: {}", error_body);
            return Err(GeminiError::Http(format!("status={} body={}", status, error_body)));
        }

        let response_text = response.text().await
            .map_err(|e| GeminiError::Http(e.to_string()))?;

        let parsed: GeminiResponse = serde_json::from_str(&response_text)
            .map_err(|e| GeminiError::Other(format!("parse error: {}", e)))?;

        if tracing::enabled!(tracing::Level::DEBUG) {
            if let Ok(value) = serde_json::from_str::<serde_json::Value>(&response_text) {
                debug!("📥 Raw Gemini API response: {}", loggable(&value));
            }
        }

        extract_first_image_b64(&parsed).ok_or(GeminiError::NoImage)
    }
}

#[async_trait]
impl ImageGenerator for GeminiClient {
    async fn generate_styled_photo(&self, image: &SourceImage, prompt: &str) -> Result<String, GeminiError> {
        let api_key = self.api_key.as_deref().ok_or(GeminiError::MissingApiKey)?;
        let body = Self::build_request_body(image, prompt);
        let data = self.perform_api_call(api_key, &body).await?;
        info!("🖼️ Generated image ({} base64 chars)", data.len());
        Ok(format!("data:image/png;base64,{}", data))
    }
}

// --- Response Parsing Helpers ---

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate { #[serde(default)] content: Content }

#[derive(Debug, Deserialize, Default)]
struct Content { #[serde(default)] parts: Vec<Part> }

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Part {
    Inline {
        #[serde(rename = "inlineData")]
        inline_data: InlineData
    },
    Text { text: String },
    Other(#[allow(dead_code)] serde_json::Value)
}

#[derive(Debug, Deserialize)]
struct InlineData {
    #[serde(default)]
    data: String,
    #[serde(rename = "mimeType", default)]
    mime_type: String,
}

fn extract_first_image_b64(resp: &GeminiResponse) -> Option<String> {
    for c in &resp.candidates {
        for p in &c.content.parts {
            match p {
                Part::Inline { inline_data } if !inline_data.data.is_empty() => {
                    debug!("🎯 Found image data with mime type: {}", inline_data.mime_type);
                    return Some(inline_data.data.clone());
                }
                Part::Text { text } => debug!("model said: {}", text),
                _ => {}
            }
        }
    }
    info!("⚠️ No inline image data found in response structure");
    None
}
