use axum::{http::StatusCode, response::{IntoResponse, Response}, Json};
use serde_json::json;
use thiserror::Error;

pub const NOT_AN_IMAGE_MESSAGE: &str = "Please upload an image file (JPEG, PNG).";

#[derive(Debug, Error)]
pub enum ImageInputError {
    #[error("unsupported content type: {0}")] NotAnImage(String),
    #[error("malformed data URL")] Malformed,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)] InvalidImage(#[from] ImageInputError),
    #[error("unknown style: {0}")] UnknownStyle(String),
    #[error("no portrait uploaded in this session")] NoOriginalImage,
    #[error("style {0} has not failed")] NotRetryable(String),
    #[error("no generated image for style {0}")] NotReady(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::InvalidImage(ImageInputError::NotAnImage(_)) => (StatusCode::BAD_REQUEST, NOT_AN_IMAGE_MESSAGE.to_string()),
            ApiError::InvalidImage(e) => (StatusCode::BAD_REQUEST, e.to_string()),
            ApiError::UnknownStyle(_) | ApiError::NotReady(_) => (StatusCode::NOT_FOUND, self.to_string()),
            ApiError::NoOriginalImage | ApiError::NotRetryable(_) => (StatusCode::CONFLICT, self.to_string()),
        };
        tracing::warn!(%status, "request rejected: {}", self);
        (status, Json(json!({ "error": message }))).into_response()
    }
}
