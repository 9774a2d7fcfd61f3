use axum::{
    extract::{DefaultBodyLimit, Path, State},
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tower_http::{cors::{Any, CorsLayer}, trace::TraceLayer};

use crate::{
    dispatcher::Dispatcher,
    error::ApiError,
    models::{GenerationStatus, SessionSnapshot, SourceImage, UploadRequest},
    session::SessionStore,
    styles::StyleConfig,
};

#[derive(Clone)]
pub struct AppState {
    pub store: SessionStore,
    pub dispatcher: Dispatcher,
}

pub fn router(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/api/styles", get(list_styles))
        .route("/api/session", post(start_session).get(get_session).delete(new_session))
        .route("/api/session/images/:id/retry", post(retry_image))
        .route("/api/session/images/:id/download", get(download_image))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        )
        .with_state(state)
}

pub async fn list_styles(State(state): State<AppState>) -> Json<&'static [StyleConfig]> {
    Json(state.store.styles())
}

pub async fn get_session(State(state): State<AppState>) -> Json<SessionSnapshot> {
    Json(state.store.snapshot())
}

/// Accepts a portrait and starts generating every style in the background.
pub async fn start_session(
    State(state): State<AppState>,
    Json(body): Json<UploadRequest>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    let image = SourceImage::from_data_url(&body.image)?;
    tracing::info!("📷 New portrait uploaded ({}, {} bytes)", image.mime_type, image.bytes.len());

    let handle = state.store.start(image.clone());
    // Items are Loading once this returns; the workers run in the background.
    state.dispatcher.spawn_batch(image, state.store.styles(), handle);

    Ok(Json(state.store.snapshot()))
}

pub async fn new_session(State(state): State<AppState>) -> Json<SessionSnapshot> {
    let id = state.store.reset();
    tracing::info!(session_id = %id, "🧹 Started new session");
    Json(state.store.snapshot())
}

/// Regenerates one failed style. Runs independently of any batch in flight.
pub async fn retry_image(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    let style = state.store.style(&id).ok_or_else(|| ApiError::UnknownStyle(id.clone()))?;
    let (handle, image) = state.store.begin_retry(style.id)?;
    tracing::info!(style = style.id, "🔄 Retrying style");

    let dispatcher = state.dispatcher.clone();
    tokio::spawn(async move {
        dispatcher.process(&image, style, &handle).await;
    });

    Ok(Json(state.store.snapshot()))
}

/// Serves a finished image as `portrait-<style-id>.png`.
pub async fn download_image(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<Response, ApiError> {
    let style = state.store.style(&id).ok_or_else(|| ApiError::UnknownStyle(id.clone()))?;
    let url = state.store.get(style.id)
        .filter(|img| img.status == GenerationStatus::Success)
        .and_then(|img| img.image_url)
        .ok_or_else(|| ApiError::NotReady(id.clone()))?;
    let image = SourceImage::from_data_url(&url).map_err(|_| ApiError::NotReady(id.clone()))?;

    let disposition = format!("attachment; filename=\"portrait-{}.png\"", style.id);
    let headers = [
        (header::CONTENT_TYPE, HeaderValue::from_static("image/png")),
        (header::CONTENT_DISPOSITION, HeaderValue::from_str(&disposition).map_err(|_| ApiError::NotReady(id))?),
    ];
    Ok((headers, image.bytes).into_response())
}
