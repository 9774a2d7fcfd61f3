//! In-memory session state shared between the HTTP layer and running jobs.
//!
//! The store holds one `GeneratedImage` per catalog style, keyed by style id.
//! Every write goes through [`SessionStore::update`], which applies a single
//! [`ItemUpdate`] to a single id under the write lock. Jobs hold a
//! [`SessionHandle`] bound to the session they were started for; once the
//! user starts a new session those handles stop having any effect.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::dispatcher::StatusSink;
use crate::error::ApiError;
use crate::models::{GeneratedImage, GenerationStatus, ItemUpdate, SessionSnapshot, SourceImage};
use crate::styles::StyleConfig;

struct SessionState {
    id: Uuid,
    original: Option<SourceImage>,
    images: HashMap<String, GeneratedImage>,
}

#[derive(Clone)]
pub struct SessionStore {
    styles: &'static [StyleConfig],
    inner: Arc<RwLock<SessionState>>,
}

impl SessionStore {
    pub fn new(styles: &'static [StyleConfig]) -> Self {
        let state = SessionState { id: Uuid::new_v4(), original: None, images: idle_images(styles) };
        Self { styles, inner: Arc::new(RwLock::new(state)) }
    }

    pub fn styles(&self) -> &'static [StyleConfig] {
        self.styles
    }

    pub fn style(&self, id: &str) -> Option<&'static StyleConfig> {
        self.styles.iter().find(|s| s.id == id)
    }

    /// Begins a new session for `image`. Items start out `Idle`; the batch
    /// moves them to `Loading`.
    pub fn start(&self, image: SourceImage) -> SessionHandle {
        let mut state = self.inner.write();
        state.id = Uuid::new_v4();
        state.original = Some(image);
        state.images = idle_images(self.styles);
        SessionHandle { store: self.clone(), session_id: state.id }
    }

    /// Moves a failed item back to `Loading` for a retry. The status check
    /// and the transition happen under one write lock, so only one of
    /// several concurrent retries wins.
    pub fn begin_retry(&self, style_id: &str) -> Result<(SessionHandle, SourceImage), ApiError> {
        let mut state = self.inner.write();
        let original = state.original.clone().ok_or(ApiError::NoOriginalImage)?;
        match state.images.remove(style_id) {
            Some(img) if img.status == GenerationStatus::Error => {
                state.images.insert(style_id.to_string(), img.apply(ItemUpdate::Loading));
            }
            Some(img) => {
                state.images.insert(style_id.to_string(), img);
                return Err(ApiError::NotRetryable(style_id.to_string()));
            }
            None => return Err(ApiError::UnknownStyle(style_id.to_string())),
        }
        Ok((SessionHandle { store: self.clone(), session_id: state.id }, original))
    }

    /// Clears the original image and returns every item to `Idle`.
    /// Results from jobs started before the reset are discarded.
    pub fn reset(&self) -> Uuid {
        let mut state = self.inner.write();
        state.id = Uuid::new_v4();
        state.original = None;
        state.images = idle_images(self.styles);
        state.id
    }

    /// A handle for the current session, together with its original image.
    pub fn current(&self) -> Option<(SessionHandle, SourceImage)> {
        let state = self.inner.read();
        let original = state.original.clone()?;
        Some((SessionHandle { store: self.clone(), session_id: state.id }, original))
    }

    pub fn get(&self, style_id: &str) -> Option<GeneratedImage> {
        self.inner.read().images.get(style_id).cloned()
    }

    /// Applies `update` to one item if `session_id` is still current.
    /// Returns whether the update landed.
    pub fn update(&self, session_id: Uuid, style_id: &str, update: ItemUpdate) -> bool {
        let mut state = self.inner.write();
        if state.id != session_id {
            debug!(%session_id, style_id, "discarding update from stale session");
            return false;
        }
        match state.images.remove(style_id) {
            Some(img) => {
                state.images.insert(style_id.to_string(), img.apply(update));
                true
            }
            None => false,
        }
    }

    /// Current state with images in catalog order.
    pub fn snapshot(&self) -> SessionSnapshot {
        let state = self.inner.read();
        SessionSnapshot {
            session_id: state.id,
            original_image: state.original.as_ref().map(SourceImage::to_data_url),
            images: self.styles.iter().filter_map(|s| state.images.get(s.id).cloned()).collect(),
        }
    }
}

fn idle_images(styles: &[StyleConfig]) -> HashMap<String, GeneratedImage> {
    styles.iter().map(|s| (s.id.to_string(), GeneratedImage::idle(s.id))).collect()
}

/// Writes job progress into the session it was created for.
#[derive(Clone)]
pub struct SessionHandle {
    store: SessionStore,
    session_id: Uuid,
}

impl SessionHandle {
    pub fn session_id(&self) -> Uuid {
        self.session_id
    }
}

impl StatusSink for SessionHandle {
    fn apply(&self, style_id: &str, update: ItemUpdate) {
        self.store.update(self.session_id, style_id, update);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::styles::PHOTO_STYLES;
    use bytes::Bytes;
    use pretty_assertions::assert_eq;

    fn image() -> SourceImage {
        SourceImage { mime_type: "image/png".into(), bytes: Bytes::from_static(b"img") }
    }

    fn statuses(store: &SessionStore) -> Vec<GenerationStatus> {
        store.snapshot().images.iter().map(|i| i.status).collect()
    }

    #[test]
    fn new_store_is_idle_in_catalog_order() {
        let store = SessionStore::new(&PHOTO_STYLES);
        let snap = store.snapshot();
        assert!(snap.original_image.is_none());
        let ids: Vec<_> = snap.images.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, PHOTO_STYLES.iter().map(|s| s.id).collect::<Vec<_>>());
        assert!(statuses(&store).iter().all(|s| *s == GenerationStatus::Idle));
    }

    #[test]
    fn style_lookup_by_id() {
        let store = SessionStore::new(&PHOTO_STYLES);
        assert_eq!(store.style("bw_art").map(|s| s.description), Some("B&W Fine Art"));
        assert!(store.style("watercolor").is_none());
    }

    #[test]
    fn start_clears_previous_results() {
        let store = SessionStore::new(&PHOTO_STYLES);
        let first = store.start(image());
        first.apply("fashion", ItemUpdate::Failed("boom".into()));
        let second = store.start(image());
        assert_ne!(first.session_id(), second.session_id());
        assert!(statuses(&store).iter().all(|s| *s == GenerationStatus::Idle));
        assert_eq!(store.snapshot().original_image.as_deref(), Some("data:image/png;base64,aW1n"));
    }

    #[test]
    fn begin_retry_only_accepts_failed_items() {
        let store = SessionStore::new(&PHOTO_STYLES);
        assert!(matches!(store.begin_retry("fashion"), Err(ApiError::NoOriginalImage)));

        let handle = store.start(image());
        handle.apply("fashion", ItemUpdate::Failed("boom".into()));
        handle.apply("museum", ItemUpdate::Succeeded("data:image/png;base64,AA==".into()));
        assert!(matches!(store.begin_retry("museum"), Err(ApiError::NotRetryable(_))));
        assert!(matches!(store.begin_retry("nope"), Err(ApiError::UnknownStyle(_))));
        assert_eq!(store.get("museum").unwrap().status, GenerationStatus::Success);

        let (retry, original) = store.begin_retry("fashion").unwrap();
        assert_eq!(retry.session_id(), handle.session_id());
        assert_eq!(original, image());
        let fashion = store.get("fashion").unwrap();
        assert_eq!(fashion.status, GenerationStatus::Loading);
        assert!(fashion.error.is_none());

        // A second retry sees Loading and is turned away.
        assert!(matches!(store.begin_retry("fashion"), Err(ApiError::NotRetryable(_))));
    }

    #[test]
    fn update_touches_only_its_own_id() {
        let store = SessionStore::new(&PHOTO_STYLES);
        let handle = store.start(image());
        let before = store.get("museum").unwrap();
        handle.apply("fashion", ItemUpdate::Failed("boom".into()));
        assert_eq!(store.get("fashion").unwrap().status, GenerationStatus::Error);
        assert_eq!(store.get("museum").unwrap(), before);
    }

    #[test]
    fn stale_handle_cannot_write_after_reset() {
        let store = SessionStore::new(&PHOTO_STYLES);
        let handle = store.start(image());
        store.reset();
        handle.apply("fashion", ItemUpdate::Succeeded("data:image/png;base64,AA==".into()));
        let snap = store.snapshot();
        assert!(snap.original_image.is_none());
        assert!(snap.images.iter().all(|i| i.status == GenerationStatus::Idle && i.image_url.is_none()));
        assert!(store.current().is_none());
    }

    #[test]
    fn unknown_style_is_ignored() {
        let store = SessionStore::new(&PHOTO_STYLES);
        let handle = store.start(image());
        assert!(!store.update(handle.session_id(), "nope", ItemUpdate::Loading));
        assert_eq!(store.snapshot().images.len(), PHOTO_STYLES.len());
    }
}
