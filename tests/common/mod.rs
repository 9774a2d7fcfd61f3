//! Shared fakes for the integration tests.

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use bytes::Bytes;
use parking_lot::Mutex;

use portrait_studio::dispatcher::StatusSink;
use portrait_studio::gemini::{GeminiError, ImageGenerator};
use portrait_studio::models::{ItemUpdate, SourceImage};
use portrait_studio::styles::PHOTO_STYLES;

/// Generator that succeeds for every style except the ones marked failing.
/// Tracks how many calls overlap.
#[derive(Default)]
pub struct FakeGenerator {
    failing: Mutex<HashSet<&'static str>>,
    delay: Duration,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    calls: AtomicUsize,
}

impl FakeGenerator {
    pub fn new(delay: Duration) -> Arc<Self> {
        Arc::new(Self { delay, ..Default::default() })
    }

    pub fn failing(delay: Duration, ids: &[&'static str]) -> Arc<Self> {
        let gen = Self::new(delay);
        gen.failing.lock().extend(ids.iter().copied());
        gen
    }

    pub fn heal(&self) {
        self.failing.lock().clear();
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

pub fn fake_image_url(style_id: &str) -> String {
    let data = base64::engine::general_purpose::STANDARD.encode(format!("png:{style_id}"));
    format!("data:image/png;base64,{data}")
}

#[async_trait]
impl ImageGenerator for FakeGenerator {
    async fn generate_styled_photo(&self, _image: &SourceImage, prompt: &str) -> Result<String, GeminiError> {
        let id = PHOTO_STYLES
            .iter()
            .find(|s| s.prompt == prompt)
            .map(|s| s.id)
            .ok_or_else(|| GeminiError::Other(format!("unexpected prompt: {prompt}")))?;

        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.failing.lock().contains(id) {
            return Err(GeminiError::Http("status=500 body=rpc failed".into()));
        }
        Ok(fake_image_url(id))
    }
}

/// Sink that records every update in arrival order.
#[derive(Clone, Default)]
pub struct Recorder(Arc<Mutex<Vec<(String, ItemUpdate)>>>);

impl Recorder {
    pub fn events(&self) -> Vec<(String, ItemUpdate)> {
        self.0.lock().clone()
    }

    pub fn for_style(&self, id: &str) -> Vec<ItemUpdate> {
        self.events().into_iter().filter(|(s, _)| s == id).map(|(_, u)| u).collect()
    }
}

impl StatusSink for Recorder {
    fn apply(&self, style_id: &str, update: ItemUpdate) {
        self.0.lock().push((style_id.to_string(), update));
    }
}

pub fn portrait() -> SourceImage {
    SourceImage { mime_type: "image/png".into(), bytes: Bytes::from_static(b"portrait") }
}
