use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{error, info};

use crate::gemini::ImageGenerator;
use crate::models::{ItemUpdate, SourceImage};
use crate::preprocess;
use crate::styles::StyleConfig;

/// Parallel generation calls per batch. Six large uploads at once tend to
/// fail at the transport level.
pub const DEFAULT_CONCURRENCY: usize = 2;

/// Message stored on an item whose generation failed.
pub const GENERATION_FAILED: &str = "Failed to generate";

/// Receives per-item progress. Implementations key every update by style id.
pub trait StatusSink: Send + Sync {
    fn apply(&self, style_id: &str, update: ItemUpdate);
}

#[derive(Clone)]
pub struct Dispatcher {
    generator: Arc<dyn ImageGenerator>,
    concurrency: usize,
}

impl Dispatcher {
    pub fn new(generator: Arc<dyn ImageGenerator>) -> Self {
        Self::with_concurrency(generator, DEFAULT_CONCURRENCY)
    }

    pub fn with_concurrency(generator: Arc<dyn ImageGenerator>, concurrency: usize) -> Self {
        Self { generator, concurrency: concurrency.max(1) }
    }

    /// Marks every style in `styles` as `Loading`, then starts the workers.
    /// At most `concurrency` jobs are in flight; the returned task finishes
    /// once each style has reached `Success` or `Error`.
    pub fn spawn_batch<S>(&self, image: SourceImage, styles: &[StyleConfig], sink: S) -> JoinHandle<()>
    where
        S: StatusSink + 'static,
    {
        let sink: Arc<dyn StatusSink> = Arc::new(sink);
        for style in styles {
            sink.apply(style.id, ItemUpdate::Loading);
        }

        let queue = Arc::new(Mutex::new(styles.iter().copied().collect::<VecDeque<_>>()));
        info!("🚀 Dispatching {} styles over {} workers", styles.len(), self.concurrency);

        let mut workers = JoinSet::new();
        for worker in 0..self.concurrency.min(styles.len()) {
            let this = self.clone();
            let queue = queue.clone();
            let sink = sink.clone();
            let image = image.clone();
            workers.spawn(async move {
                loop {
                    // Guard is dropped before the await below.
                    let next = queue.lock().pop_front();
                    let Some(style) = next else { break };
                    info!(worker, style = style.id, "🎯 Generating style");
                    this.process(&image, &style, sink.as_ref()).await;
                }
            });
        }

        tokio::spawn(async move {
            while let Some(res) = workers.join_next().await {
                if let Err(e) = res {
                    error!("❌ Worker task failed: {}", e);
                }
            }
            info!("✅ Batch finished");
        })
    }

    /// [`spawn_batch`](Self::spawn_batch) and wait for it.
    pub async fn run_batch<S>(&self, image: SourceImage, styles: &[StyleConfig], sink: S)
    where
        S: StatusSink + 'static,
    {
        if let Err(e) = self.spawn_batch(image, styles, sink).await {
            error!("❌ Batch task failed: {}", e);
        }
    }

    /// Re-runs a single style outside the worker pool.
    pub async fn retry<S>(&self, image: SourceImage, style: &StyleConfig, sink: S)
    where
        S: StatusSink,
    {
        info!(style = style.id, "🔄 Retrying style");
        sink.apply(style.id, ItemUpdate::Loading);
        self.process(&image, style, &sink).await;
    }

    /// Generates one style that is already `Loading` and records the outcome.
    pub async fn process(&self, image: &SourceImage, style: &StyleConfig, sink: &dyn StatusSink) {
        let prepared = preprocess::prepare(image.clone()).await;
        match self.generator.generate_styled_photo(&prepared, style.prompt).await {
            Ok(url) => {
                info!(style = style.id, "✅ Style generated");
                sink.apply(style.id, ItemUpdate::Succeeded(url));
            }
            Err(e) => {
                error!(style = style.id, "❌ Failed to generate: {}", e);
                sink.apply(style.id, ItemUpdate::Failed(GENERATION_FAILED.to_string()));
            }
        }
    }
}
