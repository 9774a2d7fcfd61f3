//! Best-effort downscale before upload.
//!
//! Large portraits are shrunk so neither side exceeds [`MAX_DIMENSION`] and
//! re-encoded as JPEG. Anything that goes wrong falls back to the original
//! bytes; the caller never sees an error.

use std::io::Cursor;

use bytes::Bytes;
use image::{codecs::jpeg::JpegEncoder, imageops::FilterType, DynamicImage};
use tracing::{debug, warn};

use crate::models::SourceImage;

pub const MAX_DIMENSION: u32 = 800;
pub const JPEG_QUALITY: u8 = 80;

/// Target size for a `width`x`height` image bounded by `max` on both sides.
pub fn fit_within(width: u32, height: u32, max: u32) -> (u32, u32) {
    if width <= max && height <= max {
        return (width, height);
    }
    let ratio = max as f64 / width.max(height) as f64;
    let scale = |d: u32| ((d as f64 * ratio).round() as u32).max(1);
    (scale(width), scale(height))
}

/// Runs [`prepare_blocking`] on the blocking pool.
pub async fn prepare(source: SourceImage) -> SourceImage {
    let fallback = source.clone();
    match tokio::task::spawn_blocking(move || prepare_blocking(&source)).await {
        Ok(prepared) => prepared,
        Err(e) => {
            warn!("image preprocessing task failed, sending original: {}", e);
            fallback
        }
    }
}

pub fn prepare_blocking(source: &SourceImage) -> SourceImage {
    match downscale(&source.bytes) {
        Ok(bytes) => {
            debug!("preprocessed image: {} -> {} bytes", source.bytes.len(), bytes.len());
            SourceImage { mime_type: "image/jpeg".to_string(), bytes }
        }
        Err(e) => {
            // Not fatal: the generation service still accepts the original.
            warn!("could not downscale {} image ({}), sending original", source.mime_type, e);
            source.clone()
        }
    }
}

fn downscale(input: &[u8]) -> Result<Bytes, image::ImageError> {
    let img = image::load_from_memory(input)?;
    let (w, h) = fit_within(img.width(), img.height(), MAX_DIMENSION);
    let img = if (w, h) == (img.width(), img.height()) {
        img
    } else {
        img.resize_exact(w, h, FilterType::Triangle)
    };
    // JPEG has no alpha channel.
    let rgb = DynamicImage::ImageRgb8(img.to_rgb8());

    let mut buf = Cursor::new(Vec::new());
    rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut buf, JPEG_QUALITY))?;
    Ok(Bytes::from(buf.into_inner()))
}
