//! Image normalisation: resize and JPEG-compress under the API limits.
//!
//! Two hard limits apply to an image block in the API request: pixel
//! dimensions (larger images are downscaled server-side anyway, wasting
//! upload time) and encoded byte size (oversized blocks are rejected
//! outright). This stage enforces both locally:
//!
//! 1. resize so neither dimension exceeds `max_dimension`, preserving
//!    aspect ratio (Lanczos3 — document text survives it best);
//! 2. flatten any alpha channel to RGB (JPEG has no alpha, and scanner
//!    output is frequently RGBA PNG);
//! 3. encode JPEG starting at `jpeg_quality`, stepping down by 5 until the
//!    output fits under `max_encoded_bytes`, with a hard floor of quality 5.
//!
//! Hitting the floor without fitting is a per-file error: a document that
//! needs quality < 10 to fit is unreadable at that quality anyway.

use crate::error::FileError;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::DynamicImage;
use tracing::debug;

/// The lowest JPEG quality the compression loop will try.
const QUALITY_FLOOR: u8 = 5;

/// A normalised document image, ready for base64 encoding.
#[derive(Debug)]
pub struct NormalizedImage {
    /// JPEG-encoded bytes, guaranteed ≤ the configured byte cap.
    pub jpeg: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// The quality the compression loop settled on.
    pub quality: u8,
}

/// Resize and compress `img` to fit the configured limits.
pub fn normalize(
    img: &DynamicImage,
    filename: &str,
    max_dimension: u32,
    start_quality: u8,
    max_bytes: usize,
) -> Result<NormalizedImage, FileError> {
    let resized = if img.width() > max_dimension || img.height() > max_dimension {
        let r = img.resize(max_dimension, max_dimension, FilterType::Lanczos3);
        debug!(
            "Resized {} {}x{} → {}x{}",
            filename,
            img.width(),
            img.height(),
            r.width(),
            r.height()
        );
        r
    } else {
        img.clone()
    };

    // JPEG has no alpha channel; flatten before encoding.
    let rgb = resized.to_rgb8();
    let (width, height) = rgb.dimensions();

    let mut quality = start_quality.max(QUALITY_FLOOR + 1);
    while quality > QUALITY_FLOOR {
        let mut buf = Vec::new();
        let mut encoder = JpegEncoder::new_with_quality(&mut buf, quality);
        encoder
            .encode_image(&rgb)
            .map_err(|e| FileError::DecodeFailed {
                filename: filename.to_string(),
                detail: format!("JPEG encoding failed: {e}"),
            })?;

        if buf.len() <= max_bytes {
            debug!(
                "Compressed {} to {} bytes at quality {}",
                filename,
                buf.len(),
                quality
            );
            return Ok(NormalizedImage {
                jpeg: buf,
                width,
                height,
                quality,
            });
        }

        quality = quality.saturating_sub(5);
    }

    Err(FileError::CompressionFailed {
        filename: filename.to_string(),
        max_bytes,
    })
}
