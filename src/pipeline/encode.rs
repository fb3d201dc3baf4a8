//! Image encoding: JPEG bytes → base64 `ImageData`.
//!
//! The Messages API accepts images as base64 strings embedded in the JSON
//! request body. The media type label must match the actual bytes — the API
//! sniffs the payload and rejects mismatches, so the JPEG output of the
//! normalize stage is always labelled `image/jpeg`.

use crate::pipeline::normalize::NormalizedImage;
use crate::provider::ImageData;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use tracing::debug;

/// Wrap a normalised document image as base64 for the vision API.
pub fn encode_document(img: &NormalizedImage) -> ImageData {
    let b64 = STANDARD.encode(&img.jpeg);
    debug!("Encoded image → {} bytes base64", b64.len());
    ImageData::new(b64, "image/jpeg")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_jpeg_bytes_as_standard_base64() {
        let img = NormalizedImage {
            jpeg: vec![0xFF, 0xD8, 0xFF, 0xE0],
            width: 1,
            height: 1,
            quality: 85,
        };
        let data = encode_document(&img);
        assert_eq!(data.media_type, "image/jpeg");
        assert_eq!(STANDARD.decode(&data.data).unwrap(), img.jpeg);
    }

    #[test]
    fn base64_is_padded_standard_alphabet() {
        let img = NormalizedImage {
            jpeg: vec![0u8; 5],
            width: 1,
            height: 1,
            quality: 85,
        };
        let data = encode_document(&img);
        assert!(data.data.ends_with('='), "standard engine pads output");
        assert!(!data.data.contains('-') && !data.data.contains('_'));
    }
}
