//! In-memory still transcoding.
//!
//! Takes the raw bytes of an extracted still, resizes to exactly the
//! configured dimensions (no aspect-ratio preservation) and re-encodes to
//! JPEG. No filesystem access.

use std::io::Cursor;

use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TranscodeError {
    #[error("target dimensions must be positive")]
    BadDimensions,
    #[error("image processing error: {0}")]
    Codec(#[from] image::ImageError),
}

/// Resizes decoded stills to an exact target size and re-encodes them as JPEG.
#[derive(Clone, Copy, Debug)]
pub struct Transcoder {
    width: u32,
    height: u32,
}

impl Transcoder {
    pub fn new(width: u32, height: u32) -> Result<Self, TranscodeError> {
        if width == 0 || height == 0 {
            return Err(TranscodeError::BadDimensions);
        }
        Ok(Self { width, height })
    }

    /// Decode `frame`, resize to exactly `width` x `height`, re-encode as JPEG.
    pub fn transcode(&self, frame: &[u8]) -> Result<Vec<u8>, TranscodeError> {
        let decoded = image::load_from_memory(frame)?;
        let resized = decoded.resize_exact(self.width, self.height, FilterType::Lanczos3);
        // JPEG carries no alpha channel; normalize to RGB before encoding.
        let still = DynamicImage::ImageRgb8(resized.to_rgb8());
        let mut encoded = Cursor::new(Vec::new());
        still.write_to(&mut encoded, ImageFormat::Jpeg)?;
        Ok(encoded.into_inner())
    }
}
