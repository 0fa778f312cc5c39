//! Normalizes acquired frames into bounded JPEG payloads.
//!
//! Every payload the inference service sees has its longer side capped at
//! [`MAX_DIMENSION`](crate::MAX_DIMENSION), which keeps request size and
//! latency predictable regardless of the camera or file the user picked.

use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageError};

use crate::model::{EncodedImage, RawImage};
use crate::{JPEG_QUALITY, MAX_DIMENSION};

#[derive(Debug, thiserror::Error)]
pub enum PreprocessError {
    #[error("image has no pixels")]
    Empty,
    #[error("encoding failed: {0}")]
    Encode(#[from] ImageError),
}

#[derive(Debug, Clone, Copy)]
pub struct ImagePreprocessor {
    max_dimension: u32,
    quality: u8,
}

impl Default for ImagePreprocessor {
    fn default() -> Self {
        Self::new(MAX_DIMENSION, JPEG_QUALITY)
    }
}

impl ImagePreprocessor {
    pub fn new(max_dimension: u32, quality: u8) -> Self {
        Self {
            max_dimension: max_dimension.max(1),
            quality: quality.clamp(1, 100),
        }
    }

    pub fn max_dimension(&self) -> u32 {
        self.max_dimension
    }

    /// Output size for a `width x height` input. Scales by
    /// `max_dim / longer_side` when the longer side is over the bound,
    /// otherwise returns the input size.
    pub fn target_dimensions(width: u32, height: u32, max_dim: u32) -> (u32, u32) {
        let longer = width.max(height);
        if longer <= max_dim {
            return (width, height);
        }

        let scale = max_dim as f64 / longer as f64;
        let scaled = |side: u32| ((side as f64 * scale).round() as u32).clamp(1, max_dim);
        (scaled(width), scaled(height))
    }

    /// Bounds the image and encodes it as JPEG.
    pub fn resize(&self, raw: RawImage) -> Result<EncodedImage, PreprocessError> {
        if raw.width() == 0 || raw.height() == 0 {
            return Err(PreprocessError::Empty);
        }

        let (width, height) =
            Self::target_dimensions(raw.width(), raw.height(), self.max_dimension);
        let source = raw.into_rgba_image();
        let bounded = if (width, height) == source.dimensions() {
            source
        } else {
            log::debug!(
                "Resizing {}x{} to {}x{}",
                source.width(),
                source.height(),
                width,
                height
            );
            imageops::resize(&source, width, height, FilterType::Lanczos3)
        };

        // JPEG has no alpha channel.
        let rgb = DynamicImage::ImageRgba8(bounded).to_rgb8();
        let mut bytes = Vec::new();
        JpegEncoder::new_with_quality(&mut bytes, self.quality).encode_image(&rgb)?;

        Ok(EncodedImage::new(bytes, "image/jpeg", width, height))
    }

    /// Mirrors the frame left to right.
    pub fn flip_horizontal(raw: RawImage) -> RawImage {
        let flipped = imageops::flip_horizontal(&raw.into_rgba_image());
        RawImage::from(flipped)
    }

    /// Decodes any supported file format into RGBA pixels.
    pub fn decode(bytes: &[u8]) -> Result<RawImage, ImageError> {
        let image = image::load_from_memory(bytes)?;
        Ok(RawImage::from(image.to_rgba8()))
    }
}
