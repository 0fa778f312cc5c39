use std::io::Cursor;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::{ImageReader, RgbaImage};
use strum_macros::{AsRefStr, Display};

use crate::error::{ErrorKind, PayloadError};

/// Unprocessed RGBA8 pixels from a camera frame or a decoded file.
#[derive(Clone, PartialEq, Eq)]
pub struct RawImage {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl RawImage {
    /// Wraps a tightly packed RGBA8 buffer. Returns `None` when the buffer
    /// length does not match `width * height * 4`.
    pub fn from_rgba(width: u32, height: u32, pixels: Vec<u8>) -> Option<Self> {
        let expected = (width as usize)
            .checked_mul(height as usize)?
            .checked_mul(4)?;
        if pixels.len() != expected {
            return None;
        }
        Some(Self {
            width,
            height,
            pixels,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn into_rgba_image(self) -> RgbaImage {
        // Length was validated on construction.
        RgbaImage::from_raw(self.width, self.height, self.pixels)
            .unwrap_or_else(|| RgbaImage::new(0, 0))
    }
}

impl From<RgbaImage> for RawImage {
    fn from(image: RgbaImage) -> Self {
        let (width, height) = image.dimensions();
        Self {
            width,
            height,
            pixels: image.into_raw(),
        }
    }
}

impl std::fmt::Debug for RawImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawImage")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.pixels.len())
            .finish()
    }
}

/// Compressed image ready for transmission or display.
#[derive(Clone, PartialEq, Eq)]
pub struct EncodedImage {
    bytes: Vec<u8>,
    mime_type: String,
    width: u32,
    height: u32,
}

impl EncodedImage {
    pub fn new(bytes: Vec<u8>, mime_type: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            bytes,
            mime_type: mime_type.into(),
            width,
            height,
        }
    }

    /// Reads the dimensions from the encoded header without decoding pixels.
    pub fn from_bytes(bytes: Vec<u8>, mime_type: impl Into<String>) -> Result<Self, PayloadError> {
        let (width, height) = ImageReader::new(Cursor::new(&bytes))
            .with_guessed_format()?
            .into_dimensions()?;
        Ok(Self::new(bytes, mime_type, width, height))
    }

    pub fn from_base64(mime_type: &str, data: &str) -> Result<Self, PayloadError> {
        let bytes = STANDARD.decode(data)?;
        Self::from_bytes(bytes, mime_type)
    }

    /// Parses a `data:<mime>;base64,<data>` URL.
    pub fn from_data_url(url: &str) -> Result<Self, PayloadError> {
        let rest = url.strip_prefix("data:").ok_or(PayloadError::NotADataUrl)?;
        let (header, data) = rest.split_once(',').ok_or(PayloadError::NotADataUrl)?;
        let mime_type = header
            .strip_suffix(";base64")
            .ok_or(PayloadError::NotADataUrl)?;
        Self::from_base64(mime_type, data)
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.bytes)
    }

    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.to_base64())
    }
}

impl std::fmt::Debug for EncodedImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncodedImage")
            .field("mime_type", &self.mime_type)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.bytes.len())
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, AsRefStr)]
pub enum CameraPermissionState {
    #[default]
    NotRequested,
    Requesting,
    Granted,
    Denied,
    Unavailable,
}

/// One logical inference request. Retries move the same payload forward.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationAttempt {
    pub payload: EncodedImage,
    pub attempt_number: u32,
    pub max_retries: u32,
}

impl GenerationAttempt {
    pub fn first(payload: EncodedImage, max_retries: u32) -> Self {
        Self {
            payload,
            attempt_number: 0,
            max_retries,
        }
    }

    pub fn retries_left(&self) -> u32 {
        self.max_retries.saturating_sub(self.attempt_number)
    }

    pub fn next(self) -> Self {
        Self {
            attempt_number: self.attempt_number + 1,
            ..self
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationResult {
    Success { after_image: EncodedImage },
    Failure { kind: ErrorKind },
}

impl GenerationResult {
    pub fn is_success(&self) -> bool {
        matches!(self, GenerationResult::Success { .. })
    }
}
