//! Checks applied to each uploaded file before it is written.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as B64;
use thiserror::Error;

const IMAGE_EXTENSIONS: &[&str] = &[".tif", ".tiff", ".png", ".jpg", ".jpeg"];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum UploadError {
    #[error("Unsupported file type: {0}")]
    UnsupportedType(String),

    #[error("Failed to decode base64 image: {0}")]
    Decode(String),

    #[error("Invalid image content")]
    InvalidImage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Png,
    Jpeg,
    Tiff,
}

impl ImageKind {
    pub fn content_type(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Tiff => "image/tiff",
        }
    }
}

pub fn validate_extension(filename: &str) -> Result<(), UploadError> {
    let lower = filename.to_ascii_lowercase();
    if IMAGE_EXTENSIONS.iter().any(|ext| lower.ends_with(ext)) {
        Ok(())
    } else {
        Err(UploadError::UnsupportedType(filename.to_string()))
    }
}

/// Decode a `data:<mime>;base64,<payload>` string.
pub fn decode_data_url(content: &str) -> Result<Vec<u8>, UploadError> {
    let (_, payload) = content.split_once(',').ok_or_else(|| {
        UploadError::Decode("Input string does not contain a comma to split header and data.".into())
    })?;

    let bytes = B64
        .decode(payload.trim())
        .map_err(|e| UploadError::Decode(e.to_string()))?;

    if bytes.is_empty() {
        return Err(UploadError::Decode("Decoded image content is empty.".into()));
    }
    Ok(bytes)
}

/// Identify the image format from its leading bytes.
pub fn sniff_image(bytes: &[u8]) -> Result<ImageKind, UploadError> {
    const PNG: &[u8] = b"\x89PNG\r\n\x1a\n";
    const JPEG: &[u8] = &[0xFF, 0xD8, 0xFF];
    // Classic TIFF (42) and BigTIFF (43), both byte orders.
    const TIFF: &[&[u8]] = &[b"II*\0", b"MM\0*", b"II+\0", b"MM\0+"];

    if bytes.starts_with(PNG) {
        Ok(ImageKind::Png)
    } else if bytes.starts_with(JPEG) {
        Ok(ImageKind::Jpeg)
    } else if TIFF.iter().any(|magic| bytes.starts_with(magic)) {
        Ok(ImageKind::Tiff)
    } else {
        Err(UploadError::InvalidImage)
    }
}
