use image::RgbImage;

use crate::domain::errors::{DomainError, DomainResult};

/// Decodes an uploaded file into a 3-channel RGB buffer. The codec is sniffed
/// from the bytes, not taken from the declared content type.
pub fn decode_rgb(bytes: &[u8]) -> DomainResult<RgbImage> {
    if bytes.is_empty() {
        return Err(DomainError::InvalidImage("empty buffer".into()));
    }
    let img = image::load_from_memory(bytes)
        .map_err(|e| DomainError::InvalidImage(e.to_string()))?;
    Ok(img.to_rgb8())
}
