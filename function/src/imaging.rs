use std::io::Cursor;

use base64::{Engine as _, engine::general_purpose::STANDARD};
use image::RgbImage;
use image::codecs::jpeg::JpegEncoder;

use crate::error::HandlerError;

/// Decodes a base64 image payload into 8-bit RGB.
///
/// Grayscale and alpha inputs are converted; the original pixel format is not kept.
pub fn decode_base64_image(encoded: &str) -> Result<RgbImage, HandlerError> {
    let bytes = STANDARD.decode(encoded.trim())?;
    if bytes.is_empty() {
        return Err(HandlerError::EmptyImage);
    }
    let image = image::load_from_memory(&bytes).map_err(HandlerError::UnreadableImage)?;
    Ok(image.to_rgb8())
}

pub fn encode_base64_jpeg(image: &RgbImage, quality: u8) -> Result<String, HandlerError> {
    let mut buffer = Cursor::new(Vec::new());
    JpegEncoder::new_with_quality(&mut buffer, quality)
        .encode_image(image)
        .map_err(HandlerError::Encode)?;
    Ok(STANDARD.encode(buffer.into_inner()))
}
