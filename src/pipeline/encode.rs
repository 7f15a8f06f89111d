//! Image encoding for the OCR engines.
//!
//! Both engines take a PNG: tesseract reads it from a temporary file, the
//! vision engine receives it base64-wrapped inside the request body.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::ImageData;
use image::DynamicImage;
use std::io::Cursor;
use std::path::Path;
use tracing::debug;

/// Encode a rasterised page as PNG bytes.
pub fn png_bytes(img: &DynamicImage) -> Result<Vec<u8>, image::ImageError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;
    Ok(buf)
}

/// Write a rasterised page to `path` as PNG.
pub fn write_png(img: &DynamicImage, path: &Path) -> Result<(), image::ImageError> {
    img.save_with_format(path, image::ImageFormat::Png)
}

/// Encode a rasterised page as a base64 PNG ready for a vision model.
///
/// `detail: "high"` keeps fine print legible for providers that tile images.
pub fn encode_page(img: &DynamicImage) -> Result<ImageData, image::ImageError> {
    let buf = png_bytes(img)?;
    let b64 = STANDARD.encode(&buf);
    debug!("Encoded image → {} bytes base64", b64.len());

    Ok(ImageData::new(b64, "image/png").with_detail("high"))
}
