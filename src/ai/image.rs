//! Food photo preparation: decode, shrink, re-encode as JPEG, base64 for inline upload.

use std::io::Cursor;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{DynamicImage, GenericImageView, ImageFormat};

use super::AiError;

pub const MAX_DIMENSION: u32 = 1024;

#[derive(Debug, Clone)]
pub struct PreparedImage {
    pub mime_type: &'static str,
    pub base64: String,
    pub width: u32,
    pub height: u32,
}

pub fn prepare_image(bytes: &[u8]) -> Result<PreparedImage, AiError> {
    let decoded =
        image::load_from_memory(bytes).map_err(|e| AiError::Image(e.to_string()))?;

    let (width, height) = decoded.dimensions();
    let resized = if width > MAX_DIMENSION || height > MAX_DIMENSION {
        decoded.thumbnail(MAX_DIMENSION, MAX_DIMENSION)
    } else {
        decoded
    };

    // JPEG has no alpha channel.
    let rgb = DynamicImage::ImageRgb8(resized.to_rgb8());
    let mut encoded = Cursor::new(Vec::new());
    rgb.write_to(&mut encoded, ImageFormat::Jpeg)
        .map_err(|e| AiError::Image(e.to_string()))?;

    let (width, height) = rgb.dimensions();
    Ok(PreparedImage {
        mime_type: "image/jpeg",
        base64: STANDARD.encode(encoded.into_inner()),
        width,
        height,
    })
}

#[cfg(test)]
mod tests {
    use image::{Rgba, RgbaImage};

    use super::*;

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, Rgba([200, 80, 40, 255]));
        let mut out = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(img)
            .write_to(&mut out, ImageFormat::Png)
            .unwrap();
        out.into_inner()
    }

    #[test]
    fn large_photos_are_downscaled() {
        let prepared = prepare_image(&png(2048, 1024)).unwrap();
        assert_eq!((prepared.width, prepared.height), (1024, 512));
        assert_eq!(prepared.mime_type, "image/jpeg");
        let jpeg = STANDARD.decode(&prepared.base64).unwrap();
        assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn small_photos_keep_size() {
        let prepared = prepare_image(&png(64, 48)).unwrap();
        assert_eq!((prepared.width, prepared.height), (64, 48));
    }

    #[test]
    fn garbage_is_an_image_error() {
        assert!(matches!(prepare_image(b"not an image"), Err(AiError::Image(_))));
    }
}
