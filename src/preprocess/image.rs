//! Image preprocessing for chest X-ray inference.
//!
//! Uploads are decoded (PNG/JPEG/BMP/GIF), collapsed to one luminance
//! channel, resized to the network resolution and rescaled to the
//! `[-1024, 1024]` range the chest X-ray weights were trained on.

use image::{imageops::{self, FilterType}, GrayImage};

use crate::error::DiagnosisError;
use crate::math::tensor::Tensor;

/// Upper bound of the normalized pixel range.
pub const XRAY_RANGE: f64 = 1024.0;

/// Decodes image bytes and converts them to 8-bit grayscale.
pub fn decode_grayscale(bytes: &[u8]) -> Result<GrayImage, DiagnosisError> {
    if bytes.is_empty() {
        return Err(DiagnosisError::Decode("empty upload".into()));
    }
    let img = image::load_from_memory(bytes).map_err(|e| DiagnosisError::Decode(e.to_string()))?;
    Ok(img.to_luma8())
}

/// Maps an 8-bit pixel to `[-1024, 1024]`.
pub fn normalize_pixel(p: u8) -> f64 {
    (2.0 * (p as f64 / 255.0) - 1.0) * XRAY_RANGE
}

/// Resizes `image` to `width × height` (bilinear) and returns the normalized
/// `(1, 1, height, width)` input tensor.
pub fn to_input_tensor(image: &GrayImage, width: u32, height: u32) -> Result<Tensor, DiagnosisError> {
    if image.width() == 0 || image.height() == 0 {
        return Err(DiagnosisError::Preprocess(format!(
            "image has no pixels ({}x{})", image.width(), image.height()
        )));
    }
    if width == 0 || height == 0 {
        return Err(DiagnosisError::Preprocess(format!("invalid target size {}x{}", width, height)));
    }
    let resized = imageops::resize(image, width, height, FilterType::Triangle);
    let data = resized.pixels().map(|p| normalize_pixel(p.0[0])).collect();
    Ok(Tensor::from_vec(&[1, 1, height as usize, width as usize], data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{codecs::png::PngEncoder, ColorType, ImageEncoder, Luma};

    fn png_bytes(img: &GrayImage) -> Vec<u8> {
        let mut buf = Vec::new();
        PngEncoder::new(&mut buf)
            .write_image(img.as_raw(), img.width(), img.height(), ColorType::L8)
            .unwrap();
        buf
    }

    #[test]
    fn normalization_spans_xray_range() {
        assert_eq!(normalize_pixel(0), -1024.0);
        assert_eq!(normalize_pixel(255), 1024.0);
    }

    #[test]
    fn decodes_png_to_grayscale() {
        let img = GrayImage::from_pixel(5, 3, Luma([200]));
        let decoded = decode_grayscale(&png_bytes(&img)).unwrap();
        assert_eq!(decoded.dimensions(), (5, 3));
        assert_eq!(decoded.get_pixel(4, 2).0, [200]);
    }

    #[test]
    fn rejects_garbage_bytes() {
        assert!(matches!(decode_grayscale(b"not an image"), Err(DiagnosisError::Decode(_))));
        assert!(matches!(decode_grayscale(&[]), Err(DiagnosisError::Decode(_))));
    }

    #[test]
    fn tensor_has_batch_and_channel_axes() {
        let img = GrayImage::from_pixel(300, 250, Luma([255]));
        let t = to_input_tensor(&img, 224, 224).unwrap();
        assert_eq!(t.shape, vec![1, 1, 224, 224]);
        assert!(t.data.iter().all(|&v| (v - 1024.0).abs() < 10.0));
    }

    #[test]
    fn rejects_zero_target_size() {
        let img = GrayImage::from_pixel(4, 4, Luma([0]));
        assert!(matches!(to_input_tensor(&img, 0, 224), Err(DiagnosisError::Preprocess(_))));
    }
}
