//! Turns a captured activation/gradient pair into a color heatmap.

use base64::{engine::general_purpose, Engine as _};
use image::{codecs::jpeg::JpegEncoder, ColorType, Rgb, RgbImage};
use serde::{Deserialize, Serialize};

use crate::error::RenderError;
use crate::gradcam::colormap::jet;
use crate::math::tensor::Tensor;

/// Prefix that lets a browser render the payload directly.
pub const DATA_URI_PREFIX: &str = "data:image/jpeg;base64,";

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RenderConfig {
    /// JPEG quality, 1–100.
    pub jpeg_quality: u8,
}

impl Default for RenderConfig {
    fn default() -> Self {
        RenderConfig { jpeg_quality: 95 }
    }
}

/// Single-channel spatial importance, row-major, values in `[0, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportanceMap {
    pub width: usize,
    pub height: usize,
    pub values: Vec<f64>,
}

/// The rendered explanation.
#[derive(Debug, Clone)]
pub struct Heatmap {
    pub width: u32,
    pub height: u32,
    /// `data:image/jpeg;base64,...`
    pub data_uri: String,
}

/// Grad-CAM map: channels of `activation` weighted by the spatial mean of
/// their gradient, averaged, clipped at zero and scaled so the peak is 1.
/// A map with no positive evidence stays all zero.
///
/// Both tensors may be `(C, H, W)` or carry a leading batch axis of one.
pub fn importance_map(activation: &Tensor, gradient: &Tensor) -> Result<ImportanceMap, RenderError> {
    let activation = activation.squeeze_leading(3)
        .ok_or_else(|| RenderError::ShapeMismatch(format!("activation has shape {:?}", activation.shape)))?;
    let gradient = gradient.squeeze_leading(3)
        .ok_or_else(|| RenderError::ShapeMismatch(format!("gradient has shape {:?}", gradient.shape)))?;

    let (channels, height, width) = activation.dims3().unwrap_or_default();
    if gradient.shape != activation.shape {
        return Err(RenderError::ShapeMismatch(format!(
            "activation {:?} vs gradient {:?}", activation.shape, gradient.shape
        )));
    }
    if channels == 0 || height * width == 0 {
        return Err(RenderError::ShapeMismatch(format!("empty feature map {:?}", activation.shape)));
    }

    // Global average pooling of the gradient: one weight per channel.
    let area = (height * width) as f64;
    let weights: Vec<f64> = (0..channels)
        .map(|c| gradient.channel(c).iter().sum::<f64>() / area)
        .collect();

    let mut values = vec![0.0; height * width];
    for (c, &weight) in weights.iter().enumerate() {
        for (v, &a) in values.iter_mut().zip(activation.channel(c)) {
            *v += a * weight;
        }
    }
    for v in &mut values {
        *v = (*v / channels as f64).max(0.0);
    }

    let max = values.iter().copied().fold(0.0, f64::max);
    if max != 0.0 {
        for v in &mut values {
            *v /= max;
        }
    }

    Ok(ImportanceMap { width, height, values })
}

impl ImportanceMap {
    pub fn max(&self) -> f64 {
        self.values.iter().copied().fold(0.0, f64::max)
    }

    pub fn is_zero(&self) -> bool {
        self.values.iter().all(|&v| v == 0.0)
    }

    /// Bilinear resize with pixel centres at half-integer coordinates;
    /// samples outside the source clamp to the border.
    pub fn resize(&self, width: u32, height: u32) -> Result<ImportanceMap, RenderError> {
        if width == 0 || height == 0 || self.width == 0 || self.height == 0 {
            return Err(RenderError::InvalidDimensions { width, height });
        }
        let (dw, dh) = (width as usize, height as usize);
        let sx = self.width as f64 / dw as f64;
        let sy = self.height as f64 / dh as f64;

        // (lower index, upper index, weight of upper) per destination coordinate
        let taps = |dst: usize, scale: f64, len: usize| -> Vec<(usize, usize, f64)> {
            (0..dst)
                .map(|d| {
                    let src = ((d as f64 + 0.5) * scale - 0.5).clamp(0.0, (len - 1) as f64);
                    let lo = src.floor() as usize;
                    let hi = (lo + 1).min(len - 1);
                    (lo, hi, src - lo as f64)
                })
                .collect()
        };
        let xs = taps(dw, sx, self.width);
        let ys = taps(dh, sy, self.height);

        let at = |x: usize, y: usize| self.values[y * self.width + x];
        let mut values = Vec::with_capacity(dw * dh);
        for &(y0, y1, fy) in &ys {
            for &(x0, x1, fx) in &xs {
                let top = at(x0, y0) * (1.0 - fx) + at(x1, y0) * fx;
                let bottom = at(x0, y1) * (1.0 - fx) + at(x1, y1) * fx;
                values.push(top * (1.0 - fy) + bottom * fy);
            }
        }

        Ok(ImportanceMap { width: dw, height: dh, values })
    }

    /// Scales to 8 bits (truncating) and applies the jet palette.
    pub fn colorize(&self) -> RgbImage {
        RgbImage::from_fn(self.width as u32, self.height as u32, |x, y| {
            let v = self.values[y as usize * self.width + x as usize];
            Rgb(jet((255.0 * v.clamp(0.0, 1.0)) as u8))
        })
    }
}

/// JPEG-compresses `image` and wraps it as a base64 data URI.
pub fn encode_data_uri(image: &RgbImage, quality: u8) -> Result<String, RenderError> {
    let mut buffer = Vec::new();
    JpegEncoder::new_with_quality(&mut buffer, quality.clamp(1, 100))
        .encode(image.as_raw(), image.width(), image.height(), ColorType::Rgb8)
        .map_err(|e| RenderError::Encode(e.to_string()))?;
    Ok(format!("{}{}", DATA_URI_PREFIX, general_purpose::STANDARD.encode(&buffer)))
}

/// Full renderer: importance map → resize to `width × height` → jet → JPEG
/// data URI.
pub fn render_heatmap(
    activation: &Tensor,
    gradient: &Tensor,
    width: u32,
    height: u32,
    config: &RenderConfig,
) -> Result<Heatmap, RenderError> {
    if width == 0 || height == 0 {
        return Err(RenderError::InvalidDimensions { width, height });
    }
    let map = importance_map(activation, gradient)?.resize(width, height)?;
    let data_uri = encode_data_uri(&map.colorize(), config.jpeg_quality)?;
    Ok(Heatmap { width, height, data_uri })
}

/// Decodes a data URI produced by [`encode_data_uri`]. Used by callers that
/// want to inspect or re-serve the heatmap.
pub fn decode_data_uri(data_uri: &str) -> Result<RgbImage, RenderError> {
    let payload = data_uri.strip_prefix(DATA_URI_PREFIX)
        .ok_or_else(|| RenderError::Encode("missing JPEG data URI prefix".into()))?;
    let bytes = general_purpose::STANDARD.decode(payload)
        .map_err(|e| RenderError::Encode(e.to_string()))?;
    image::load_from_memory_with_format(&bytes, image::ImageFormat::Jpeg)
        .map(|img| img.to_rgb8())
        .map_err(|e| RenderError::Encode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn tensor3(c: usize, h: usize, w: usize, f: impl Fn(usize) -> f64) -> Tensor {
        Tensor::from_vec(&[c, h, w], (0..c * h * w).map(f).collect())
    }

    #[test]
    fn weights_channels_by_pooled_gradient() {
        // Channel 0 is weighted +1, channel 1 is weighted -1.
        let activation = Tensor::from_vec(&[2, 1, 2], vec![2.0, 1.0, 1.0, 3.0]);
        let gradient = Tensor::from_vec(&[2, 1, 2], vec![1.0, 1.0, -1.0, -1.0]);
        let map = importance_map(&activation, &gradient).unwrap();
        // raw = [(2 - 1) / 2, (1 - 3) / 2] = [0.5, -1.0] → relu → [0.5, 0] → /0.5
        assert_eq!(map.values, vec![1.0, 0.0]);
        assert_eq!((map.width, map.height), (2, 1));
    }

    #[test]
    fn accepts_batched_gradient() {
        let activation = tensor3(3, 2, 2, |i| i as f64);
        let gradient = Tensor::from_vec(&[1, 3, 2, 2], vec![0.5; 12]);
        let map = importance_map(&activation, &gradient).unwrap();
        assert_abs_diff_eq!(map.max(), 1.0);
    }

    #[test]
    fn no_positive_evidence_stays_zero() {
        let activation = tensor3(2, 3, 3, |_| 1.0);
        let gradient = tensor3(2, 3, 3, |_| -0.25);
        let map = importance_map(&activation, &gradient).unwrap();
        assert!(map.is_zero());
        assert!(map.values.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn channel_mismatch_is_rejected() {
        let err = importance_map(&tensor3(2, 2, 2, |_| 1.0), &tensor3(3, 2, 2, |_| 1.0)).unwrap_err();
        assert!(matches!(err, RenderError::ShapeMismatch(_)));
    }

    #[test]
    fn resize_hits_exact_dimensions() {
        let map = ImportanceMap { width: 2, height: 2, values: vec![0.0, 1.0, 1.0, 0.0] };
        let big = map.resize(37, 11).unwrap();
        assert_eq!((big.width, big.height), (37, 11));
        assert_eq!(big.values.len(), 37 * 11);
        assert!(big.values.iter().all(|v| (0.0..=1.0).contains(v)));
    }

    #[test]
    fn resize_interpolates_between_centres() {
        let map = ImportanceMap { width: 2, height: 1, values: vec![0.0, 1.0] };
        let wide = map.resize(4, 1).unwrap();
        assert_eq!(wide.values, vec![0.0, 0.25, 0.75, 1.0]);
    }

    #[test]
    fn resize_rejects_zero_dimensions() {
        let map = ImportanceMap { width: 1, height: 1, values: vec![1.0] };
        assert_eq!(map.resize(0, 5), Err(RenderError::InvalidDimensions { width: 0, height: 5 }));
    }

    #[test]
    fn heatmap_decodes_at_requested_size() {
        let activation = tensor3(4, 7, 7, |i| (i % 5) as f64);
        let gradient = tensor3(4, 7, 7, |i| if i < 49 { 1.0 } else { 0.1 });
        let heatmap = render_heatmap(&activation, &gradient, 123, 45, &RenderConfig::default()).unwrap();
        assert!(heatmap.data_uri.starts_with(DATA_URI_PREFIX));
        let img = decode_data_uri(&heatmap.data_uri).unwrap();
        assert_eq!(img.dimensions(), (123, 45));
    }

    #[test]
    fn colorize_maps_extremes_through_jet() {
        let map = ImportanceMap { width: 2, height: 1, values: vec![0.0, 1.0] };
        let img = map.colorize();
        assert_eq!(img.get_pixel(0, 0).0, jet(0));
        assert_eq!(img.get_pixel(1, 0).0, jet(255));
    }
}
