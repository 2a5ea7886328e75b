#![allow(dead_code)]

use image::{codecs::png::PngEncoder, ColorType, GrayImage, ImageEncoder, Luma};

use medisight::{Engine, EngineConfig, NetworkSpec};

pub const SEED: u64 = 2024;

pub fn reference_engine() -> Engine {
    Engine::new(NetworkSpec::chest_xray().build(SEED), EngineConfig::default())
        .expect("reference architecture has a features.block4 layer")
}

/// Synthetic radiograph: bright ribcage-like bands over a dark background,
/// varied by `variant`.
pub fn synthetic_xray(width: u32, height: u32, variant: u32) -> GrayImage {
    GrayImage::from_fn(width, height, |x, y| {
        let band = ((y + variant * 7) / 6) % 2;
        let lung = (x as i64 - width as i64 / 2).unsigned_abs() as u32 * 255 / width.max(1);
        let v = 40 + band * 90 + lung / 2 + (x * variant) % 23;
        Luma([v.min(255) as u8])
    })
}

pub fn png_bytes(img: &GrayImage) -> Vec<u8> {
    let mut buf = Vec::new();
    PngEncoder::new(&mut buf)
        .write_image(img.as_raw(), img.width(), img.height(), ColorType::L8)
        .expect("in-memory PNG encoding");
    buf
}
