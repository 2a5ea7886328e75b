pub mod image;

pub use self::image::{decode_grayscale, normalize_pixel, to_input_tensor};
