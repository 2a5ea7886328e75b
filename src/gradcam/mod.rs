//! Grad-CAM: gradient-weighted class activation maps.
//!
//! [`capture`] runs one forward and one backward evaluation through a
//! request-local [`Tap`]; [`render_heatmap`] turns the captured tensors into
//! a jet-colored JPEG data URI at the original image resolution.

pub mod capture;
pub mod colormap;
pub mod render;
pub mod tap;

pub use capture::{argmax, capture, Capture};
pub use colormap::jet;
pub use render::{
    decode_data_uri, encode_data_uri, importance_map, render_heatmap, Heatmap, ImportanceMap,
    RenderConfig, DATA_URI_PREFIX,
};
pub use tap::Tap;
