pub mod conv;
pub mod dense;
pub mod layer;
pub mod norm;
pub mod pool;

pub use layer::{Layer, LayerKind};
