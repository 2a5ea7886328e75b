pub mod math;
pub mod activation;
pub mod layers;
pub mod network;
pub mod gradcam;
pub mod preprocess;
pub mod engine;
pub mod error;

// Convenience re-exports
pub use math::{matrix::Matrix, tensor::Tensor};
pub use activation::activation::ActivationFunction;
pub use layers::{Layer, LayerKind};
pub use network::{ModelMetadata, Network, NetworkSpec, LayerSpec};
pub use gradcam::{capture, render_heatmap, Capture, Heatmap, ImportanceMap, RenderConfig, Tap};
pub use engine::{Diagnosis, Engine, EngineConfig};
pub use error::{DiagnosisError, InferenceError, RenderError};
