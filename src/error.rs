//! Error types for the diagnosis pipeline.
//!
//! Every failure is terminal for the request that raised it; the server maps
//! all of them to a single HTTP 500 carrying the message text.

use thiserror::Error;

/// Failures of the forward/backward evaluation and gradient capture.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InferenceError {
    /// Input is not `(1, 1, H, W)` at the network's configured resolution.
    #[error("Invalid input shape: expected {expected:?}, got {got:?}")]
    InputShape {
        expected: Vec<usize>,
        got: Vec<usize>,
    },

    #[error("Input tensor contains NaN or infinite values")]
    NonFiniteInput,

    #[error("Classifier produced NaN or infinite scores")]
    NonFiniteScores,

    #[error("Classifier produced no scores")]
    EmptyScores,

    /// A layer received a tensor it cannot evaluate.
    #[error("Layer `{layer}` cannot accept shape {shape:?}: {reason}")]
    LayerShape {
        layer: String,
        shape: Vec<usize>,
        reason: String,
    },

    #[error("Unknown target layer `{0}`")]
    UnknownLayer(String),

    #[error("Class index {index} out of range for {classes} classes")]
    ClassOutOfRange {
        index: usize,
        classes: usize,
    },

    /// The tap already observed a forward pass.
    #[error("Tap on `{0}` was already used for an evaluation")]
    TapReused(String),

    /// The tap is missing its activation or gradient.
    #[error("Tap on `{0}` did not capture both activation and gradient")]
    TapIncomplete(String),

    #[error("Trace was recorded by a different network")]
    TraceMismatch,
}

/// Failures while turning captured tensors into a heatmap.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RenderError {
    #[error("Activation/gradient shape mismatch: {0}")]
    ShapeMismatch(String),

    #[error("Invalid heatmap dimensions {width}x{height}")]
    InvalidDimensions {
        width: u32,
        height: u32,
    },

    #[error("Failed to encode heatmap: {0}")]
    Encode(String),
}

/// Request-boundary error: one variant per pipeline stage.
#[derive(Debug, Error)]
pub enum DiagnosisError {
    #[error("Failed to decode image: {0}")]
    Decode(String),

    #[error("Failed to preprocess image: {0}")]
    Preprocess(String),

    #[error("Inference failed: {0}")]
    Inference(#[from] InferenceError),

    #[error("Heatmap rendering failed: {0}")]
    Render(#[from] RenderError),
}

/// Result type alias using [`DiagnosisError`].
pub type Result<T> = std::result::Result<T, DiagnosisError>;
