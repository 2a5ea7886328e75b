use tracing::debug;

use crate::error::InferenceError;
use crate::math::tensor::Tensor;
use crate::network::network::Network;

/// Everything needed to explain one prediction.
#[derive(Debug, Clone)]
pub struct Capture {
    pub class_index: usize,
    /// Raw score at `class_index`, not renormalized.
    pub score: f64,
    /// Target layer output, `(C, H, W)`.
    pub activation: Tensor,
    /// `∂score / ∂activation`, same shape as `activation`.
    pub gradient: Tensor,
}

/// Index and value of the highest score. Exact ties go to the lowest index.
pub fn argmax(scores: &[f64]) -> Result<(usize, f64), InferenceError> {
    let mut best: Option<(usize, f64)> = None;
    for (i, &s) in scores.iter().enumerate() {
        if !s.is_finite() {
            return Err(InferenceError::NonFiniteScores);
        }
        match best {
            Some((_, b)) if s <= b => {}
            _ => best = Some((i, s)),
        }
    }
    best.ok_or(InferenceError::EmptyScores)
}

/// Runs one forward and one backward evaluation of `network` on `input`,
/// explaining the top-scoring class at `target_layer`.
///
/// The tap is request-local, so concurrent calls on a shared `network` do
/// not interfere. It is released on every return path.
pub fn capture(network: &Network, input: &Tensor, target_layer: &str) -> Result<Capture, InferenceError> {
    let mut tap = network.tap(target_layer)?;
    debug_assert!(tap.is_clean());

    let trace = network.forward(input, &mut tap)?;
    let (class_index, score) = argmax(trace.scores())?;
    network.backward(trace, class_index, &mut tap)?;

    let (activation, gradient) = tap.into_parts()?;
    let activation = activation.squeeze_leading(3).ok_or_else(|| spatial_error(target_layer, &activation))?;
    let gradient = gradient.squeeze_leading(3).ok_or_else(|| spatial_error(target_layer, &gradient))?;
    debug!(class_index, score, layer = target_layer, shape = ?activation.shape, "captured activation and gradient");

    Ok(Capture { class_index, score, activation, gradient })
}

fn spatial_error(layer: &str, t: &Tensor) -> InferenceError {
    InferenceError::LayerShape {
        layer: layer.to_owned(),
        shape: t.shape.clone(),
        reason: "Grad-CAM needs a (channels, height, width) feature map".into(),
    }
}
