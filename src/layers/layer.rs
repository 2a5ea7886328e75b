use serde::{Serialize, Deserialize};

use crate::activation::activation::ActivationFunction;
use crate::error::InferenceError;
use crate::layers::{conv::Conv2d, dense::Dense, norm::BatchNorm, pool};
use crate::math::tensor::Tensor;

/// The computation a layer performs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum LayerKind {
    Conv2d(Conv2d),
    BatchNorm(BatchNorm),
    Activation { function: ActivationFunction },
    MaxPool2d(pool::MaxPool2d),
    GlobalAvgPool,
    Dense(Dense),
}

/// A named node of the classifier. Names are dotted paths such as
/// `features.block4`; they are what a Grad-CAM tap targets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Layer {
    pub name: String,
    pub kind: LayerKind,
}

impl Layer {
    pub fn new(name: impl Into<String>, kind: LayerKind) -> Layer {
        Layer { name: name.into(), kind }
    }

    /// Evaluates the layer. Weights are never touched.
    pub fn forward(&self, input: &Tensor) -> Result<Tensor, InferenceError> {
        let result = match &self.kind {
            LayerKind::Conv2d(conv) => conv.forward(input),
            LayerKind::BatchNorm(norm) => norm.forward(input),
            LayerKind::Activation { function } => Ok(input.map(|x| function.function(x))),
            LayerKind::MaxPool2d(max_pool) => max_pool.forward(input),
            LayerKind::GlobalAvgPool => pool::global_avg_pool(input),
            LayerKind::Dense(dense) => dense.forward(input),
        };
        result.map_err(|reason| self.shape_error(input, reason))
    }

    /// Maps the gradient w.r.t. this layer's output back onto its input.
    /// `input` must be the tensor this layer saw in the forward pass.
    pub fn backward(&self, input: &Tensor, grad_output: &Tensor) -> Result<Tensor, InferenceError> {
        let result = match &self.kind {
            LayerKind::Conv2d(conv) => conv.backward(input, grad_output),
            LayerKind::BatchNorm(norm) => norm.backward(input, grad_output),
            LayerKind::Activation { function } => {
                if grad_output.shape != input.shape {
                    Err(format!("gradient shape {:?} does not match input", grad_output.shape))
                } else {
                    // δ = ∂L/∂a ⊙ σ'(z)
                    let data = input.data.iter().zip(&grad_output.data)
                        .map(|(&z, &g)| g * function.derivative(z))
                        .collect();
                    Ok(Tensor::from_vec(&input.shape, data))
                }
            }
            LayerKind::MaxPool2d(max_pool) => max_pool.backward(input, grad_output),
            LayerKind::GlobalAvgPool => pool::global_avg_pool_backward(input, grad_output),
            LayerKind::Dense(dense) => dense.backward(input, grad_output),
        };
        result.map_err(|reason| self.shape_error(input, reason))
    }

    fn shape_error(&self, input: &Tensor, reason: String) -> InferenceError {
        InferenceError::LayerShape {
            layer: self.name.clone(),
            shape: input.shape.clone(),
            reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn activation_backward_uses_pre_activation_input() {
        let layer = Layer::new("relu", LayerKind::Activation { function: ActivationFunction::ReLU });
        let z = Tensor::from_vec(&[3], vec![-1.0, 0.5, 2.0]);
        let g = layer.backward(&z, &Tensor::from_vec(&[3], vec![1.0, 1.0, 1.0])).unwrap();
        assert_eq!(g.data, vec![0.0, 1.0, 1.0]);
    }

    #[test]
    fn shape_errors_name_the_layer() {
        let layer = Layer::new("features.pool0", LayerKind::MaxPool2d(pool::MaxPool2d { size: 4 }));
        match layer.forward(&Tensor::zeros(&[1, 2, 2])) {
            Err(InferenceError::LayerShape { layer, shape, .. }) => {
                assert_eq!(layer, "features.pool0");
                assert_eq!(shape, vec![1, 2, 2]);
            }
            other => panic!("expected a shape error, got {:?}", other),
        }
    }

    #[test]
    fn layers_round_trip_through_json() {
        let layer = Layer::new("features.norm", LayerKind::Activation {
            function: ActivationFunction::LeakyReLU { alpha: 0.01 },
        });
        let json = serde_json::to_string(&layer).unwrap();
        assert!(json.contains("\"type\":\"Activation\""));
        let back: Layer = serde_json::from_str(&json).unwrap();
        assert_eq!(back.name, "features.norm");
    }
}
