use serde::{Serialize, Deserialize};
use tracing::debug;

use crate::error::InferenceError;
use crate::gradcam::tap::Tap;
use crate::layers::Layer;
use crate::math::tensor::Tensor;
use crate::network::metadata::ModelMetadata;

/// Pretrained classifier: an ordered list of named layers mapping a
/// `(1, 1, H, W)` image to one score per label.
///
/// A `Network` is never mutated by inference. All per-request state lives in
/// the [`Trace`] and [`Tap`] returned to the caller, so one instance can be
/// shared across threads behind an `Arc`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Network {
    pub layers: Vec<Layer>,
    #[serde(default)]
    pub metadata: ModelMetadata,
}

/// Request-local record of one forward evaluation: the input each layer saw
/// and the final scores. Consumed by [`Network::backward`].
#[derive(Debug, Clone)]
pub struct Trace {
    inputs: Vec<Tensor>,
    scores: Tensor,
}

impl Trace {
    pub fn scores(&self) -> &[f64] {
        &self.scores.data
    }
}

impl Network {
    pub fn new(layers: Vec<Layer>, metadata: ModelMetadata) -> Network {
        Network { layers, metadata }
    }

    pub fn labels(&self) -> &[String] {
        &self.metadata.output_labels
    }

    /// The exact input shape `forward` accepts.
    pub fn input_shape(&self) -> [usize; 4] {
        let (w, h) = self.metadata.input_size;
        [1, 1, h as usize, w as usize]
    }

    /// Opens a tap on the layer called `name`.
    pub fn tap(&self, name: &str) -> Result<Tap, InferenceError> {
        self.layers.iter()
            .position(|l| l.name == name)
            .map(|index| Tap::new(index, name))
            .ok_or_else(|| InferenceError::UnknownLayer(name.to_owned()))
    }

    /// Scores only, without recording anything for a backward pass.
    pub fn predict(&self, input: &Tensor) -> Result<Vec<f64>, InferenceError> {
        let mut current = self.validate_input(input)?;
        for layer in &self.layers {
            current = layer.forward(&current)?;
        }
        Ok(self.check_scores(current)?.data)
    }

    /// One forward evaluation. The tapped layer's output is reported to `tap`.
    pub fn forward(&self, input: &Tensor, tap: &mut Tap) -> Result<Trace, InferenceError> {
        self.check_tap(tap)?;
        let mut current = self.validate_input(input)?;
        let mut inputs = Vec::with_capacity(self.layers.len());

        for (i, layer) in self.layers.iter().enumerate() {
            let output = layer.forward(&current)?;
            if i == tap.layer_index() {
                tap.observe_forward(&output)?;
            }
            inputs.push(current);
            current = output;
        }

        let scores = self.check_scores(current)?;
        debug!(layers = self.layers.len(), classes = scores.len(), "forward pass complete");
        Ok(Trace { inputs, scores })
    }

    /// One reverse-mode evaluation seeded with `∂score[class_index] = 1`.
    ///
    /// Walks the layers backwards only as far as the tapped layer and reports
    /// the gradient w.r.t. its output to `tap`.
    pub fn backward(&self, trace: Trace, class_index: usize, tap: &mut Tap) -> Result<(), InferenceError> {
        self.check_tap(tap)?;
        if trace.inputs.len() != self.layers.len() {
            return Err(InferenceError::TraceMismatch);
        }
        let classes = trace.scores.len();
        if class_index >= classes {
            return Err(InferenceError::ClassOutOfRange { index: class_index, classes });
        }

        let mut grad = Tensor::zeros(&trace.scores.shape);
        grad.data[class_index] = 1.0;

        for i in (tap.layer_index() + 1..self.layers.len()).rev() {
            grad = self.layers[i].backward(&trace.inputs[i], &grad)?;
        }

        debug!(layer = tap.layer_name(), "backward pass reached tapped layer");
        tap.observe_backward(grad)
    }

    fn check_tap(&self, tap: &Tap) -> Result<(), InferenceError> {
        match self.layers.get(tap.layer_index()) {
            Some(layer) if layer.name == tap.layer_name() => Ok(()),
            _ => Err(InferenceError::UnknownLayer(tap.layer_name().to_owned())),
        }
    }

    /// Checks shape and finiteness and drops the batch axis.
    fn validate_input(&self, input: &Tensor) -> Result<Tensor, InferenceError> {
        let expected = self.input_shape();
        if input.shape != expected {
            return Err(InferenceError::InputShape {
                expected: expected.to_vec(),
                got: input.shape.clone(),
            });
        }
        if !input.is_finite() {
            return Err(InferenceError::NonFiniteInput);
        }
        input.squeeze_leading(3).ok_or_else(|| InferenceError::InputShape {
            expected: expected.to_vec(),
            got: input.shape.clone(),
        })
    }

    fn check_scores(&self, output: Tensor) -> Result<Tensor, InferenceError> {
        if output.is_empty() {
            return Err(InferenceError::EmptyScores);
        }
        if !output.is_finite() {
            return Err(InferenceError::NonFiniteScores);
        }
        let len = output.len();
        Ok(output.reshape(&[len]))
    }

    /// Serializes the network weights to a pretty-printed JSON file.
    pub fn save_json(&self, path: &str) -> std::io::Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = std::io::BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))
    }

    /// Deserializes a network from a JSON file previously written by `save_json`.
    pub fn load_json(path: &str) -> std::io::Result<Network> {
        let file = std::fs::File::open(path)?;
        let reader = std::io::BufReader::new(file);
        serde_json::from_reader(reader)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }
}
