use rand::{rngs::StdRng, SeedableRng};
use serde::{Serialize, Deserialize};

use crate::activation::activation::ActivationFunction;
use crate::layers::{conv::Conv2d, dense::Dense, norm::BatchNorm, pool::MaxPool2d, Layer, LayerKind};
use crate::network::metadata::{ModelMetadata, DEFAULT_TARGET_LAYER};
use crate::network::network::Network;

/// Describes one layer in a network specification, without weights.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum LayerSpec {
    Conv2d {
        name: String,
        in_channels: usize,
        out_channels: usize,
        kernel: usize,
        stride: usize,
        padding: usize,
    },
    /// Frozen normalization; `scale` and `shift` apply to every channel.
    BatchNorm {
        name: String,
        channels: usize,
        scale: f64,
        shift: f64,
    },
    Activation {
        name: String,
        function: ActivationFunction,
    },
    MaxPool2d {
        name: String,
        size: usize,
    },
    GlobalAvgPool {
        name: String,
    },
    Dense {
        name: String,
        input_size: usize,
        size: usize,
    },
}

/// A fully serializable description of a network architecture plus its
/// metadata.
///
/// `NetworkSpec` can be saved to / loaded from JSON independently of the
/// weights. [`NetworkSpec::build`] instantiates it with seeded He
/// initialization, which makes every build of the same spec and seed
/// bit-identical.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkSpec {
    /// Human-readable name used as the model file stem.
    pub name: String,
    /// Ordered list of layer descriptions (input → output).
    pub layers: Vec<LayerSpec>,
    #[serde(default)]
    pub metadata: ModelMetadata,
}

impl NetworkSpec {
    /// Small DenseNet-style chest X-ray classifier over a 224x224 input:
    /// three convolution stages, global pooling, one sigmoid score per
    /// pathology. `features.block4` is the last spatial feature map.
    pub fn chest_xray() -> NetworkSpec {
        let metadata = ModelMetadata::default();
        let classes = metadata.output_labels.len();
        let conv = |name: &str, i, o, stride| LayerSpec::Conv2d {
            name: name.into(),
            in_channels: i,
            out_channels: o,
            kernel: 3,
            stride,
            padding: 1,
        };
        let relu = |name: &str| LayerSpec::Activation { name: name.into(), function: ActivationFunction::ReLU };
        let pool = |name: &str| LayerSpec::MaxPool2d { name: name.into(), size: 2 };

        NetworkSpec {
            name: "chest-xray-reference".into(),
            layers: vec![
                conv("features.conv0", 1, 8, 2),
                // Inputs span [-1024, 1024]; bring activations back to unit scale.
                LayerSpec::BatchNorm { name: "features.norm0".into(), channels: 8, scale: 1.0 / 1024.0, shift: 0.0 },
                relu("features.relu0"),
                pool("features.pool0"),
                conv("features.conv1", 8, 16, 1),
                relu("features.relu1"),
                pool("features.transition1"),
                conv("features.conv4", 16, 32, 1),
                relu(DEFAULT_TARGET_LAYER),
                LayerSpec::GlobalAvgPool { name: "pool".into() },
                LayerSpec::Dense { name: "classifier".into(), input_size: 32, size: classes },
                LayerSpec::Activation { name: "output".into(), function: ActivationFunction::Sigmoid },
            ],
            metadata,
        }
    }

    /// Instantiates the layers with weights drawn from `seed`.
    pub fn build(&self, seed: u64) -> Network {
        let mut rng = StdRng::seed_from_u64(seed);
        let layers = self.layers.iter()
            .map(|spec| match spec {
                LayerSpec::Conv2d { name, in_channels, out_channels, kernel, stride, padding } => Layer::new(
                    name.as_str(),
                    LayerKind::Conv2d(Conv2d::new(*in_channels, *out_channels, *kernel, *stride, *padding, &mut rng)),
                ),
                LayerSpec::BatchNorm { name, channels, scale, shift } => {
                    Layer::new(name.as_str(), LayerKind::BatchNorm(BatchNorm::uniform(*channels, *scale, *shift)))
                }
                LayerSpec::Activation { name, function } => {
                    Layer::new(name.as_str(), LayerKind::Activation { function: *function })
                }
                LayerSpec::MaxPool2d { name, size } => {
                    Layer::new(name.as_str(), LayerKind::MaxPool2d(MaxPool2d { size: *size }))
                }
                LayerSpec::GlobalAvgPool { name } => Layer::new(name.as_str(), LayerKind::GlobalAvgPool),
                LayerSpec::Dense { name, input_size, size } => {
                    Layer::new(name.as_str(), LayerKind::Dense(Dense::new(*size, *input_size, &mut rng)))
                }
            })
            .collect();
        Network::new(layers, self.metadata.clone())
    }
}
