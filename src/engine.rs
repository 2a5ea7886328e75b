//! The diagnosis pipeline: upload bytes → prediction + Grad-CAM heatmap.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{InferenceError, Result};
use crate::gradcam::{capture, render_heatmap, RenderConfig};
use crate::math::tensor::Tensor;
use crate::network::{metadata::DEFAULT_TARGET_LAYER, Network};
use crate::preprocess::{decode_grayscale, to_input_tensor};

/// Value of `full_analysis` on every successful response.
pub const ANALYSIS_SUCCESS: &str = "Success";

/// Response payload for one analyzed image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diagnosis {
    /// Label of the top-scoring pathology.
    pub diagnosis: String,
    /// Raw classifier score for that pathology.
    pub confidence: f64,
    /// `data:image/jpeg;base64,...` heatmap at the upload's resolution.
    pub heatmap: String,
    pub full_analysis: String,
}

/// How an [`Engine`] explains predictions.
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    /// Layer to explain; falls back to the model metadata, then to
    /// `features.block4`.
    pub target_layer: Option<String>,
    pub render: RenderConfig,
}

/// A loaded classifier plus its explanation settings.
///
/// `diagnose` takes `&self` and keeps all intermediate state on the stack, so
/// an `Arc<Engine>` can serve concurrent requests without locking.
#[derive(Debug)]
pub struct Engine {
    network: Network,
    target_layer: String,
    render: RenderConfig,
}

impl Engine {
    /// Checks the target layer exists and runs one blank image through the
    /// network, so a typo or inconsistent weights fail at startup rather than
    /// on the first request.
    pub fn new(network: Network, config: EngineConfig) -> std::result::Result<Engine, InferenceError> {
        let target_layer = config.target_layer
            .or_else(|| network.metadata.target_layer.clone())
            .unwrap_or_else(|| DEFAULT_TARGET_LAYER.to_owned());
        network.tap(&target_layer)?;
        network.predict(&Tensor::zeros(&network.input_shape()))?;
        Ok(Engine { network, target_layer, render: config.render })
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    pub fn target_layer(&self) -> &str {
        &self.target_layer
    }

    /// Label for a class index, or `class_<i>` when the model has no label.
    pub fn label(&self, index: usize) -> String {
        self.network.labels()
            .get(index)
            .cloned()
            .unwrap_or_else(|| format!("class_{}", index))
    }

    /// Decodes `bytes`, classifies the image and explains the top class.
    pub fn diagnose(&self, bytes: &[u8]) -> Result<Diagnosis> {
        let image = decode_grayscale(bytes)?;
        let (width, height) = image.dimensions();
        debug!(width, height, "decoded upload");

        let (in_w, in_h) = self.network.metadata.input_size;
        let input = to_input_tensor(&image, in_w, in_h)?;

        let captured = capture(&self.network, &input, &self.target_layer)?;
        let heatmap = render_heatmap(&captured.activation, &captured.gradient, width, height, &self.render)?;

        let diagnosis = self.label(captured.class_index);
        info!("Prediction: {} | Score: {:.4}", diagnosis, captured.score);

        Ok(Diagnosis {
            diagnosis,
            confidence: captured.score,
            heatmap: heatmap.data_uri,
            full_analysis: ANALYSIS_SUCCESS.to_owned(),
        })
    }
}
