use serde::{Deserialize, Serialize};

/// Square input resolution the reference weights expect.
pub const DEFAULT_INPUT_SIZE: u32 = 224;

/// Layer explained by default: the output of the last spatial feature block.
pub const DEFAULT_TARGET_LAYER: &str = "features.block4";

/// Output classes of the `densenet121-res224-all` chest X-ray weights, in
/// score order.
pub const CHEST_XRAY_PATHOLOGIES: [&str; 18] = [
    "Atelectasis",
    "Consolidation",
    "Infiltration",
    "Pneumothorax",
    "Edema",
    "Emphysema",
    "Fibrosis",
    "Effusion",
    "Pneumonia",
    "Pleural_Thickening",
    "Cardiomegaly",
    "Nodule",
    "Mass",
    "Hernia",
    "Lung Lesion",
    "Fracture",
    "Lung Opacity",
    "Enlarged Cardiomediastinum",
];

/// Annotations stored next to the weights.
/// Missing fields fall back to the chest X-ray defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelMetadata {
    #[serde(default)]
    pub description: Option<String>,
    /// Single-channel input resolution `(width, height)`.
    #[serde(default = "default_input_size")]
    pub input_size: (u32, u32),
    /// Human-readable label per output score.
    #[serde(default = "default_labels")]
    pub output_labels: Vec<String>,
    /// Layer a Grad-CAM explanation targets when none is configured.
    #[serde(default)]
    pub target_layer: Option<String>,
}

impl Default for ModelMetadata {
    fn default() -> Self {
        ModelMetadata {
            description: None,
            input_size: default_input_size(),
            output_labels: default_labels(),
            target_layer: Some(DEFAULT_TARGET_LAYER.to_owned()),
        }
    }
}

fn default_input_size() -> (u32, u32) {
    (DEFAULT_INPUT_SIZE, DEFAULT_INPUT_SIZE)
}

fn default_labels() -> Vec<String> {
    CHEST_XRAY_PATHOLOGIES.iter().map(|s| s.to_string()).collect()
}
