use clap::Parser;

use medisight::{EngineConfig, RenderConfig};

/// Command-line configuration for the inference server.
#[derive(Parser, Debug, Clone)]
#[command(name = "medisight-server")]
#[command(version)]
#[command(about = "Chest X-ray pathology classification with Grad-CAM heatmaps over HTTP")]
#[command(long_about = "Serves POST /predict: upload a chest X-ray as multipart field `file` and
receive the top pathology, its score and a Grad-CAM heatmap as a JPEG data URI.

EXAMPLES:
  # Serve trained weights
  medisight-server --model weights/densenet-xray.json

  # Explain a different layer, log every request
  medisight-server --model weights/densenet-xray.json --target-layer features.conv4 -v")]
pub struct ServerConfig {
    /// Address to listen on
    #[arg(long, default_value = "0.0.0.0:8000", value_name = "ADDR")]
    pub addr: String,

    /// Network weights (JSON). Without it, the reference architecture is
    /// built from --seed and predictions carry no clinical meaning.
    #[arg(long, value_name = "PATH")]
    pub model: Option<String>,

    /// Seed for the reference weights when --model is absent
    #[arg(long, default_value = "0", value_name = "SEED")]
    pub seed: u64,

    /// Layer to explain (defaults to the model's metadata, then features.block4)
    #[arg(long, value_name = "LAYER")]
    pub target_layer: Option<String>,

    /// JPEG quality of the heatmap
    #[arg(long, default_value = "95", value_name = "Q",
          value_parser = clap::value_parser!(u8).range(1..=100))]
    pub jpeg_quality: u8,

    /// Largest accepted request body, in megabytes
    #[arg(long, default_value = "32", value_name = "MB")]
    pub max_upload_mb: usize,

    /// Do not send Access-Control-Allow-* headers
    #[arg(long)]
    pub no_cors: bool,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl ServerConfig {
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            target_layer: self.target_layer.clone(),
            render: RenderConfig { jpeg_quality: self.jpeg_quality },
        }
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_mb.saturating_mul(1024 * 1024)
    }

    pub fn log_level(&self) -> tracing::Level {
        match self.verbose {
            0 => tracing::Level::INFO,
            1 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_reference_deployment() {
        let config = ServerConfig::parse_from(["medisight-server"]);
        assert_eq!(config.addr, "0.0.0.0:8000");
        assert_eq!(config.jpeg_quality, 95);
        assert!(config.model.is_none());
        assert!(!config.no_cors);
        assert_eq!(config.log_level(), tracing::Level::INFO);
    }

    #[test]
    fn jpeg_quality_is_bounded() {
        assert!(ServerConfig::try_parse_from(["medisight-server", "--jpeg-quality", "0"]).is_err());
        let config = ServerConfig::parse_from(["medisight-server", "--jpeg-quality", "80", "-vv"]);
        assert_eq!(config.engine_config().render.jpeg_quality, 80);
        assert_eq!(config.log_level(), tracing::Level::TRACE);
    }
}
