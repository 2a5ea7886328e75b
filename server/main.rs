/// medisight inference server
///
/// Accepts a chest X-ray upload on `POST /predict` and answers with the top
/// pathology, its score and a Grad-CAM heatmap. Served by a synchronous
/// tiny_http server, one thread per request.
///
/// Run with:
///   cargo run --bin medisight-server --release -- --model weights.json

mod config;
mod handlers;
mod routes;
mod state;
mod util;

use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use tiny_http::Server;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use medisight::{Engine, Network, NetworkSpec};

use config::ServerConfig;
use state::AppState;

fn load_network(config: &ServerConfig) -> Result<Network> {
    match &config.model {
        Some(path) => {
            info!("Loading weights from {}", path);
            Network::load_json(path).with_context(|| format!("failed to load model {}", path))
        }
        None => {
            warn!(
                seed = config.seed,
                "No --model given; using randomly initialized reference weights. \
                 Predictions are not clinically meaningful."
            );
            Ok(NetworkSpec::chest_xray().build(config.seed))
        }
    }
}

fn main() -> Result<()> {
    let config = ServerConfig::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::filter::LevelFilter::from_level(config.log_level()))
        .init();

    let network = load_network(&config)?;
    let engine = Engine::new(network, config.engine_config())
        .context("invalid Grad-CAM target layer")?;
    info!(
        layers = engine.network().layers.len(),
        labels = engine.network().labels().len(),
        target_layer = engine.target_layer(),
        "model ready"
    );

    let state = Arc::new(AppState {
        engine,
        cors: !config.no_cors,
        max_upload_bytes: config.max_upload_bytes(),
    });

    let server = Server::http(config.addr.as_str())
        .map_err(|e| anyhow!("failed to bind {}: {}", config.addr, e))?;
    info!("Listening on http://{}", config.addr);

    // Each request is dispatched on its own thread; inference keeps its
    // gradient tape on that thread, so requests never wait on each other.
    for request in server.incoming_requests() {
        let state = Arc::clone(&state);
        std::thread::spawn(move || {
            routes::dispatch(request, state);
        });
    }

    Ok(())
}
