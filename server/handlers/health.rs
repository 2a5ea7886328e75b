use serde::Serialize;

use crate::routes::{json_response, HttpResponse};
use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse<'a> {
    pub status: &'a str,
    pub version: &'a str,
    pub labels: usize,
    pub target_layer: &'a str,
}

// ---------------------------------------------------------------------------
// GET /health
// ---------------------------------------------------------------------------

pub fn handle(state: &AppState) -> HttpResponse {
    let health = HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        labels: state.engine.network().labels().len(),
        target_layer: state.engine.target_layer(),
    };
    json_response(200, &health)
}
