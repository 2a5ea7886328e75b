use std::sync::Arc;

use medisight::Engine;

/// Process-wide state shared by every request thread.
///
/// The engine is read-only after startup; each request keeps its own gradient
/// tape, so no lock is held around inference.
pub struct AppState {
    pub engine: Engine,
    pub cors: bool,
    pub max_upload_bytes: usize,
}

/// Shared state type: an `Arc<AppState>` passed to every handler.
pub type SharedState = Arc<AppState>;
