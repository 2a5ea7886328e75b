use std::io::Cursor;
use std::time::Instant;

use serde::Serialize;
use tiny_http::{Header, Method, Request, Response, StatusCode};
use tracing::{info, warn};

use crate::handlers;
use crate::state::SharedState;

pub type HttpResponse = Response<Cursor<Vec<u8>>>;

// ---------------------------------------------------------------------------
// Response helpers
// ---------------------------------------------------------------------------

fn header(field: &str, value: &str) -> Option<Header> {
    Header::from_bytes(field.as_bytes(), value.as_bytes()).ok()
}

/// Serializes `body` as JSON with the given status.
pub fn json_response<T: Serialize>(status: u16, body: &T) -> HttpResponse {
    let bytes = match serde_json::to_vec(body) {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(error = %e, "failed to serialize response body");
            return error_response(500, "Failed to serialize response");
        }
    };
    let len = bytes.len();
    Response::new(
        StatusCode(status),
        header("Content-Type", "application/json").into_iter().collect(),
        Cursor::new(bytes),
        Some(len),
        None,
    )
}

#[derive(Serialize)]
struct ErrorDetail<'a> {
    detail: &'a str,
}

/// `{"detail": message}` with the given status.
pub fn error_response(status: u16, message: &str) -> HttpResponse {
    let bytes = serde_json::to_vec(&ErrorDetail { detail: message })
        .unwrap_or_else(|_| br#"{"detail":"Internal Server Error"}"#.to_vec());
    let len = bytes.len();
    Response::new(
        StatusCode(status),
        header("Content-Type", "application/json").into_iter().collect(),
        Cursor::new(bytes),
        Some(len),
        None,
    )
}

fn preflight() -> HttpResponse {
    Response::new(StatusCode(200), Vec::new(), Cursor::new(Vec::new()), Some(0), None)
}

fn with_cors(mut response: HttpResponse) -> HttpResponse {
    let headers = [
        ("Access-Control-Allow-Origin", "*"),
        ("Access-Control-Allow-Methods", "GET, POST, OPTIONS"),
        ("Access-Control-Allow-Headers", "Origin, X-Requested-With, Content-Type, Accept, Authorization"),
    ];
    for (field, value) in headers {
        if let Some(h) = header(field, value) {
            response.add_header(h);
        }
    }
    response
}

// ---------------------------------------------------------------------------
// Request dispatcher
// ---------------------------------------------------------------------------

/// Dispatches one request and writes its response.
pub fn dispatch(mut request: Request, state: SharedState) {
    let started = Instant::now();
    let method = request.method().clone();
    let url    = request.url().to_owned();
    let path   = url.split('?').next().unwrap_or("").to_owned();

    let response = match (&method, path.as_str()) {
        (Method::Post, "/predict") => handlers::predict::handle(&mut request, &state),
        (Method::Get,  "/health")  => handlers::health::handle(&state),
        (Method::Options, _) if state.cors => preflight(),
        _ => error_response(404, "Not Found"),
    };

    let status = response.status_code().0;
    let response = if state.cors { with_cors(response) } else { response };

    info!(
        method = %method,
        path = %path,
        status,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "request handled"
    );
    if let Err(e) = request.respond(response) {
        warn!(error = %e, "failed to write response");
    }
}
