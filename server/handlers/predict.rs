use std::io::Read;

use tiny_http::Request;
use tracing::{debug, error};

use medisight::DiagnosisError;

use crate::routes::{error_response, json_response, HttpResponse};
use crate::state::AppState;
use crate::util::multipart::{extract_boundary, extract_upload};

/// Multipart field the upload is expected in.
pub const UPLOAD_FIELD: &str = "file";

// ---------------------------------------------------------------------------
// POST /predict
// ---------------------------------------------------------------------------

/// Every failure, whatever the stage, becomes a 500 carrying the message.
pub fn handle(request: &mut Request, state: &AppState) -> HttpResponse {
    let result = read_upload(request, state.max_upload_bytes)
        .and_then(|bytes| state.engine.diagnose(&bytes));

    match result {
        Ok(diagnosis) => json_response(200, &diagnosis),
        Err(e) => {
            error!("Error: {}", e);
            error_response(500, &e.to_string())
        }
    }
}

fn read_upload(request: &mut Request, limit: usize) -> Result<Vec<u8>, DiagnosisError> {
    let content_type = request.headers().iter()
        .find(|h| h.field.equiv("Content-Type"))
        .map(|h| h.value.as_str().to_owned())
        .unwrap_or_default();
    parse_upload(&content_type, request.as_reader(), limit)
}

/// Reads at most `limit` bytes of a multipart body and returns the image part.
fn parse_upload<R: Read>(content_type: &str, body: R, limit: usize) -> Result<Vec<u8>, DiagnosisError> {
    if !content_type.to_ascii_lowercase().starts_with("multipart/form-data") {
        return Err(DiagnosisError::Decode(format!(
            "expected multipart/form-data upload, got `{}`", content_type
        )));
    }
    let boundary = extract_boundary(content_type)
        .ok_or_else(|| DiagnosisError::Decode("multipart boundary missing".into()))?;

    let mut bytes = Vec::new();
    body.take(limit as u64 + 1)
        .read_to_end(&mut bytes)
        .map_err(|e| DiagnosisError::Decode(format!("failed to read upload: {}", e)))?;
    if bytes.len() > limit {
        return Err(DiagnosisError::Decode(format!("upload exceeds {} bytes", limit)));
    }
    debug!(bytes = bytes.len(), "received upload");

    extract_upload(&bytes, &boundary, UPLOAD_FIELD)
        .filter(|bytes| !bytes.is_empty())
        .ok_or_else(|| DiagnosisError::Decode("no image file was uploaded".into()))
}
