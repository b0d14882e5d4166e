/// Data URI encoding and decoding for drawing payloads
use crate::error::{NoteboardError, NoteboardResult};
use base64::{engine::general_purpose::STANDARD, Engine};

/// Decode the base64 payload of a `data:<mime>;base64,<payload>` URI.
///
/// Everything up to the first comma is treated as the header and ignored,
/// the same way browsers' `canvas.toDataURL()` output is usually consumed.
pub fn decode_data_uri(data_uri: &str) -> NoteboardResult<Vec<u8>> {
    let (_, payload) = data_uri
        .split_once(',')
        .ok_or_else(|| NoteboardError::BadRequest("Malformed data URL".to_string()))?;

    STANDARD
        .decode(payload.trim())
        .map_err(|e| NoteboardError::BadRequest(format!("Invalid base64 in data URL: {}", e)))
}

/// Encode bytes as a base64 data URI
pub fn encode_data_uri(mime_type: &str, data: &[u8]) -> String {
    format!("data:{};base64,{}", mime_type, STANDARD.encode(data))
}

/// MIME type for a stored drawing, resolved from its file extension
pub fn mime_type_for(file_name: &str) -> &'static str {
    let ext = std::path::Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);

    match ext.as_deref() {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        _ => "application/octet-stream",
    }
}
