// Self-describing blob encoding
//
// Blobs are stored as data URLs (data:<mime>;base64,<payload>) so a stored
// value can be turned back into a playable resource without keeping the
// content type anywhere else.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};

use crate::error::{Result, VidShelfError};

const DATA_SCHEME: &str = "data:";
const BASE64_MARKER: &str = ";base64,";
const FALLBACK_MIME: &str = "application/octet-stream";

/// A decoded blob value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedBlob {
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

pub fn encode_data_url(mime_type: &str, bytes: &[u8]) -> String {
    let mime = if mime_type.trim().is_empty() {
        FALLBACK_MIME
    } else {
        mime_type.trim()
    };
    format!("{}{}{}{}", DATA_SCHEME, mime, BASE64_MARKER, BASE64.encode(bytes))
}

pub fn decode_data_url(encoded: &str) -> Result<DecodedBlob> {
    let rest = encoded
        .strip_prefix(DATA_SCHEME)
        .ok_or_else(|| corrupt("missing data: scheme"))?;
    let (mime_type, payload) = rest
        .split_once(BASE64_MARKER)
        .ok_or_else(|| corrupt("missing ;base64, marker"))?;
    let bytes = BASE64
        .decode(payload)
        .map_err(|e| corrupt(&format!("invalid base64 payload: {}", e)))?;

    Ok(DecodedBlob {
        mime_type: if mime_type.is_empty() {
            FALLBACK_MIME.to_string()
        } else {
            mime_type.to_string()
        },
        bytes,
    })
}

fn corrupt(reason: &str) -> VidShelfError {
    VidShelfError::StorageFailure(format!("Corrupt blob entry: {}", reason))
}
