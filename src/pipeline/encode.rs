//! Image encoding: raw bytes → base64 payload tagged with a MIME type.
//!
//! VLM APIs accept images as base64 data-URIs embedded in the JSON request
//! body. The bytes are sent exactly as uploaded; banner photos are already
//! JPEG/PNG and re-encoding them would only cost fidelity.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use tracing::debug;

/// MIME type used when the filename extension is missing or unknown.
pub const DEFAULT_MIME_TYPE: &str = "image/jpeg";

/// An image ready to be embedded in a model request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    /// MIME type inferred from the filename, e.g. `image/png`.
    pub mime_type: String,
    /// Standard (padded) base64 of the original bytes.
    pub data: String,
}

impl EncodedImage {
    /// Render as a `data:` URL, the form OpenAI-style `image_url` parts expect.
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }
}

/// Encode raw image bytes for inclusion in a model request.
///
/// The MIME type comes from the extension of `filename` only; the bytes are
/// never sniffed. Unknown extensions fall back to [`DEFAULT_MIME_TYPE`].
pub fn encode_image(bytes: &[u8], filename: &str) -> EncodedImage {
    let mime_type = mime_for_filename(filename);
    let data = STANDARD.encode(bytes);
    debug!("Encoded {} → {} bytes base64 ({})", filename, data.len(), mime_type);

    EncodedImage { mime_type, data }
}

fn mime_for_filename(filename: &str) -> String {
    mime_guess::from_path(filename)
        .first_raw()
        .unwrap_or(DEFAULT_MIME_TYPE)
        .to_string()
}
