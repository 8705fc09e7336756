//! Error types for the edgequake-offers library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`OffersError`]: fatal. The batch cannot start or its output cannot
//!   be written (missing image file, no vision provider configured, output
//!   path not writable). Returned as `Err(OffersError)` from the top-level
//!   `extract*` functions.
//!
//! * [`ImageError`]: non-fatal. A single image failed (provider error,
//!   empty upload) but every other image in the batch is still processed.
//!   Stored inside [`crate::output::ImageResult`] so callers can report the
//!   offending filename and keep the products from the rest of the batch.
//!
//! A malformed model reply is *not* an error at all: the response parser
//! degrades it to zero products.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the edgequake-offers library.
///
/// Per-image failures use [`ImageError`] and are stored in
/// [`crate::output::ImageResult`] rather than propagated here.
#[derive(Debug, Error)]
pub enum OffersError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input image was not found at the given path.
    #[error("Image file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input string is not a file, a directory, or a valid HTTP/HTTPS URL.
    #[error("Invalid input '{input}': not a file path, a directory, or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    // ── LLM errors ────────────────────────────────────────────────────────
    /// No vision provider could be built (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    // ── Output errors ─────────────────────────────────────────────────────
    /// The result table could not be rendered as CSV.
    #[error("Failed to render CSV: {0}")]
    Csv(#[from] csv::Error),

    /// Could not create or write the output CSV file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single image.
///
/// The batch continues; only this image's products are missing from the
/// final table.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
pub enum ImageError {
    /// The image had no bytes to send.
    #[error("{file}: image is empty")]
    EmptyImage { file: String },

    /// The vision model call failed.
    #[error("{file}: model call failed: {detail}")]
    ModelFailed { file: String, detail: String },
}

impl ImageError {
    /// Filename of the image that failed.
    pub fn file(&self) -> &str {
        match self {
            ImageError::EmptyImage { file } | ImageError::ModelFailed { file, .. } => file,
        }
    }
}

/// Error returned by a [`crate::pipeline::llm::VisionModel`] implementation.
///
/// The pipeline never inspects it beyond its message; it is turned into an
/// [`ImageError::ModelFailed`] for the image being processed.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ModelError {
    pub message: String,
}

impl ModelError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_failed_display_names_file() {
        let e = ImageError::ModelFailed {
            file: "banner.jpg".into(),
            detail: "HTTP 500".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("banner.jpg"), "got: {msg}");
        assert!(msg.contains("HTTP 500"), "got: {msg}");
        assert_eq!(e.file(), "banner.jpg");
    }

    #[test]
    fn empty_image_display() {
        let e = ImageError::EmptyImage {
            file: "blank.png".into(),
        };
        assert_eq!(e.to_string(), "blank.png: image is empty");
    }

    #[test]
    fn provider_not_configured_display() {
        let e = OffersError::ProviderNotConfigured {
            provider: "openai".into(),
            hint: "Set OPENAI_API_KEY".into(),
        };
        assert!(e.to_string().contains("openai"));
        assert!(e.to_string().contains("OPENAI_API_KEY"));
    }

    #[test]
    fn download_timeout_display() {
        let e = OffersError::DownloadTimeout {
            url: "https://example.org/a.jpg".into(),
            secs: 30,
        };
        assert!(e.to_string().contains("30s"));
    }

    #[test]
    fn model_error_is_its_message() {
        assert_eq!(ModelError::new("rate limited").to_string(), "rate limited");
    }
}
