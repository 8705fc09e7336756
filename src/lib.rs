//! # edgequake-offers
//!
//! Extract product offers from retail banner photos using Vision Language
//! Models (VLMs).
//!
//! Each image is sent to a vision model together with fixed extraction rules.
//! The model answers with a JSON object listing the products it can read
//! (brand, name, price, conditions). Replies are parsed tolerantly, every
//! field is normalised into a canonical record, and all records are flattened
//! into one table ready for CSV export.
//!
//! ## Pipeline Overview
//!
//! ```text
//! images (files, folders, URLs)
//!  │
//!  ├─ 1. Input      resolve paths, expand folders, download URLs
//!  ├─ 2. Encode     bytes → base64 + MIME type from the filename
//!  ├─ 3. Prompt     system rules + one user message carrying the image
//!  ├─ 4. VLM        one call per image, sequential, no retries
//!  ├─ 5. Parse      strict JSON, else outermost {...}, else nothing
//!  ├─ 6. Normalize  key fallbacks, BRL price coercion, conditions
//!  └─ 7. Aggregate  one ResultTable → CSV
//! ```
//!
//! A failing image never aborts the batch: its error is recorded in its
//! [`ImageResult`] and the remaining images are processed.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_offers::{extract_paths, ExtractionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from OPENAI_API_KEY / ANTHROPIC_API_KEY / GEMINI_API_KEY
//!     let config = ExtractionConfig::default();
//!     let output = extract_paths(&["sample-data".to_string()], &config).await?;
//!     print!("{}", output.table().to_csv()?);
//!     eprintln!("{} products, {} image(s) failed",
//!         output.stats.total_products,
//!         output.stats.failed_images);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `offers2csv` binary (clap + anyhow + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! edgequake-offers = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod extract;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ExtractionConfig, ExtractionConfigBuilder, DEFAULT_MODEL};
pub use error::{ImageError, ModelError, OffersError};
pub use extract::{extract, extract_image, extract_paths, extract_sync, extract_to_file};
pub use output::{Condition, ExtractedProduct, ExtractionOutput, ExtractionStats, ImageResult};
pub use pipeline::aggregate::{Column, ResultTable, TableRow};
pub use pipeline::input::ImageSource;
pub use pipeline::llm::{EdgequakeVisionModel, ExtractionRequest, ModelReply, VisionModel};
pub use progress::{ExtractionProgressCallback, NoopProgressCallback, ProgressCallback};
