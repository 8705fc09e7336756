//! Pipeline stages for image-to-offer extraction.
//!
//! Each submodule implements exactly one transformation step, so every stage
//! is testable on its own and the model backend can be swapped without
//! touching parsing or normalisation.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ encode ──▶ llm ──▶ parse ──▶ normalize ──▶ aggregate
//! (path/URL) (base64)  (VLM)  (JSON)    (typed rows)  (table)
//! ```
//!
//! 1. [`input`] resolve paths, directories and URLs to `(filename, bytes)`
//! 2. [`encode`] MIME-type and base64-wrap the image bytes
//! 3. [`llm`] the model seam ([`llm::VisionModel`]); the only stage
//!    with network I/O
//! 4. [`parse`] tolerant JSON recovery of the `products` array
//! 5. [`normalize`] coerce each raw product into an
//!    [`crate::output::ExtractedProduct`]
//! 6. [`aggregate`] flatten all products into the fixed-column
//!    [`aggregate::ResultTable`]

pub mod aggregate;
pub mod encode;
pub mod input;
pub mod llm;
pub mod normalize;
pub mod parse;
