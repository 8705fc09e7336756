//! Output types: canonical products, per-image results and batch statistics.

use crate::error::ImageError;
use crate::pipeline::aggregate::ResultTable;
use serde::{Deserialize, Serialize};

/// Condition kind used when the source does not name one.
pub const DEFAULT_CONDITION_KIND: &str = "other";

/// An ancillary qualifier attached to an offer (discount, validity date, …).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    pub kind: String,
    pub value: String,
}

impl Condition {
    pub fn new(kind: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            value: value.into(),
        }
    }

    /// `"<kind>: <value>"`, with [`DEFAULT_CONDITION_KIND`] for an empty kind.
    pub fn render(&self) -> String {
        let kind = if self.kind.is_empty() {
            DEFAULT_CONDITION_KIND
        } else {
            &self.kind
        };
        format!("{}: {}", kind, self.value)
    }
}

/// One product offer read from one image, fully normalised.
///
/// String fields are empty rather than missing; `price_value` is `None` when
/// no price could be parsed (distinct from a zero price).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedProduct {
    /// Filename of the originating image.
    pub source_file: String,
    /// Brand and product name together, as printed.
    pub brand_name: String,
    pub brand: String,
    pub product: String,
    /// Price in BRL; always finite when present.
    pub price_value: Option<f64>,
    /// Price exactly as printed, e.g. `"R$ 29,90"`.
    pub price_text: String,
    pub conditions: Vec<Condition>,
}

impl ExtractedProduct {
    /// Conditions as one `"; "`-joined string, the form used in the table.
    pub fn conditions_text(&self) -> String {
        self.conditions
            .iter()
            .map(Condition::render)
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Result for a single image in the batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageResult {
    /// 1-indexed position in the batch.
    pub index: usize,
    pub source_file: String,
    /// Products found; empty when the image failed.
    pub products: Vec<ExtractedProduct>,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub duration_ms: u64,
    /// `Some` when this image failed; the batch carried on.
    pub error: Option<ImageError>,
}

impl ImageResult {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Aggregate statistics for one batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionStats {
    pub total_images: usize,
    pub processed_images: usize,
    pub failed_images: usize,
    pub total_products: usize,
    pub total_input_tokens: u64,
    pub total_output_tokens: u64,
    pub total_duration_ms: u64,
}

/// Everything produced by one batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionOutput {
    /// All products, in image order then model order.
    pub products: Vec<ExtractedProduct>,
    /// Per-image outcome, in processing order.
    pub images: Vec<ImageResult>,
    pub stats: ExtractionStats,
}

impl ExtractionOutput {
    /// Build the flat export table.
    pub fn table(&self) -> ResultTable {
        ResultTable::from_products(&self.products)
    }

    /// `true` when no image yielded any product. Not an error.
    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    /// Errors of the images that failed.
    pub fn errors(&self) -> impl Iterator<Item = &ImageError> {
        self.images.iter().filter_map(|r| r.error.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(conditions: Vec<Condition>) -> ExtractedProduct {
        ExtractedProduct {
            source_file: "a.jpg".into(),
            brand_name: String::new(),
            brand: String::new(),
            product: String::new(),
            price_value: None,
            price_text: String::new(),
            conditions,
        }
    }

    #[test]
    fn conditions_render_with_other_for_empty_kind() {
        let p = product(vec![
            Condition::new("discount", "10%"),
            Condition::new("", "until 5/1"),
        ]);
        assert_eq!(p.conditions_text(), "discount: 10%; other: until 5/1");
    }

    #[test]
    fn no_conditions_render_empty() {
        assert_eq!(product(Vec::new()).conditions_text(), "");
    }

    #[test]
    fn output_reports_errors_and_emptiness() {
        let output = ExtractionOutput {
            products: Vec::new(),
            images: vec![ImageResult {
                index: 1,
                source_file: "a.jpg".into(),
                products: Vec::new(),
                input_tokens: 0,
                output_tokens: 0,
                duration_ms: 3,
                error: Some(ImageError::EmptyImage { file: "a.jpg".into() }),
            }],
            stats: ExtractionStats::default(),
        };
        assert!(output.is_empty());
        assert_eq!(output.errors().count(), 1);
        assert!(output.table().is_empty());
    }
}
