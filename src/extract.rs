//! Batch extraction entry points.
//!
//! Images are processed one at a time, in input order. Each image is an
//! isolated unit of work: a failing model call is recorded in that image's
//! [`ImageResult`] and the loop moves on. Only configuration and input
//! problems are fatal.

use crate::config::{ExtractionConfig, DEFAULT_MODEL};
use crate::error::{ImageError, OffersError};
use crate::output::{ExtractedProduct, ExtractionOutput, ExtractionStats, ImageResult};
use crate::pipeline::input::{self, ImageSource};
use crate::pipeline::llm::{EdgequakeVisionModel, ExtractionRequest, VisionModel};
use crate::pipeline::{encode, normalize, parse};
use crate::prompts::build_messages;
use edgequake_llm::ProviderFactory;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Extract offers from a batch of in-memory images.
///
/// This is the primary entry point for the library.
///
/// # Returns
/// `Ok(ExtractionOutput)` even when some images failed (check
/// `output.stats.failed_images`) or nothing was found (`output.is_empty()`).
///
/// # Errors
/// Returns `Err(OffersError)` only when no vision model can be configured.
/// An empty batch never resolves a model and always succeeds.
pub async fn extract(
    images: Vec<ImageSource>,
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, OffersError> {
    let total_start = Instant::now();
    let total = images.len();

    if images.is_empty() {
        warn!("No images to process");
        if let Some(ref cb) = config.progress_callback {
            cb.on_batch_start(0);
            cb.on_batch_complete(0, 0, 0);
        }
        return Ok(ExtractionOutput {
            products: Vec::new(),
            images: Vec::new(),
            stats: ExtractionStats::default(),
        });
    }

    info!("Starting extraction of {} image(s)", total);
    let model = resolve_model(config)?;

    if let Some(ref cb) = config.progress_callback {
        cb.on_batch_start(total);
    }

    let mut results = Vec::with_capacity(total);
    for (i, image) in images.iter().enumerate() {
        let index = i + 1;
        if let Some(ref cb) = config.progress_callback {
            cb.on_image_start(index, total, &image.filename);
        }

        let result = extract_image(model.as_ref(), index, image, config).await;

        match &result.error {
            None => {
                debug!("{}: {} product(s)", image.filename, result.products.len());
                if let Some(ref cb) = config.progress_callback {
                    cb.on_image_complete(index, total, &image.filename, result.products.len());
                }
            }
            Some(e) => {
                warn!("Failed to process {}: {}", image.filename, e);
                if let Some(ref cb) = config.progress_callback {
                    cb.on_image_error(index, total, &image.filename, &e.to_string());
                }
            }
        }
        results.push(result);
    }

    let products: Vec<ExtractedProduct> = results
        .iter()
        .flat_map(|r| r.products.iter().cloned())
        .collect();

    let processed = results.iter().filter(|r| r.is_success()).count();
    let stats = ExtractionStats {
        total_images: total,
        processed_images: processed,
        failed_images: total - processed,
        total_products: products.len(),
        total_input_tokens: results.iter().map(|r| r.input_tokens).sum(),
        total_output_tokens: results.iter().map(|r| r.output_tokens).sum(),
        total_duration_ms: total_start.elapsed().as_millis() as u64,
    };

    if products.is_empty() {
        info!("No products found in {} image(s)", total);
    } else {
        info!(
            "Extraction complete: {} product(s) from {}/{} image(s), {}ms total",
            products.len(),
            processed,
            total,
            stats.total_duration_ms
        );
    }

    if let Some(ref cb) = config.progress_callback {
        cb.on_batch_complete(total, processed, products.len());
    }

    Ok(ExtractionOutput {
        products,
        images: results,
        stats,
    })
}

/// Run the full pipeline for one image.
///
/// Always returns an [`ImageResult`]; failures are stored in `result.error`
/// so a single bad image never aborts the batch.
pub async fn extract_image(
    model: &dyn VisionModel,
    index: usize,
    image: &ImageSource,
    config: &ExtractionConfig,
) -> ImageResult {
    let start = Instant::now();
    let outcome = run_image(model, image, config).await;
    let duration_ms = start.elapsed().as_millis() as u64;

    let mut result = ImageResult {
        index,
        source_file: image.filename.clone(),
        products: Vec::new(),
        input_tokens: 0,
        output_tokens: 0,
        duration_ms,
        error: None,
    };
    match outcome {
        Ok(extracted) => {
            result.products = extracted.products;
            result.input_tokens = extracted.input_tokens;
            result.output_tokens = extracted.output_tokens;
        }
        Err(e) => result.error = Some(e),
    }
    result
}

struct ImageProducts {
    products: Vec<ExtractedProduct>,
    input_tokens: u64,
    output_tokens: u64,
}

/// Encode → prompt → model → parse → normalize for one image.
async fn run_image(
    model: &dyn VisionModel,
    image: &ImageSource,
    config: &ExtractionConfig,
) -> Result<ImageProducts, ImageError> {
    if image.bytes.is_empty() {
        return Err(ImageError::EmptyImage {
            file: image.filename.clone(),
        });
    }

    let encoded = encode::encode_image(&image.bytes, &image.filename);
    let messages = build_messages(config.effective_system_prompt(), encoded);
    let request = ExtractionRequest::new(messages, config);

    let reply = model
        .complete(&request)
        .await
        .map_err(|e| ImageError::ModelFailed {
            file: image.filename.clone(),
            detail: e.to_string(),
        })?;

    let parsed = parse::parse_response(&reply.content);
    Ok(ImageProducts {
        products: normalize::normalize_products(parsed.products(), &image.filename),
        input_tokens: reply.input_tokens,
        output_tokens: reply.output_tokens,
    })
}

/// Resolve paths, directories and URLs, then [`extract`] them.
pub async fn extract_paths(
    inputs: &[String],
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, OffersError> {
    let images = input::resolve_inputs(inputs, config.download_timeout_secs).await?;
    extract(images, config).await
}

/// Extract from `inputs` and write the result table as CSV to `output_path`.
///
/// The file is written to a temporary sibling and renamed into place, so a
/// failed run never leaves a partial CSV behind.
pub async fn extract_to_file(
    inputs: &[String],
    output_path: impl AsRef<Path>,
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, OffersError> {
    let output = extract_paths(inputs, config).await?;
    write_csv_atomic(&output, output_path.as_ref())?;
    Ok(output)
}

/// Synchronous wrapper around [`extract`].
///
/// Creates a temporary tokio runtime internally.
pub fn extract_sync(
    images: Vec<ImageSource>,
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, OffersError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| OffersError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(extract(images, config))
}

// ── Internal helpers ─────────────────────────────────────────────────────

fn write_csv_atomic(output: &ExtractionOutput, path: &Path) -> Result<(), OffersError> {
    let write_err = |source: std::io::Error| OffersError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent).map_err(write_err)?;

    let mut tmp = tempfile::NamedTempFile::new_in(parent).map_err(write_err)?;
    output.table().write_csv(tmp.as_file_mut())?;
    tmp.persist(path).map_err(|e| write_err(e.error))?;

    info!("Wrote {} row(s) to {}", output.products.len(), path.display());
    Ok(())
}

/// Instantiate a named provider with the given model.
fn create_vision_model(
    provider_name: &str,
    model: &str,
) -> Result<Arc<dyn VisionModel>, OffersError> {
    let provider = ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        OffersError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })?;
    Ok(Arc::new(EdgequakeVisionModel::new(provider)))
}

/// Resolve the vision model, from most-specific to least-specific.
///
/// 1. **Pre-built model** (`config.vision_model`): used as-is.
/// 2. **Named provider** (`config.provider_name`) with `config.model` or
///    [`DEFAULT_MODEL`].
/// 3. **Environment pair** `EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`.
/// 4. **OpenAI** when `OPENAI_API_KEY` is set.
/// 5. **Full auto-detection** via `ProviderFactory::from_env`.
fn resolve_model(config: &ExtractionConfig) -> Result<Arc<dyn VisionModel>, OffersError> {
    if let Some(ref model) = config.vision_model {
        return Ok(Arc::clone(model));
    }

    if let Some(ref name) = config.provider_name {
        let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);
        return create_vision_model(name, model);
    }

    if let (Ok(prov), Ok(model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !model.is_empty() {
            return create_vision_model(&prov, &model);
        }
    }

    if let Ok(openai_key) = std::env::var("OPENAI_API_KEY") {
        if !openai_key.is_empty() {
            let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);
            return create_vision_model("openai", model);
        }
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| OffersError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set OPENAI_API_KEY, ANTHROPIC_API_KEY, or configure a provider.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(Arc::new(EdgequakeVisionModel::new(llm_provider)))
}
