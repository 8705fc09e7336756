//! CLI binary for edgequake-offers.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ExtractionConfig` and prints the result table as CSV.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_offers::{
    extract_paths, extract_to_file, ExtractionConfig, ExtractionOutput,
    ExtractionProgressCallback, ProgressCallback,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const SPINNER: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a live bar plus one log line per image.
struct CliProgressCallback {
    bar: ProgressBar,
    /// Per-image wall-clock start times, keyed by 1-based index.
    start_times: Mutex<HashMap<usize, Instant>>,
}

impl CliProgressCallback {
    /// Spinner-only until `on_batch_start` reports the image count.
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(SPINNER);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Reading images…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
        })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} images  \
             ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(SPINNER);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Extracting");
        self.bar.reset_eta();
    }

    fn elapsed_secs(&self, index: usize) -> f64 {
        self.start_times
            .lock()
            .ok()
            .and_then(|mut times| times.remove(&index))
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl ExtractionProgressCallback for CliProgressCallback {
    fn on_batch_start(&self, total_images: usize) {
        self.activate_bar(total_images);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Extracting offers from {total_images} image(s)…"))
        ));
    }

    fn on_image_start(&self, index: usize, _total: usize, filename: &str) {
        if let Ok(mut times) = self.start_times.lock() {
            times.insert(index, Instant::now());
        }
        self.bar.set_message(filename.to_string());
    }

    fn on_image_complete(&self, index: usize, total: usize, filename: &str, products: usize) {
        let secs = self.elapsed_secs(index);
        self.bar.println(format!(
            "  {} {:>3}/{:<3}  {:<32}  {}  {}",
            green("✓"),
            index,
            total,
            filename,
            dim(&format!("{products:>3} products")),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_image_error(&self, index: usize, total: usize, filename: &str, error: &str) {
        let secs = self.elapsed_secs(index);

        // Keep one line per image.
        let msg = match error.char_indices().nth(80) {
            Some((cut, _)) => format!("{}\u{2026}", &error[..cut]),
            None => error.to_string(),
        };

        self.bar.println(format!(
            "  {} {:>3}/{:<3}  {:<32}  {}  {}",
            red("✗"),
            index,
            total,
            filename,
            red(&msg),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_batch_complete(&self, total_images: usize, success_count: usize, product_count: usize) {
        let failed = total_images.saturating_sub(success_count);
        self.bar.finish_and_clear();

        if failed == 0 {
            eprintln!(
                "{} {} products from {} image(s)",
                green("✔"),
                bold(&product_count.to_string()),
                success_count
            );
        } else {
            eprintln!(
                "{} {} products from {}/{} image(s)  ({} failed)",
                if failed == total_images {
                    red("✘")
                } else {
                    cyan("⚠")
                },
                bold(&product_count.to_string()),
                success_count,
                total_images,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Every .jpg/.jpeg/.png in ./sample-data, CSV on stdout
  offers2csv sample-data

  # Write the table to a file
  offers2csv banner1.jpg banner2.png -o ofertas_extraidas.csv

  # Use a specific model
  offers2csv --provider openai --model gpt-4o flyer.jpg

  # Download and process an image URL
  offers2csv https://example.com/encarte/semana.jpg

  # Structured JSON (products, per-image results, stats)
  offers2csv --json sample-data > ofertas.json

CSV COLUMNS:
  arquivo, marca_nome, marca, produto, preco_brl, preco_brl_texto, condicoes

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY          OpenAI API key
  ANTHROPIC_API_KEY       Anthropic API key
  GEMINI_API_KEY          Google Gemini API key
  EDGEQUAKE_LLM_PROVIDER  Override provider (openai, anthropic, gemini, ollama)
  EDGEQUAKE_MODEL         Override model ID

  Variables are also read from a .env file in the working directory.
"#;

/// Extract product offers from retail banner images into a CSV table.
#[derive(Parser, Debug)]
#[command(
    name = "offers2csv",
    version,
    about = "Extract product offers from retail banner images into CSV using Vision LLMs",
    long_about = "Send retail banner photos (local files, folders, or URLs) to a vision LLM, \
read every product offer it finds (brand, name, BRL price, conditions), and export one \
CSV table. Supports OpenAI, Anthropic, Google Gemini, Azure OpenAI, and any \
OpenAI-compatible endpoint (Ollama, vLLM, LiteLLM, etc.).",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Image files, folders of images, or HTTP/HTTPS URLs.
    #[arg(required = true)]
    inputs: Vec<String>,

    /// Write CSV to this file instead of stdout.
    #[arg(short, long, env = "OFFERS_OUTPUT")]
    output: Option<PathBuf>,

    /// Vision model ID (e.g. gpt-4o-mini, gpt-4o, claude-sonnet-4-20250514).
    #[arg(long, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// LLM provider: openai, anthropic, gemini, ollama, azure.
    #[arg(
        long,
        env = "EDGEQUAKE_PROVIDER",
        long_help = "LLM provider. Auto-detected from API key env vars if not set.\n\
          Supported: openai, anthropic, gemini, azure, ollama, or any OpenAI-compatible URL."
    )]
    provider: Option<String>,

    /// Path to a text file replacing the built-in extraction rules.
    #[arg(long, env = "OFFERS_SYSTEM_PROMPT")]
    system_prompt: Option<PathBuf>,

    /// LLM temperature (0.0–2.0). Provider default when unset.
    #[arg(long, env = "OFFERS_TEMPERATURE")]
    temperature: Option<f32>,

    /// Max LLM output tokens per image. Provider default when unset.
    #[arg(long, env = "OFFERS_MAX_TOKENS")]
    max_tokens: Option<usize>,

    /// Output structured JSON (ExtractionOutput) instead of CSV.
    #[arg(long, env = "OFFERS_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "OFFERS_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "OFFERS_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "OFFERS_QUIET")]
    quiet: bool,

    /// HTTP download timeout in seconds for URL inputs.
    #[arg(long, env = "OFFERS_DOWNLOAD_TIMEOUT", default_value_t = 60)]
    download_timeout: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is fine.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO-level library logs.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        let cb = CliProgressCallback::new_dynamic();
        Some(cb as Arc<dyn ExtractionProgressCallback>)
    } else {
        None
    };

    let config = build_config(&cli, progress_cb).await?;

    // ── Run extraction ───────────────────────────────────────────────────
    let output = if let Some(ref output_path) = cli.output {
        let output = extract_to_file(&cli.inputs, output_path, &config)
            .await
            .context("Extraction failed")?;
        if !cli.quiet {
            eprintln!(
                "{}  {} rows  →  {}",
                if output.stats.failed_images == 0 {
                    green("✔")
                } else {
                    cyan("⚠")
                },
                output.products.len(),
                bold(&output_path.display().to_string()),
            );
        }
        output
    } else {
        let output = extract_paths(&cli.inputs, &config)
            .await
            .context("Extraction failed")?;

        let stdout = io::stdout();
        let mut handle = stdout.lock();
        if cli.json {
            let json =
                serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
            writeln!(handle, "{json}").context("Failed to write to stdout")?;
        } else {
            output
                .table()
                .write_csv(&mut handle)
                .context("Failed to write CSV to stdout")?;
        }
        output
    };

    if !cli.quiet {
        report(&output, show_progress);
    }

    Ok(())
}

/// Per-image failures, the empty-result notice and token totals on stderr.
fn report(output: &ExtractionOutput, show_progress: bool) {
    // The progress bar already printed one line per failed image.
    if !show_progress {
        for err in output.errors() {
            eprintln!("{} {}", red("✗"), err);
        }
    }

    if output.is_empty() {
        eprintln!("{} No products found in the given images.", cyan("ℹ"));
    }

    eprintln!(
        "   {} tokens in  /  {} tokens out  —  {}ms total",
        dim(&output.stats.total_input_tokens.to_string()),
        dim(&output.stats.total_output_tokens.to_string()),
        output.stats.total_duration_ms,
    );
}

/// Map CLI args to `ExtractionConfig`.
async fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ExtractionConfig> {
    let mut builder = ExtractionConfig::builder().download_timeout_secs(cli.download_timeout);

    if let Some(ref path) = cli.system_prompt {
        let prompt = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read system prompt from {:?}", path))?;
        builder = builder.system_prompt(prompt);
    }
    if let Some(ref model) = cli.model {
        builder = builder.model(model);
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider);
    }
    if let Some(t) = cli.temperature {
        builder = builder.temperature(t);
    }
    if let Some(n) = cli.max_tokens {
        builder = builder.max_tokens(n);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
