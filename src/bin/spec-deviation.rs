//! CLI binary for spec-deviation.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ServiceConfig` and starts the web server.

use anyhow::{Context, Result};
use clap::Parser;
use spec_deviation::pipeline::extract::extract_document;
use spec_deviation::pipeline::validate::DocumentKind;
use spec_deviation::{serve, AppState, OcrTextExtractor, ServiceConfig};
use std::io::{self, Write};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

const AFTER_HELP: &str = r#"EXAMPLES:
  # Serve on the default address (http://127.0.0.1:5000)
  spec-deviation

  # Listen on all interfaces, keep uploads elsewhere
  spec-deviation --bind 0.0.0.0:8080 --storage-dir /var/lib/spec-deviation

  # Use an OpenAI-compatible gateway and a different model
  spec-deviation --api-base-url http://localhost:4000/v1 --model gpt-4o

  # OCR one document and print the text (no server, no API key)
  spec-deviation --extract-only requirement.pdf

SYSTEM REQUIREMENTS:
  pdfium      shared library, system-wide or via PDFIUM_LIB_PATH
  tesseract   on PATH (or --tesseract /path/to/tesseract), with the
              language data for --ocr-language installed

  The API key is entered by the user in the web form for every
  submission; the server never reads one from the environment.

ENVIRONMENT VARIABLES:
  RUST_LOG                      Log filter, overrides --verbose/--quiet
  PDFIUM_LIB_PATH               Path to libpdfium
  SPEC_DEVIATION_*              Every flag, e.g. SPEC_DEVIATION_BIND
"#;

/// Compare a requirement specification with an in-house standard using OCR and an LLM.
#[derive(Parser, Debug)]
#[command(
    name = "spec-deviation",
    version,
    about = "Web service: OCR a requirement spec and a standard, ask an LLM for a deviation report",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Address to listen on.
    #[arg(short, long, env = "SPEC_DEVIATION_BIND", default_value = "127.0.0.1:5000")]
    bind: SocketAddr,

    /// Directory for uploads and the output file.
    #[arg(long, env = "SPEC_DEVIATION_STORAGE_DIR", default_value = "uploads")]
    storage_dir: PathBuf,

    /// Name of the output file inside the storage directory.
    #[arg(long, env = "SPEC_DEVIATION_OUTPUT_FILE", default_value = "output.txt")]
    output_file: String,

    /// Base URL of the OpenAI-compatible API.
    #[arg(
        long,
        env = "SPEC_DEVIATION_API_BASE_URL",
        default_value = "https://api.openai.com/v1"
    )]
    api_base_url: String,

    /// Chat model ID.
    #[arg(long, env = "SPEC_DEVIATION_MODEL", default_value = "gpt-4-turbo")]
    model: String,

    /// Path to a text file containing a custom system message.
    #[arg(long, env = "SPEC_DEVIATION_SYSTEM_PROMPT")]
    system_prompt: Option<PathBuf>,

    /// Character cap per document in the prompt.
    #[arg(long, env = "SPEC_DEVIATION_MAX_DOCUMENT_CHARS", default_value_t = 100_000)]
    max_document_chars: usize,

    /// Rendering DPI before OCR (72–400).
    #[arg(long, env = "SPEC_DEVIATION_DPI", default_value_t = 200,
          value_parser = clap::value_parser!(u32).range(72..=400))]
    dpi: u32,

    /// Maximum rendered page edge in pixels.
    #[arg(long, env = "SPEC_DEVIATION_MAX_PIXELS", default_value_t = 4000)]
    max_pixels: u32,

    /// Tesseract language(s), e.g. eng or eng+deu.
    #[arg(long, env = "SPEC_DEVIATION_OCR_LANGUAGE", default_value = "eng")]
    ocr_language: String,

    /// Tesseract executable.
    #[arg(long, env = "SPEC_DEVIATION_TESSERACT", default_value = "tesseract")]
    tesseract: String,

    /// Path to libpdfium; the system library is used if unset.
    #[arg(long, env = "PDFIUM_LIB_PATH")]
    pdfium_lib: Option<PathBuf>,

    /// Completion call timeout in seconds (default: none).
    #[arg(long, env = "SPEC_DEVIATION_API_TIMEOUT")]
    api_timeout: Option<u64>,

    /// Upload size limit in MiB.
    #[arg(long, env = "SPEC_DEVIATION_MAX_UPLOAD_MB", default_value_t = 32)]
    max_upload_mb: usize,

    /// Extract text from one file, print it and exit.
    #[arg(long, value_name = "FILE")]
    extract_only: Option<PathBuf>,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "SPEC_DEVIATION_VERBOSE")]
    verbose: bool,

    /// Suppress all logs except errors.
    #[arg(short, long, env = "SPEC_DEVIATION_QUIET", conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
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

    let config = build_config(&cli)?;

    // ── Extract-only mode ────────────────────────────────────────────────
    if let Some(ref path) = cli.extract_only {
        return extract_only(path, &config).await;
    }

    let state = AppState::from_config(config).context("Failed to initialise service")?;
    serve(cli.bind, state).await.context("Server failed")?;
    Ok(())
}

fn build_config(cli: &Cli) -> Result<ServiceConfig> {
    let mut builder = ServiceConfig::builder()
        .storage_dir(&cli.storage_dir)
        .output_file_name(&cli.output_file)
        .api_base_url(&cli.api_base_url)
        .model(&cli.model)
        .max_document_chars(cli.max_document_chars)
        .dpi(cli.dpi)
        .max_rendered_pixels(cli.max_pixels)
        .ocr_language(&cli.ocr_language)
        .tesseract_bin(&cli.tesseract)
        .max_upload_bytes(cli.max_upload_mb.saturating_mul(1024 * 1024));

    if let Some(ref path) = cli.system_prompt {
        let prompt = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read system prompt from '{}'", path.display()))?;
        builder = builder.system_prompt(prompt.trim());
    }
    if let Some(ref path) = cli.pdfium_lib {
        builder = builder.pdfium_lib_path(path);
    }
    if let Some(secs) = cli.api_timeout {
        builder = builder.api_timeout_secs(secs);
    }

    builder.build().context("Invalid configuration")
}

async fn extract_only(path: &Path, config: &ServiceConfig) -> Result<()> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    let kind = DocumentKind::from_filename(name).with_context(|| {
        format!(
            "Only PDF and text files are supported, got '{}'",
            path.display()
        )
    })?;

    let extractor = Arc::new(OcrTextExtractor::from_config(config));
    let text = extract_document(extractor, path, kind)
        .await
        .with_context(|| format!("Failed to extract text from '{}'", path.display()))?;

    io::stdout()
        .lock()
        .write_all(text.as_bytes())
        .context("Failed to write to stdout")?;
    Ok(())
}
