//! Configuration for the spec-deviation service.
//!
//! Every knob lives in [`ServiceConfig`], built via its
//! [`ServiceConfigBuilder`]. The storage directory is part of the config and
//! is threaded through [`crate::server::AppState`] into each request, so two
//! servers (or two test runs) with different directories never touch each
//! other's files.

use crate::error::AppError;
use std::path::PathBuf;

/// Configuration for the web service and its pipeline stages.
///
/// # Example
/// ```rust
/// use spec_deviation::ServiceConfig;
///
/// let config = ServiceConfig::builder()
///     .storage_dir("/tmp/spec-deviation")
///     .model("gpt-4-turbo")
///     .dpi(300)
///     .build()
///     .unwrap();
/// assert_eq!(config.dpi, 300);
/// ```
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Directory holding every upload and the single output file. Default: `uploads`.
    pub storage_dir: PathBuf,

    /// Name of the output file inside `storage_dir`. Default: `output.txt`.
    ///
    /// Overwritten on every successful submission.
    pub output_file_name: String,

    /// Base URL of the OpenAI-compatible API. Default: `https://api.openai.com/v1`.
    pub api_base_url: String,

    /// Chat model identifier. Default: `gpt-4-turbo`.
    pub model: String,

    /// Custom system message. If None, uses [`crate::prompts::SYSTEM_PROMPT`].
    pub system_prompt: Option<String>,

    /// Per-document character cap applied while assembling the prompt. Default: 100 000.
    ///
    /// Roughly 25k tokens per document, which keeps two documents plus the
    /// format template inside a 128k-token context window.
    pub max_document_chars: usize,

    /// Rendering DPI used before OCR. Range: 72–400. Default: 200.
    ///
    /// Tesseract is tuned for text around 300 DPI; 200 is a good trade
    /// between accuracy and OCR time on letter/A4 pages.
    pub dpi: u32,

    /// Maximum rendered image dimension in pixels. Default: 4000.
    pub max_rendered_pixels: u32,

    /// Tesseract language code(s), e.g. `eng` or `eng+deu`. Default: `eng`.
    pub ocr_language: String,

    /// Tesseract executable name or path. Default: `tesseract`.
    pub tesseract_bin: String,

    /// Explicit pdfium shared library. If None, the system library is used.
    pub pdfium_lib_path: Option<PathBuf>,

    /// Timeout for the completion call in seconds. Default: None (wait indefinitely).
    pub api_timeout_secs: Option<u64>,

    /// Request body limit for the upload form in bytes. Default: 32 MiB.
    pub max_upload_bytes: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            storage_dir: PathBuf::from("uploads"),
            output_file_name: "output.txt".to_string(),
            api_base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4-turbo".to_string(),
            system_prompt: None,
            max_document_chars: 100_000,
            dpi: 200,
            max_rendered_pixels: 4000,
            ocr_language: "eng".to_string(),
            tesseract_bin: "tesseract".to_string(),
            pdfium_lib_path: None,
            api_timeout_secs: None,
            max_upload_bytes: 32 * 1024 * 1024,
        }
    }
}

impl ServiceConfig {
    /// Create a new builder for `ServiceConfig`.
    pub fn builder() -> ServiceConfigBuilder {
        ServiceConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ServiceConfig`].
#[derive(Debug)]
pub struct ServiceConfigBuilder {
    config: ServiceConfig,
}

impl ServiceConfigBuilder {
    pub fn storage_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.storage_dir = dir.into();
        self
    }

    pub fn output_file_name(mut self, name: impl Into<String>) -> Self {
        self.config.output_file_name = name.into();
        self
    }

    pub fn api_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.api_base_url = url.into();
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    pub fn max_document_chars(mut self, n: usize) -> Self {
        self.config.max_document_chars = n;
        self
    }

    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi.clamp(72, 400);
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn ocr_language(mut self, lang: impl Into<String>) -> Self {
        self.config.ocr_language = lang.into();
        self
    }

    pub fn tesseract_bin(mut self, bin: impl Into<String>) -> Self {
        self.config.tesseract_bin = bin.into();
        self
    }

    pub fn pdfium_lib_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_lib_path = Some(path.into());
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = Some(secs);
        self
    }

    pub fn max_upload_bytes(mut self, n: usize) -> Self {
        self.config.max_upload_bytes = n;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ServiceConfig, AppError> {
        let c = &self.config;
        if c.output_file_name.is_empty()
            || c.output_file_name.contains(['/', '\\'])
            || c.output_file_name == "."
            || c.output_file_name == ".."
        {
            return Err(AppError::InvalidConfig(format!(
                "output file name must be a plain file name, got {:?}",
                c.output_file_name
            )));
        }
        if !(c.api_base_url.starts_with("http://") || c.api_base_url.starts_with("https://")) {
            return Err(AppError::InvalidConfig(format!(
                "API base URL must be http(s), got {:?}",
                c.api_base_url
            )));
        }
        if c.model.trim().is_empty() {
            return Err(AppError::InvalidConfig("model must not be empty".into()));
        }
        if c.max_document_chars == 0 {
            return Err(AppError::InvalidConfig(
                "max_document_chars must be ≥ 1".into(),
            ));
        }
        if c.ocr_language.trim().is_empty() {
            return Err(AppError::InvalidConfig("OCR language must not be empty".into()));
        }
        if c.api_timeout_secs == Some(0) {
            return Err(AppError::InvalidConfig("API timeout must be ≥ 1s".into()));
        }
        Ok(self.config)
    }
}
