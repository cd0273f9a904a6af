//! Text extraction: stored upload → text.
//!
//! PDFs go through [`render`](super::render) and [`ocr`](super::ocr) on the
//! blocking pool; `.txt` uploads are read directly. Either way the caller
//! gets `Result<String, ExtractionError>` and must branch on it before the
//! text is used in a prompt. A blank result is an error too
//! ([`ExtractionError::NoText`]), so a failed scan can never slip into the
//! prompt as an empty section.

use crate::config::ServiceConfig;
use crate::error::ExtractionError;
use crate::pipeline::ocr::TesseractOcr;
use crate::pipeline::render::{render_each_page, RenderSettings};
use crate::pipeline::validate::DocumentKind;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Converts a PDF on disk into text.
///
/// Implementations are **blocking**; [`extract_document`] runs them inside
/// `spawn_blocking`.
pub trait TextExtractor: Send + Sync {
    /// Text of every page in page order, each page followed by `\n`.
    fn extract_pdf(&self, pdf_path: &Path) -> Result<String, ExtractionError>;
}

/// pdfium rendering + tesseract OCR.
#[derive(Debug, Clone)]
pub struct OcrTextExtractor {
    render: RenderSettings,
    ocr: TesseractOcr,
}

impl OcrTextExtractor {
    pub fn new(render: RenderSettings, ocr: TesseractOcr) -> Self {
        Self { render, ocr }
    }

    pub fn from_config(config: &ServiceConfig) -> Self {
        Self::new(
            RenderSettings::from_config(config),
            TesseractOcr::new(&config.tesseract_bin, &config.ocr_language),
        )
    }
}

impl TextExtractor for OcrTextExtractor {
    fn extract_pdf(&self, pdf_path: &Path) -> Result<String, ExtractionError> {
        let scratch = tempfile::TempDir::new()
            .map_err(|e| ExtractionError::Io(format!("scratch dir: {}", e)))?;

        let mut text = String::new();
        let pages = render_each_page(pdf_path, &self.render, |page, image| {
            let page_text = self.ocr.recognize(&image, scratch.path(), page)?;
            text.push_str(&page_text);
            text.push('\n');
            Ok(())
        })?;

        info!(
            "OCR complete: {} pages, {} chars ({})",
            pages,
            text.len(),
            pdf_path.display()
        );
        Ok(text)
    }
}

/// Extract text from a stored upload of the given kind.
///
/// Never panics and never returns anything but an [`ExtractionError`] on
/// failure: a panic inside the extractor is caught at the task boundary.
/// Failures are logged here so callers only need to report them.
pub async fn extract_document(
    extractor: Arc<dyn TextExtractor>,
    path: &Path,
    kind: DocumentKind,
) -> Result<String, ExtractionError> {
    let result = match kind {
        DocumentKind::Text => read_text_file(path).await,
        DocumentKind::Pdf => {
            let pdf_path = path.to_path_buf();
            match tokio::task::spawn_blocking(move || extractor.extract_pdf(&pdf_path)).await {
                Ok(inner) => inner,
                Err(e) => Err(ExtractionError::Internal(e.to_string())),
            }
        }
    };

    let text = match result {
        Ok(text) if text.trim().is_empty() => Err(ExtractionError::NoText),
        other => other,
    };

    if let Err(ref e) = text {
        warn!("Extraction failed for {}: {}", path.display(), e);
    }
    text
}

/// Read a text upload, replacing invalid UTF-8 rather than failing on it.
async fn read_text_file(path: &Path) -> Result<String, ExtractionError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| ExtractionError::Io(format!("reading {}: {}", path.display(), e)))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
