//! OCR: run the `tesseract` CLI on a rendered page.
//!
//! The page is written as a lossless PNG into a caller-owned scratch
//! directory, tesseract prints the recognised text on stdout, and the PNG is
//! removed again. Blocking; call from the blocking pool.

use crate::error::ExtractionError;
use image::{DynamicImage, ImageFormat};
use std::path::Path;
use std::process::Command;
use tracing::debug;

/// Thin wrapper over the tesseract executable.
#[derive(Debug, Clone)]
pub struct TesseractOcr {
    binary: String,
    language: String,
}

impl TesseractOcr {
    pub fn new(binary: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            language: language.into(),
        }
    }

    /// OCR an in-memory page image. `scratch` must be a writable directory.
    pub fn recognize(
        &self,
        image: &DynamicImage,
        scratch: &Path,
        page: usize,
    ) -> Result<String, ExtractionError> {
        let png = scratch.join(format!("page-{page:04}.png"));
        image
            .save_with_format(&png, ImageFormat::Png)
            .map_err(|e| ExtractionError::Io(format!("writing {}: {}", png.display(), e)))?;

        let text = self.recognize_file(&png, page);
        // Scratch dir is cleaned up by its owner anyway.
        let _ = std::fs::remove_file(&png);
        text
    }

    /// OCR an image already on disk.
    pub fn recognize_file(&self, image_path: &Path, page: usize) -> Result<String, ExtractionError> {
        let output = Command::new(&self.binary)
            .arg(image_path)
            .arg("stdout")
            .arg("-l")
            .arg(&self.language)
            .output()
            .map_err(|e| ExtractionError::OcrUnavailable {
                binary: self.binary.clone(),
                detail: e.to_string(),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ExtractionError::OcrFailed {
                page,
                detail: stderr.trim().to_string(),
            });
        }

        // tesseract terminates each page with a form feed.
        let text = String::from_utf8_lossy(&output.stdout)
            .trim_end_matches('\u{c}')
            .to_string();
        debug!("OCR page {} → {} chars", page, text.len());
        Ok(text)
    }
}
