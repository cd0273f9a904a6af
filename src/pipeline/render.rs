//! PDF rasterisation: render every page to a `DynamicImage` via pdfium.
//!
//! Everything here is blocking. pdfium keeps thread-local state and must not
//! be driven from an async worker thread, so callers run these functions
//! inside `tokio::task::spawn_blocking` (see [`super::extract`]).
//!
//! Pages are handed to a callback one at a time rather than collected, so a
//! long scanned document never holds more than one page bitmap in memory.

use crate::config::ServiceConfig;
use crate::error::ExtractionError;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Rendering knobs copied out of [`ServiceConfig`].
#[derive(Debug, Clone)]
pub struct RenderSettings {
    pub dpi: u32,
    pub max_rendered_pixels: u32,
    pub pdfium_lib_path: Option<PathBuf>,
}

impl RenderSettings {
    pub fn from_config(config: &ServiceConfig) -> Self {
        Self {
            dpi: config.dpi,
            max_rendered_pixels: config.max_rendered_pixels,
            pdfium_lib_path: config.pdfium_lib_path.clone(),
        }
    }

    fn render_config(&self) -> PdfRenderConfig {
        let px = self.max_rendered_pixels as i32;
        PdfRenderConfig::new()
            .scale_page_by_factor(self.dpi as f32 / 72.0)
            .set_maximum_width(px)
            .set_maximum_height(px)
    }
}

/// Bind to pdfium, preferring an explicit library path over the system one.
pub fn bind_pdfium(lib_path: Option<&Path>) -> Result<Pdfium, ExtractionError> {
    let bindings = match lib_path {
        Some(path) => Pdfium::bind_to_library(path),
        None => Pdfium::bind_to_system_library(),
    }
    .map_err(|e| ExtractionError::PdfiumUnavailable(format!("{:?}", e)))?;

    Ok(Pdfium::new(bindings))
}

/// Render each page of `pdf_path` in order and pass it to `on_page`
/// together with its 1-based page number.
///
/// Stops at the first error, whether from pdfium or from the callback.
///
/// # Returns
/// The number of pages in the document.
pub fn render_each_page<F>(
    pdf_path: &Path,
    settings: &RenderSettings,
    mut on_page: F,
) -> Result<usize, ExtractionError>
where
    F: FnMut(usize, DynamicImage) -> Result<(), ExtractionError>,
{
    let pdfium = bind_pdfium(settings.pdfium_lib_path.as_deref())?;

    let document = pdfium
        .load_pdf_from_file(pdf_path, None)
        .map_err(|e| ExtractionError::CorruptPdf(format!("{:?}", e)))?;

    let pages = document.pages();
    let total_pages = pages.len() as usize;
    info!("PDF loaded: {} pages ({})", total_pages, pdf_path.display());

    let render_config = settings.render_config();

    for (idx, page) in pages.iter().enumerate() {
        let page_num = idx + 1;
        let bitmap = page.render_with_config(&render_config).map_err(|e| {
            ExtractionError::RenderFailed {
                page: page_num,
                detail: format!("{:?}", e),
            }
        })?;

        let image = bitmap.as_image();
        debug!(
            "Rendered page {} → {}x{} px",
            page_num,
            image.width(),
            image.height()
        );

        on_page(page_num, image)?;
    }

    Ok(total_pages)
}
