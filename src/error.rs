//! Error types for the spec-deviation service.
//!
//! Four error types reflect four distinct failure modes:
//!
//! * [`FormError`]: the submitted form is incomplete or carries a file type
//!   we do not accept. Always recoverable: the form is shown again with a
//!   friendly message and nothing has been written to disk.
//!
//! * [`ExtractionError`]: a single document could not be turned into text
//!   (corrupt PDF, pdfium or tesseract missing, blank scan). The extractor
//!   never lets a failure escape in any other shape.
//!
//! * [`CompletionError`]: the remote chat-completion call failed.
//!
//! * [`AppError`]: everything the request handler can end with. Each
//!   variant maps to one HTTP status via [`AppError::status_code`].

use crate::pipeline::validate::DocumentRole;
use crate::templates::ErrorTemplate;
use askama::Template;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use std::path::PathBuf;
use thiserror::Error;

/// All request-level errors returned by [`crate::report::ReportPipeline::run`]
/// and the HTTP handlers.
#[derive(Debug, Error)]
pub enum AppError {
    // ── Form errors ───────────────────────────────────────────────────────
    /// The form failed validation. Nothing was stored.
    #[error(transparent)]
    Form(#[from] FormError),

    /// The multipart body could not be parsed.
    #[error("Malformed upload: {0}")]
    Multipart(String),

    // ── Pipeline errors ───────────────────────────────────────────────────
    /// A document could not be converted into text.
    #[error("Could not extract text from the {role} '{filename}': {source}")]
    Extraction {
        role: DocumentRole,
        filename: String,
        #[source]
        source: ExtractionError,
    },

    /// The completion API call failed.
    #[error(transparent)]
    Completion(#[from] CompletionError),

    // ── Storage errors ────────────────────────────────────────────────────
    /// Could not write or read a file in the storage directory.
    #[error("Storage error on '{path}': {source}")]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// `/download` was requested before any report was generated.
    #[error("No report has been generated yet ('{path}' does not exist)")]
    OutputMissing { path: PathBuf },

    // ── Rendering / config ────────────────────────────────────────────────
    /// An HTML template failed to render.
    #[error("Template rendering failed: {0}")]
    Template(#[from] askama::Error),

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Form(_) | AppError::Multipart(_) => StatusCode::BAD_REQUEST,
            AppError::Extraction { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Completion(_) => StatusCode::BAD_GATEWAY,
            AppError::OutputMissing { .. } => StatusCode::NOT_FOUND,
            AppError::Storage { .. }
            | AppError::Template(_)
            | AppError::InvalidConfig(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show in the browser.
    ///
    /// Form and extraction errors are specific; everything else is opaque and
    /// the detail only goes to the log.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Form(e) => e.to_string(),
            AppError::Extraction { .. } => self.to_string(),
            AppError::Multipart(_) => "The upload could not be read. Please try again.".to_string(),
            AppError::Completion(_) => {
                "The report could not be generated: the completion service request failed."
                    .to_string()
            }
            AppError::OutputMissing { .. } => "No report has been generated yet.".to_string(),
            _ => "Internal server error".to_string(),
        }
    }

    /// Errors the handler answers by showing the form again.
    pub fn is_form_level(&self) -> bool {
        matches!(self, AppError::Form(_) | AppError::Extraction { .. })
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match &self {
            AppError::Storage { .. }
            | AppError::Template(_)
            | AppError::InvalidConfig(_)
            | AppError::Internal(_) => tracing::error!("Internal error: {}", self),
            AppError::Completion(_) => tracing::error!("Upstream error: {}", self),
            AppError::Extraction { .. } | AppError::Multipart(_) => {
                tracing::warn!("Request failed: {}", self)
            }
            AppError::Form(_) | AppError::OutputMissing { .. } => {
                tracing::info!("Request rejected: {}", self)
            }
        }

        let status = self.status_code();
        let message = self.user_message();
        let page = ErrorTemplate {
            status: status.as_u16(),
            message: &message,
        }
        .render();

        match page {
            Ok(html) => (status, Html(html)).into_response(),
            Err(_) => (status, message).into_response(),
        }
    }
}

/// Validation failures on the submitted form.
///
/// The display strings are shown to the user verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormError {
    #[error("API Key is required")]
    MissingApiKey,

    #[error("Please upload all files")]
    MissingFiles,

    /// At least one upload has an extension outside {pdf, txt}.
    #[error("Only PDF and text files are allowed")]
    DisallowedExtension { role: DocumentRole, filename: String },
}

/// Why a single document produced no usable text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractionError {
    /// No pdfium library could be bound.
    #[error("PDF engine unavailable: {0}")]
    PdfiumUnavailable(String),

    /// pdfium refused to open the file.
    #[error("PDF could not be opened: {0}")]
    CorruptPdf(String),

    /// A page could not be rasterised.
    #[error("page {page} could not be rendered: {detail}")]
    RenderFailed { page: usize, detail: String },

    /// The tesseract binary could not be started.
    #[error("OCR engine '{binary}' could not be started: {detail}")]
    OcrUnavailable { binary: String, detail: String },

    /// tesseract ran but reported failure.
    #[error("OCR failed on page {page}: {detail}")]
    OcrFailed { page: usize, detail: String },

    /// Extraction succeeded but nothing but whitespace came out.
    #[error("no text was recognised")]
    NoText,

    #[error("I/O error: {0}")]
    Io(String),

    /// The blocking extraction task panicked or was cancelled.
    #[error("extraction task failed: {0}")]
    Internal(String),
}

/// Failures talking to the chat-completion endpoint.
#[derive(Debug, Error)]
pub enum CompletionError {
    /// Connection, TLS, timeout, or body read failure.
    #[error("completion request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The API answered with a non-success status.
    #[error("completion API returned {status}: {message}")]
    Status { status: u16, message: String },

    /// The body parsed, but carried no completion text.
    #[error("completion API returned an unusable response: {0}")]
    InvalidResponse(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn form_error_messages_are_user_facing() {
        assert_eq!(FormError::MissingApiKey.to_string(), "API Key is required");
        assert_eq!(FormError::MissingFiles.to_string(), "Please upload all files");
        let e = FormError::DisallowedExtension {
            role: DocumentRole::Standard,
            filename: "std.docx".into(),
        };
        assert_eq!(e.to_string(), "Only PDF and text files are allowed");
    }

    #[test]
    fn extraction_error_display_names_document() {
        let e = AppError::Extraction {
            role: DocumentRole::Requirement,
            filename: "req.pdf".into(),
            source: ExtractionError::NoText,
        };
        let msg = e.to_string();
        assert!(msg.contains("requirement document"), "got: {msg}");
        assert!(msg.contains("req.pdf"), "got: {msg}");
        assert!(msg.contains("no text"), "got: {msg}");
    }

    #[test]
    fn status_codes_per_variant() {
        assert_eq!(
            AppError::Form(FormError::MissingFiles).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::OutputMissing { path: "uploads/output.txt".into() }.status_code(),
            StatusCode::NOT_FOUND
        );
        let upstream = AppError::Completion(CompletionError::Status {
            status: 500,
            message: "boom".into(),
        });
        assert_eq!(upstream.status_code(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn upstream_detail_is_not_shown_to_user() {
        let e = AppError::Completion(CompletionError::Status {
            status: 401,
            message: "Incorrect API key provided: sk-abc".into(),
        });
        assert!(!e.user_message().contains("sk-abc"));
        assert!(!e.is_form_level());
    }

    #[test]
    fn status_error_display() {
        let e = CompletionError::Status {
            status: 401,
            message: "Incorrect API key provided".into(),
        };
        assert!(e.to_string().contains("401"));
        assert!(e.to_string().contains("Incorrect API key"));
    }
}
