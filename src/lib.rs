//! # spec-deviation
//!
//! A small web service that compares a customer's requirement specification
//! with an in-house standard. The user uploads both documents plus a file
//! describing the desired report format; the service OCRs the documents, asks
//! a chat-completion model for a deviation report in that format, shows the
//! answer and keeps it on disk for download.
//!
//! ## Pipeline Overview
//!
//! ```text
//! multipart form
//!  │
//!  ├─ 1. Validate  API key present, three files, extensions pdf/txt
//!  ├─ 2. Store     sanitized names under the storage directory
//!  ├─ 3. Extract   pdfium rasterisation + tesseract OCR (spawn_blocking)
//!  ├─ 4. Prompt    fixed comparison instruction, per-document size cap
//!  ├─ 5. Complete  one chat-completion call with the user's key
//!  └─ 6. Persist   overwrite the single output file, render the result
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use spec_deviation::{serve, AppState, ServiceConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServiceConfig::builder().storage_dir("uploads").build()?;
//!     let state = AppState::from_config(config)?;
//!     serve("127.0.0.1:5000".parse()?, state).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## System requirements
//!
//! OCR needs a pdfium shared library (system-wide, or pointed to with
//! `PDFIUM_LIB_PATH`) and the `tesseract` executable on `PATH`. Text uploads
//! work without either.
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `spec-deviation` binary (clap + anyhow + tracing-subscriber) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod handlers;
pub mod pipeline;
pub mod prompts;
pub mod report;
pub mod server;
pub mod templates;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ServiceConfig, ServiceConfigBuilder};
pub use error::{AppError, CompletionError, ExtractionError, FormError};
pub use pipeline::extract::{OcrTextExtractor, TextExtractor};
pub use pipeline::llm::{ApiKey, CompletionClient, OpenAiChatClient};
pub use pipeline::validate::{allowed_file, DocumentRole};
pub use prompts::{build_prompt, Prompt};
pub use report::{Report, ReportPipeline, SubmissionForm, UploadedDocument};
pub use server::{router, serve, AppState};
