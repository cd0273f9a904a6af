//! Report generation: one form submission from upload to persisted answer.
//!
//! This module is HTTP-agnostic; [`crate::handlers`] only parses the
//! multipart body into a [`SubmissionForm`] and renders what comes back.
//!
//! ## Stages
//!
//! ```text
//! AwaitingForm → FilesValidated → FilesStored → TextExtracted
//!   → PromptBuilt → CompletionReceived → OutputPersisted → Responded
//! ```
//!
//! The first failing stage ends the request. Validation failures happen
//! before anything is written; an extraction failure stops the request before
//! the prompt is built, so the model is never asked to compare an empty
//! document.

use crate::error::{AppError, ExtractionError, FormError};
use crate::pipeline::extract::{extract_document, TextExtractor};
use crate::pipeline::llm::{ApiKey, CompletionClient};
use crate::pipeline::store::UploadStore;
use crate::pipeline::validate::{allowed_file, secure_filename, DocumentKind, DocumentRole};
use crate::prompts::build_prompt;
use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Where a request is in its lifecycle. Used in log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    AwaitingForm,
    FilesValidated,
    FilesStored,
    TextExtracted,
    PromptBuilt,
    CompletionReceived,
    OutputPersisted,
    Responded,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::AwaitingForm => "awaiting_form",
            Stage::FilesValidated => "files_validated",
            Stage::FilesStored => "files_stored",
            Stage::TextExtracted => "text_extracted",
            Stage::PromptBuilt => "prompt_built",
            Stage::CompletionReceived => "completion_received",
            Stage::OutputPersisted => "output_persisted",
            Stage::Responded => "responded",
        })
    }
}

/// A file part exactly as received.
#[derive(Debug, Clone)]
pub struct UploadedDocument {
    pub filename: String,
    pub content: Vec<u8>,
}

/// The raw form, before validation. Every field may be missing.
#[derive(Debug, Default)]
pub struct SubmissionForm {
    pub api_key: Option<String>,
    pub requirement: Option<UploadedDocument>,
    pub standard: Option<UploadedDocument>,
    pub output_format: Option<UploadedDocument>,
}

impl SubmissionForm {
    pub fn set_document(&mut self, role: DocumentRole, document: UploadedDocument) {
        let slot = match role {
            DocumentRole::Requirement => &mut self.requirement,
            DocumentRole::Standard => &mut self.standard,
            DocumentRole::OutputFormat => &mut self.output_format,
        };
        *slot = Some(document);
    }

    /// Check the form in the order the user sees the fields.
    ///
    /// A file part submitted with an empty filename (the browser's "no file
    /// chosen") counts as missing.
    pub fn validate(self) -> Result<ValidatedSubmission, FormError> {
        let api_key = self
            .api_key
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .ok_or(FormError::MissingApiKey)?;

        let present = |d: Option<UploadedDocument>| d.filter(|d| !d.filename.is_empty());
        let (Some(requirement), Some(standard), Some(output_format)) = (
            present(self.requirement),
            present(self.standard),
            present(self.output_format),
        ) else {
            return Err(FormError::MissingFiles);
        };

        Ok(ValidatedSubmission {
            api_key: ApiKey::new(api_key),
            requirement: ValidDocument::check(DocumentRole::Requirement, requirement)?,
            standard: ValidDocument::check(DocumentRole::Standard, standard)?,
            output_format: ValidDocument::check(DocumentRole::OutputFormat, output_format)?,
        })
    }
}

/// A document whose extension has been accepted.
#[derive(Debug, Clone)]
pub struct ValidDocument {
    pub role: DocumentRole,
    pub kind: DocumentKind,
    pub filename: String,
    pub content: Vec<u8>,
}

impl ValidDocument {
    fn check(role: DocumentRole, doc: UploadedDocument) -> Result<Self, FormError> {
        let kind = DocumentKind::from_filename(&doc.filename)
            .filter(|_| allowed_file(&doc.filename))
            .ok_or_else(|| FormError::DisallowedExtension {
                role,
                filename: doc.filename.clone(),
            })?;
        Ok(Self {
            role,
            kind,
            filename: doc.filename,
            content: doc.content,
        })
    }
}

/// A form that passed validation.
#[derive(Debug)]
pub struct ValidatedSubmission {
    pub api_key: ApiKey,
    pub requirement: ValidDocument,
    pub standard: ValidDocument,
    pub output_format: ValidDocument,
}

impl ValidatedSubmission {
    pub fn documents(&self) -> [&ValidDocument; 3] {
        [&self.requirement, &self.standard, &self.output_format]
    }
}

/// Timing and size figures for one report.
#[derive(Debug, Clone, Default)]
pub struct ReportStats {
    pub prompt_chars: usize,
    pub extract_duration_ms: u64,
    pub llm_duration_ms: u64,
    pub total_duration_ms: u64,
}

/// The persisted answer.
#[derive(Debug, Clone)]
pub struct Report {
    pub text: String,
    pub output_path: PathBuf,
    pub stats: ReportStats,
}

/// Everything a request needs, passed in explicitly.
pub struct ReportPipeline {
    pub store: UploadStore,
    pub extractor: Arc<dyn TextExtractor>,
    pub client: Arc<dyn CompletionClient>,
    pub max_document_chars: usize,
}

impl ReportPipeline {
    pub fn new(
        store: UploadStore,
        extractor: Arc<dyn TextExtractor>,
        client: Arc<dyn CompletionClient>,
        max_document_chars: usize,
    ) -> Self {
        Self {
            store,
            extractor,
            client,
            max_document_chars,
        }
    }

    /// Run one submission through every stage.
    ///
    /// # Errors
    /// - [`AppError::Form`] before anything touches the disk
    /// - [`AppError::Storage`] if an upload or the output cannot be written
    /// - [`AppError::Extraction`] naming the first document that yielded no text
    /// - [`AppError::Completion`] if the API call fails
    pub async fn run(&self, form: SubmissionForm) -> Result<Report, AppError> {
        let total_start = Instant::now();

        let submission = form.validate()?;
        debug!("stage={}", Stage::FilesValidated);

        // ── Store uploads ────────────────────────────────────────────────
        let mut used = HashSet::new();
        let mut paths = Vec::with_capacity(3);
        for doc in submission.documents() {
            let name = self.storage_name(doc, &mut used);
            paths.push(self.store.save_upload(&name, &doc.content).await?);
        }
        info!(
            "stage={}: {} uploads in {}",
            Stage::FilesStored,
            paths.len(),
            self.store.dir().display()
        );

        // ── Extract text ─────────────────────────────────────────────────
        let extract_start = Instant::now();
        let mut texts = Vec::with_capacity(3);
        for (doc, path) in submission.documents().into_iter().zip(&paths) {
            let text = match extract_document(Arc::clone(&self.extractor), path, doc.kind).await {
                // A blank format file means "no particular format".
                Err(ExtractionError::NoText) if doc.role == DocumentRole::OutputFormat => {
                    String::new()
                }
                other => other.map_err(|source| AppError::Extraction {
                    role: doc.role,
                    filename: doc.filename.clone(),
                    source,
                })?,
            };
            texts.push(text);
        }
        let extract_duration_ms = extract_start.elapsed().as_millis() as u64;
        info!(
            "stage={}: requirement={} chars, standard={} chars in {}ms",
            Stage::TextExtracted,
            texts[0].len(),
            texts[1].len(),
            extract_duration_ms
        );

        // ── Assemble prompt ──────────────────────────────────────────────
        let prompt = build_prompt(&texts[0], &texts[1], texts[2].trim(), self.max_document_chars);
        debug!("stage={}: {} chars", Stage::PromptBuilt, prompt.char_len());

        // ── Completion ───────────────────────────────────────────────────
        let llm_start = Instant::now();
        let text = self
            .client
            .complete(&submission.api_key, &prompt)
            .await?;
        let llm_duration_ms = llm_start.elapsed().as_millis() as u64;
        debug!("stage={}", Stage::CompletionReceived);

        // ── Persist ──────────────────────────────────────────────────────
        let output_path = self.store.write_output(&text).await?;

        let stats = ReportStats {
            prompt_chars: prompt.char_len(),
            extract_duration_ms,
            llm_duration_ms,
            total_duration_ms: total_start.elapsed().as_millis() as u64,
        };
        info!(
            "stage={}: {} chars → {} ({}ms total)",
            Stage::OutputPersisted,
            text.len(),
            output_path.display(),
            stats.total_duration_ms
        );

        Ok(Report {
            text,
            output_path,
            stats,
        })
    }

    /// Sanitized on-disk name for `doc`, unique within this request and never
    /// equal to the output file name.
    fn storage_name(&self, doc: &ValidDocument, used: &mut HashSet<String>) -> String {
        let mut base = secure_filename(&doc.filename);
        if DocumentKind::from_filename(&base) != Some(doc.kind) {
            base = format!("{}.{}", doc.role.field_name(), doc.kind.extension());
        }

        let taken = |name: &str| used.contains(name) || name == self.store.output_file_name();
        let mut name = base.clone();
        if taken(&name) {
            name = format!("{}-{}", doc.role.field_name(), base);
        }
        let mut n = 2;
        while taken(&name) {
            name = format!("{}-{}-{}", doc.role.field_name(), n, base);
            n += 1;
        }

        used.insert(name.clone());
        name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CompletionError;
    use crate::prompts::Prompt;
    use async_trait::async_trait;
    use std::path::Path;
    use std::sync::Mutex;

    fn doc(name: &str, content: &str) -> Option<UploadedDocument> {
        Some(UploadedDocument {
            filename: name.to_string(),
            content: content.as_bytes().to_vec(),
        })
    }

    fn full_form() -> SubmissionForm {
        SubmissionForm {
            api_key: Some("sk-test".into()),
            requirement: doc("req.pdf", "Valve A: 150 PSI"),
            standard: doc("std.pdf", "Valve A: 200 PSI max"),
            output_format: doc("format.txt", "Deviation: <text>\n"),
        }
    }

    /// Treats the stored bytes as the OCR result.
    struct EchoExtractor;

    impl TextExtractor for EchoExtractor {
        fn extract_pdf(&self, pdf_path: &Path) -> Result<String, ExtractionError> {
            std::fs::read_to_string(pdf_path).map_err(|e| ExtractionError::Io(e.to_string()))
        }
    }

    #[derive(Default)]
    struct RecordingClient {
        prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl CompletionClient for RecordingClient {
        async fn complete(&self, _key: &ApiKey, prompt: &Prompt) -> Result<String, CompletionError> {
            self.prompts.lock().unwrap().push(prompt.as_str().to_string());
            Ok("Deviation: pressure exceeds standard".into())
        }
    }

    fn pipeline(dir: &Path, client: Arc<RecordingClient>) -> ReportPipeline {
        ReportPipeline::new(
            UploadStore::new(dir, "output.txt"),
            Arc::new(EchoExtractor),
            client,
            10_000,
        )
    }

    #[test]
    fn missing_api_key_is_checked_first() {
        let mut form = full_form();
        form.api_key = Some("   ".into());
        form.standard = None;
        assert_eq!(form.validate().unwrap_err(), FormError::MissingApiKey);
    }

    #[test]
    fn absent_api_key_is_rejected() {
        let mut form = full_form();
        form.api_key = None;
        assert_eq!(form.validate().unwrap_err(), FormError::MissingApiKey);
    }

    #[test]
    fn empty_filename_counts_as_missing() {
        let mut form = full_form();
        form.output_format = doc("", "");
        assert_eq!(form.validate().unwrap_err(), FormError::MissingFiles);
    }

    #[test]
    fn disallowed_extension_names_role() {
        let mut form = full_form();
        form.standard = doc("std.docx", "x");
        match form.validate().unwrap_err() {
            FormError::DisallowedExtension { role, filename } => {
                assert_eq!(role, DocumentRole::Standard);
                assert_eq!(filename, "std.docx");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn end_to_end_persists_completion() {
        let dir = tempfile::tempdir().unwrap();
        let client = Arc::new(RecordingClient::default());
        let report = pipeline(dir.path(), Arc::clone(&client)).run(full_form()).await.unwrap();

        let prompts = client.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("Valve A: 150 PSI"));
        assert!(prompts[0].contains("Valve A: 200 PSI max"));
        assert!(prompts[0].contains("Deviation: <text>"));

        assert_eq!(report.text, "Deviation: pressure exceeds standard");
        assert_eq!(std::fs::read_to_string(&report.output_path).unwrap(), report.text);
        assert!(dir.path().join("req.pdf").exists());
        assert!(dir.path().join("format.txt").exists());
    }

    #[tokio::test]
    async fn colliding_names_do_not_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let client = Arc::new(RecordingClient::default());
        let mut form = full_form();
        form.requirement = doc("spec.pdf", "REQ TEXT");
        form.standard = doc("spec.pdf", "STD TEXT");

        pipeline(dir.path(), Arc::clone(&client)).run(form).await.unwrap();

        assert_eq!(std::fs::read_to_string(dir.path().join("spec.pdf")).unwrap(), "REQ TEXT");
        assert_eq!(
            std::fs::read_to_string(dir.path().join("std_file-spec.pdf")).unwrap(),
            "STD TEXT"
        );
        let prompt = &client.prompts.lock().unwrap()[0];
        assert!(prompt.contains("REQ TEXT") && prompt.contains("STD TEXT"));
    }

    #[tokio::test]
    async fn upload_named_like_output_is_renamed() {
        let dir = tempfile::tempdir().unwrap();
        let client = Arc::new(RecordingClient::default());
        let mut form = full_form();
        form.output_format = doc("output.txt", "Deviation: <text>");

        pipeline(dir.path(), Arc::clone(&client)).run(form).await.unwrap();
        assert!(dir.path().join("result_format_file-output.txt").exists());
    }

    #[tokio::test]
    async fn renamed_upload_does_not_take_an_existing_name() {
        let dir = tempfile::tempdir().unwrap();
        let client = Arc::new(RecordingClient::default());
        let mut form = full_form();
        form.requirement = doc("a.pdf", "REQ TEXT");
        form.standard = doc("result_format_file-a.pdf", "STD TEXT");
        form.output_format = doc("a.pdf", "FORMAT TEXT");

        pipeline(dir.path(), Arc::clone(&client)).run(form).await.unwrap();

        let read = |name: &str| std::fs::read_to_string(dir.path().join(name)).unwrap();
        assert_eq!(read("a.pdf"), "REQ TEXT");
        assert_eq!(read("result_format_file-a.pdf"), "STD TEXT");
        assert_eq!(read("result_format_file-2-a.pdf"), "FORMAT TEXT");

        let prompt = &client.prompts.lock().unwrap()[0];
        assert!(prompt.contains("STD TEXT"));
        assert!(prompt.contains("FORMAT TEXT"));
    }

    #[tokio::test]
    async fn blank_format_file_is_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let client = Arc::new(RecordingClient::default());
        let mut form = full_form();
        form.output_format = doc("format.txt", "  \n");

        let report = pipeline(dir.path(), Arc::clone(&client)).run(form).await.unwrap();

        assert_eq!(report.text, "Deviation: pressure exceeds standard");
        let prompt = &client.prompts.lock().unwrap()[0];
        assert!(prompt.contains("Valve A: 150 PSI"));
        assert!(prompt.contains("Valve A: 200 PSI max"));
    }

    #[tokio::test]
    async fn failed_extraction_skips_completion() {
        let dir = tempfile::tempdir().unwrap();
        let client = Arc::new(RecordingClient::default());
        let mut form = full_form();
        form.standard = doc("std.pdf", "   \n");

        let err = pipeline(dir.path(), Arc::clone(&client)).run(form).await.unwrap_err();
        match err {
            AppError::Extraction { role, source, .. } => {
                assert_eq!(role, DocumentRole::Standard);
                assert_eq!(source, ExtractionError::NoText);
            }
            other => panic!("unexpected: {other:?}"),
        }
        assert!(client.prompts.lock().unwrap().is_empty());
        assert!(!dir.path().join("output.txt").exists());
    }

    #[tokio::test]
    async fn invalid_form_touches_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store_dir = dir.path().join("uploads");
        let client = Arc::new(RecordingClient::default());
        let mut form = full_form();
        form.requirement = doc("req.docx", "x");

        let err = pipeline(&store_dir, Arc::clone(&client)).run(form).await.unwrap_err();
        assert!(matches!(err, AppError::Form(FormError::DisallowedExtension { .. })));
        assert!(!store_dir.exists());
        assert!(client.prompts.lock().unwrap().is_empty());
    }
}
