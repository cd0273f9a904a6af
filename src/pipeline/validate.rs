//! Upload validation: which files we accept and how they are named on disk.
//!
//! Only the extension is checked. Content sniffing happens later, when pdfium
//! tries to open the file, and a bad file surfaces as an
//! [`crate::error::ExtractionError`] rather than a validation error.

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

/// Extensions accepted for any of the three uploads (compared lowercased).
pub const ALLOWED_EXTENSIONS: &[&str] = &["pdf", "txt"];

/// Return `true` if `filename` has an allowed extension.
///
/// The extension is everything after the **last** `.`, compared
/// case-insensitively. A name without a `.` is rejected.
///
/// ```
/// use spec_deviation::pipeline::validate::allowed_file;
///
/// assert!(allowed_file("spec.PDF"));
/// assert!(allowed_file("a.b.pdf"));
/// assert!(!allowed_file("archive.tar.gz"));
/// assert!(!allowed_file("noext"));
/// ```
pub fn allowed_file(filename: &str) -> bool {
    extension(filename).is_some_and(|ext| ALLOWED_EXTENSIONS.contains(&ext.as_str()))
}

/// Lowercased substring after the last `.`, if any.
fn extension(filename: &str) -> Option<String> {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
}

/// How a stored upload is turned into text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    /// Rasterise and OCR.
    Pdf,
    /// Read as UTF-8.
    Text,
}

impl DocumentKind {
    /// Classify an upload by extension. `None` for anything [`allowed_file`] rejects.
    pub fn from_filename(filename: &str) -> Option<Self> {
        match extension(filename)?.as_str() {
            "pdf" => Some(DocumentKind::Pdf),
            "txt" => Some(DocumentKind::Text),
            _ => None,
        }
    }

    /// Canonical extension used when a sanitized name comes out empty.
    pub fn extension(self) -> &'static str {
        match self {
            DocumentKind::Pdf => "pdf",
            DocumentKind::Text => "txt",
        }
    }
}

/// The three documents the form asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentRole {
    /// The customer's requirement specification.
    Requirement,
    /// The in-house standards specification.
    Standard,
    /// The desired shape of the report.
    OutputFormat,
}

impl DocumentRole {
    /// All roles, in the order the form lists them.
    pub const ALL: [DocumentRole; 3] = [
        DocumentRole::Requirement,
        DocumentRole::Standard,
        DocumentRole::OutputFormat,
    ];

    /// Name of the multipart field carrying this document.
    pub fn field_name(self) -> &'static str {
        match self {
            DocumentRole::Requirement => "requirement_file",
            DocumentRole::Standard => "std_file",
            DocumentRole::OutputFormat => "result_format_file",
        }
    }

    /// Inverse of [`DocumentRole::field_name`].
    pub fn from_field_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.field_name() == name)
    }
}

impl fmt::Display for DocumentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DocumentRole::Requirement => "requirement document",
            DocumentRole::Standard => "standards document",
            DocumentRole::OutputFormat => "output format file",
        })
    }
}

static UNSAFE_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9_.\-]").unwrap());

/// Make an untrusted upload name safe to use as a file name in the storage
/// directory.
///
/// Path separators become spaces, whitespace runs collapse to `_`, anything
/// outside `[A-Za-z0-9_.-]` is dropped (non-ASCII included), and leading or
/// trailing `.`/`_` are stripped. The result can be empty; callers must
/// handle that.
///
/// ```
/// use spec_deviation::pipeline::validate::secure_filename;
///
/// assert_eq!(secure_filename("My cool spec.pdf"), "My_cool_spec.pdf");
/// assert_eq!(secure_filename("../../etc/passwd"), "etc_passwd");
/// ```
pub fn secure_filename(name: &str) -> String {
    let unslashed = name.replace(['/', '\\'], " ");
    let joined = unslashed.split_whitespace().collect::<Vec<_>>().join("_");
    let cleaned = UNSAFE_CHARS.replace_all(&joined, "");
    cleaned.trim_matches(|c| c == '.' || c == '_').to_string()
}
