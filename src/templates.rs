//! Askama templates for the three pages the service renders.
//!
//! Template sources live in `templates/` at the crate root; values are HTML
//! escaped by askama, which matters for `api_output` since it is model text.

use crate::report::ReportStats;
use askama::Template;

/// Upload form, optionally with an error banner.
#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate<'a> {
    pub error: Option<&'a str>,
    pub max_upload_mb: usize,
}

/// Completion text plus a download link.
#[derive(Template)]
#[template(path = "result.html")]
pub struct ResultTemplate<'a> {
    pub api_output: &'a str,
    pub stats: &'a ReportStats,
}

/// Generic failure page for errors that are not shown on the form.
#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate<'a> {
    pub status: u16,
    pub message: &'a str,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_shows_error_banner() {
        let html = IndexTemplate {
            error: Some("API Key is required"),
            max_upload_mb: 32,
        }
        .render()
        .unwrap();
        assert!(html.contains("API Key is required"));
        assert!(html.contains(r#"name="requirement_file""#));
        assert!(html.contains(r#"name="std_file""#));
        assert!(html.contains(r#"name="result_format_file""#));
    }

    #[test]
    fn index_without_error_has_no_banner() {
        let html = IndexTemplate {
            error: None,
            max_upload_mb: 32,
        }
        .render()
        .unwrap();
        assert!(!html.contains(r#"class="error""#));
    }

    #[test]
    fn result_escapes_model_output() {
        let stats = ReportStats::default();
        let html = ResultTemplate {
            api_output: "<script>alert(1)</script>",
            stats: &stats,
        }
        .render()
        .unwrap();
        assert!(!html.contains("<script>alert(1)</script>"));
        assert!(html.contains("&lt;script&gt;"));
        assert!(html.contains(r#"href="/download""#));
    }
}
