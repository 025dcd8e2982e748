//! Error types for the doc-ocr library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`OcrError`] — **Fatal**: the invocation cannot proceed at all (no
//!   documents, a document without a location, missing OCR endpoint).
//!   Returned as `Err(OcrError)` from [`crate::convert::convert`] before any
//!   network call is made.
//!
//! * [`UnitError`] — **Non-fatal**: one document or one PDF slice failed
//!   (unsupported extension, storage unreachable, corrupt PDF, OCR service
//!   error). Coordinators turn it into a placeholder line in the final text,
//!   so sibling documents and slices are never affected.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the doc-ocr library.
///
/// Unit-level failures use [`UnitError`] and end up inline in the output
/// rather than propagated here.
#[derive(Debug, Error)]
pub enum OcrError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// The request itself is unusable (empty document list, missing location).
    #[error("{0}")]
    Validation(String),

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed or a required endpoint is missing.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output artifact.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single document or PDF slice.
///
/// The `Display` text is embedded verbatim in the placeholder that replaces
/// the failed unit's output, so it is written for a human reader.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum UnitError {
    /// The reference's extension is not one of the supported kinds.
    #[error("Unsupported file type: {extension}")]
    UnsupportedType { extension: String },

    /// Storage never answered with a success status.
    #[error("Failed to fetch file from URL after {attempts} attempts: {url} ({reason})")]
    Fetch {
        url: String,
        attempts: u32,
        reason: String,
    },

    /// Storage answered with an empty body for an image.
    #[error("Failed to retrieve image from the provided URL: {url}")]
    EmptyDocument { url: String },

    /// The bytes could not be parsed as a page-addressable PDF.
    #[error("Malformed PDF document: {detail}")]
    MalformedDocument { detail: String },

    /// The OCR service answered with a non-success status or was unreachable.
    #[error("Failed to process OCR: {}", format_service_error(.status, .body))]
    RecognitionService { status: Option<u16>, body: String },

    /// The OCR service answered, but not with the expected structure.
    #[error("{detail}")]
    RecognitionResponse { detail: String },
}

fn format_service_error(status: &Option<u16>, body: &str) -> String {
    match status {
        Some(code) => format!("HTTP {code}: {body}"),
        None => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_display_is_bare_message() {
        let e = OcrError::Validation("No files provided for OCR processing.".into());
        assert_eq!(e.to_string(), "No files provided for OCR processing.");
    }

    #[test]
    fn fetch_display_mentions_url_and_attempts() {
        let e = UnitError::Fetch {
            url: "http://nginx:80/files/a.pdf".into(),
            attempts: 3,
            reason: "HTTP 404 Not Found".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("after 3 attempts"), "got: {msg}");
        assert!(msg.contains("http://nginx:80/files/a.pdf"), "got: {msg}");
    }

    #[test]
    fn recognition_service_display_includes_body() {
        let e = UnitError::RecognitionService {
            status: Some(500),
            body: "{\"errorMsg\":\"boom\"}".into(),
        };
        let msg = e.to_string();
        assert!(msg.starts_with("Failed to process OCR: HTTP 500"), "got: {msg}");
        assert!(msg.contains("boom"));
    }

    #[test]
    fn recognition_service_display_without_status() {
        let e = UnitError::RecognitionService {
            status: None,
            body: "connection refused".into(),
        };
        assert_eq!(e.to_string(), "Failed to process OCR: connection refused");
    }

    #[test]
    fn unsupported_type_display() {
        let e = UnitError::UnsupportedType {
            extension: ".docx".into(),
        };
        assert_eq!(e.to_string(), "Unsupported file type: .docx");
    }
}
