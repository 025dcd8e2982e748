//! # doc-ocr
//!
//! Batch OCR of images and PDFs through a remote layout-parsing service.
//!
//! ## Why this crate?
//!
//! The recognition service accepts one file per request and answers slowly
//! on long PDFs. This crate takes a list of stored documents, fetches them,
//! optionally splits each PDF into fixed-size page ranges, fans the pieces
//! out to the service under bounded concurrency and stitches every answer
//! back into one Markdown string in submission order. A failed document or
//! slice is reported inline and never sinks the rest of the batch.
//!
//! ## Pipeline Overview
//!
//! ```text
//! DocumentReference × n
//!  │
//!  ├─ 1. Type      extension → image | pdf (else placeholder)
//!  ├─ 2. Fetch     GET {base_url}{location}, 3 attempts, 1 s apart
//!  ├─ 3. Segment   PDF → page-range slices (lopdf, spawn_blocking)
//!  ├─ 4. Recognise POST {file: base64, fileType} per unit, ≤ 3 slices at once
//!  ├─ 5. Normalise deterministic Markdown cleanup per document
//!  └─ 6. Assemble  ordered join, ≤ 4 documents at once → one OcrArtifact
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use doc_ocr::{convert, DocumentReference, OcrConfig, OcrRequest, OutputFormat};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = OcrConfig::builder()
//!         .ocr_url("http://ocr:8080/layout-parsing")
//!         .base_url("http://nginx:80")
//!         .build()?;
//!
//!     let request = OcrRequest::new(vec![
//!         DocumentReference::new("/files/scan.png"),
//!         DocumentReference::new("/files/contract.pdf"),
//!     ])
//!     .segmentation(Some(10))
//!     .output_format(OutputFormat::Text);
//!
//!     let artifact = convert(&request, &config).await?;
//!     println!("{}", artifact.text());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `doc-ocr` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! doc-ocr = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod document;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{OcrConfig, OcrConfigBuilder, DEFAULT_BASE_URL};
pub use convert::{convert, convert_batch, convert_sync, save_artifact};
pub use document::{DocumentReference, DocumentType, DocumentUnit, OcrRequest, OutputFormat};
pub use error::{OcrError, UnitError};
pub use output::OcrArtifact;
pub use pipeline::fetch::{DocumentSource, HttpFetcher};
pub use pipeline::recognize::{HttpRecognizer, Recognizer};
pub use progress::{ConversionProgressCallback, NoopProgressCallback, ProgressCallback};
