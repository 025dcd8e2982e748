//! Progress-callback trait for per-document batch events.
//!
//! Inject an [`Arc<dyn ConversionProgressCallback>`] via
//! [`crate::config::OcrConfigBuilder::progress_callback`] to receive events
//! as the batch coordinator works through each document.
//!
//! # Example
//!
//! ```rust
//! use doc_ocr::{ConversionProgressCallback, OcrConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     completed: Arc<AtomicUsize>,
//! }
//!
//! impl ConversionProgressCallback for CountingCallback {
//!     fn on_document_complete(&self, index: usize, total: usize, text_len: usize) {
//!         self.completed.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("Document {}/{} done ({} bytes)", index + 1, total, text_len);
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback {
//!     completed: Arc::new(AtomicUsize::new(0)),
//! });
//!
//! let config = OcrConfig::builder()
//!     .progress_callback(counter as Arc<dyn ConversionProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the batch coordinator as it processes each document.
///
/// Documents run concurrently, so `on_document_*` may be called from several
/// futures in any order. Implementations must protect shared mutable state
/// (e.g. `Mutex`, `AtomicUsize`). All methods default to no-ops.
///
/// Indices are zero-based ordinal positions in the submitted batch, the same
/// numbers used in "Error processing file N" placeholders.
pub trait ConversionProgressCallback: Send + Sync {
    /// Called once before any document is fetched.
    fn on_batch_start(&self, total_documents: usize) {
        let _ = total_documents;
    }

    /// Called when a document is dispatched to a worker.
    fn on_document_start(&self, index: usize, total_documents: usize) {
        let _ = (index, total_documents);
    }

    /// Called when a document produced text.
    ///
    /// # Arguments
    /// * `text_len` — byte length of the document's text (slice placeholders included)
    fn on_document_complete(&self, index: usize, total_documents: usize, text_len: usize) {
        let _ = (index, total_documents, text_len);
    }

    /// Called when a document was replaced by a placeholder.
    fn on_document_error(&self, index: usize, total_documents: usize, error: &str) {
        let _ = (index, total_documents, error);
    }

    /// Called once after every document has been attempted.
    fn on_batch_complete(&self, total_documents: usize, success_count: usize) {
        let _ = (total_documents, success_count);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ConversionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::OcrConfig`].
pub type ProgressCallback = Arc<dyn ConversionProgressCallback>;
