//! Batch conversion entry points.
//!
//! [`convert`] is the pipeline driver: it validates the request, resolves the
//! storage and recognition clients, runs [`convert_batch`] and wraps the
//! result in exactly one [`OcrArtifact`]. Nothing is emitted until every
//! document has finished.

use crate::config::OcrConfig;
use crate::document::{DocumentReference, DocumentType, DocumentUnit, OcrRequest};
use crate::error::{OcrError, UnitError};
use crate::output::{join_ordered, OcrArtifact};
use crate::pipeline::fetch::{DocumentSource, HttpFetcher};
use crate::pipeline::recognize::{HttpRecognizer, Recognizer};
use crate::pipeline::{postprocess, segment, slices};
use futures::stream::{self, StreamExt};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Filename used by [`save_artifact`] for inline text artifacts.
pub const TEXT_ARTIFACT_FILENAME: &str = "ocr_result.json";

/// Recognise a batch of documents and return one artifact.
///
/// This is the primary entry point for the library.
///
/// # Returns
/// `Ok(OcrArtifact)` whenever the request was valid, even if some or all
/// documents failed; failures appear inline as
/// `"Error processing file N: …"` entries.
///
/// # Errors
/// Returns `Err(OcrError)` only before any network call:
/// - no documents, or a document without a location
/// - no OCR endpoint configured and no recognizer injected
pub async fn convert(request: &OcrRequest, config: &OcrConfig) -> Result<OcrArtifact, OcrError> {
    validate_documents(&request.documents)?;

    let source = resolve_source(config)?;
    let recognizer = resolve_recognizer(config)?;

    let text = convert_batch(&source, &recognizer, request, config).await?;
    Ok(OcrArtifact::from_batch_result(text, request.output_format))
}

/// Synchronous wrapper around [`convert`].
///
/// Creates a temporary tokio runtime internally.
pub fn convert_sync(request: &OcrRequest, config: &OcrConfig) -> Result<OcrArtifact, OcrError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| OcrError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(convert(request, config))
}

/// Run every document of `request` through the pipeline and assemble the
/// batch result.
///
/// At most `min(config.document_concurrency, n)` documents are in flight.
/// Each document's outcome is keyed by its submission index; a failed
/// document becomes `"Error processing file {index}: {error}"`. Entries are
/// joined in index order with a blank line after each and the whole string
/// is trimmed.
pub async fn convert_batch(
    source: &Arc<dyn DocumentSource>,
    recognizer: &Arc<dyn Recognizer>,
    request: &OcrRequest,
    config: &OcrConfig,
) -> Result<String, OcrError> {
    let documents = &request.documents;
    if documents.is_empty() {
        return Err(no_documents());
    }

    let start = Instant::now();
    let total = documents.len();
    let workers = config.document_concurrency.max(1).min(total);
    info!(
        "Starting batch: {} documents, {} workers, segmentation {:?}",
        total, workers, request.segmentation
    );

    if let Some(ref cb) = config.progress_callback {
        cb.on_batch_start(total);
    }

    let outcomes: Vec<(usize, Result<String, UnitError>)> =
        stream::iter(documents.iter().enumerate().map(|(index, reference)| async move {
            if let Some(ref cb) = config.progress_callback {
                cb.on_document_start(index, total);
            }

            let outcome =
                process_document(source, recognizer, reference, request.segmentation, config)
                    .await;

            match &outcome {
                Ok(text) => {
                    debug!("File {} ({}): {} chars", index, reference.name, text.len());
                    if let Some(ref cb) = config.progress_callback {
                        cb.on_document_complete(index, total, text.len());
                    }
                }
                Err(e) => {
                    warn!("File {} ({}): {}", index, reference.name, e);
                    if let Some(ref cb) = config.progress_callback {
                        cb.on_document_error(index, total, &e.to_string());
                    }
                }
            }
            (index, outcome)
        }))
        .buffer_unordered(workers)
        .collect()
        .await;

    let succeeded = outcomes.iter().filter(|(_, r)| r.is_ok()).count();
    let entries: BTreeMap<usize, String> = outcomes
        .into_iter()
        .map(|(index, outcome)| {
            let text = outcome.unwrap_or_else(|e| file_placeholder(index, &e));
            (index, text)
        })
        .collect();

    if let Some(ref cb) = config.progress_callback {
        cb.on_batch_complete(total, succeeded);
    }

    info!(
        "Batch complete: {}/{} documents, {}ms",
        succeeded,
        total,
        start.elapsed().as_millis()
    );

    Ok(join_ordered(&entries).trim().to_string())
}

/// Placeholder text substituted for a failed document.
pub fn file_placeholder(index: usize, error: &UnitError) -> String {
    format!("Error processing file {index}: {error}")
}

/// Write an artifact into `dir` and return the written path.
///
/// A file artifact lands under its own filename; an inline artifact is
/// written as its JSON payload to [`TEXT_ARTIFACT_FILENAME`]. Uses atomic
/// write (temp file + rename) to prevent partial files.
pub async fn save_artifact(
    artifact: &OcrArtifact,
    dir: impl AsRef<Path>,
) -> Result<PathBuf, OcrError> {
    let dir = dir.as_ref();
    let (path, bytes) = match artifact {
        OcrArtifact::File { filename, data, .. } => (dir.join(filename), data.clone()),
        OcrArtifact::Text { .. } => {
            let json = serde_json::to_vec_pretty(artifact)
                .map_err(|e| OcrError::Internal(format!("serialise artifact: {e}")))?;
            (dir.join(TEXT_ARTIFACT_FILENAME), json)
        }
    };

    let write_failed = |source: std::io::Error| OcrError::OutputWriteFailed {
        path: path.clone(),
        source,
    };

    tokio::fs::create_dir_all(dir).await.map_err(write_failed)?;

    let tmp_path = path.with_extension("tmp");
    tokio::fs::write(&tmp_path, &bytes)
        .await
        .map_err(write_failed)?;
    tokio::fs::rename(&tmp_path, &path)
        .await
        .map_err(write_failed)?;

    debug!("Wrote {} ({} bytes)", path.display(), bytes.len());
    Ok(path)
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// Fetch, optionally segment, recognise and normalise one document.
async fn process_document(
    source: &Arc<dyn DocumentSource>,
    recognizer: &Arc<dyn Recognizer>,
    reference: &DocumentReference,
    segmentation: Option<usize>,
    config: &OcrConfig,
) -> Result<String, UnitError> {
    let kind = reference.document_type()?;
    let bytes = source.fetch(&reference.location).await?;

    let text = match kind {
        DocumentType::Image => {
            if bytes.is_empty() {
                return Err(UnitError::EmptyDocument {
                    url: source.address(&reference.location),
                });
            }
            recognizer.recognize(&DocumentUnit::image(bytes)).await?
        }
        DocumentType::Pdf => {
            let pieces = segment::segment_pdf(bytes, segmentation).await?;
            let units = pieces.into_iter().map(DocumentUnit::pdf).collect();
            slices::recognize_slices(recognizer, units, config.slice_concurrency).await?
        }
    };

    if config.normalize {
        Ok(postprocess::normalize_markdown(&text))
    } else {
        Ok(text)
    }
}

fn no_documents() -> OcrError {
    OcrError::Validation("No files provided for OCR processing.".into())
}

/// Reject requests that cannot start: no documents, or a document without
/// a location.
fn validate_documents(documents: &[DocumentReference]) -> Result<(), OcrError> {
    if documents.is_empty() {
        return Err(no_documents());
    }
    if let Some(index) = documents
        .iter()
        .position(|d| d.location.trim().is_empty())
    {
        return Err(OcrError::Validation(format!(
            "Input file {index} does not contain a valid URL."
        )));
    }
    Ok(())
}

/// Use the injected storage client, or build one from the config.
fn resolve_source(config: &OcrConfig) -> Result<Arc<dyn DocumentSource>, OcrError> {
    if let Some(ref source) = config.source {
        return Ok(Arc::clone(source));
    }
    Ok(Arc::new(HttpFetcher::new(config)?))
}

/// Use the injected recognition client, or build one from the config.
fn resolve_recognizer(config: &OcrConfig) -> Result<Arc<dyn Recognizer>, OcrError> {
    if let Some(ref recognizer) = config.recognizer {
        return Ok(Arc::clone(recognizer));
    }
    Ok(Arc::new(HttpRecognizer::new(config)?))
}
