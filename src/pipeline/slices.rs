//! Slice coordination: recognise one PDF's slices concurrently, reassemble
//! them in page order.
//!
//! Slices are dispatched in page order but finish in whatever order the
//! service answers. Each outcome is keyed by its slice index, so the final
//! text is always in page order no matter which slice came back first.

use crate::document::DocumentUnit;
use crate::error::UnitError;
use crate::output::join_ordered;
use crate::pipeline::recognize::Recognizer;
use futures::stream::{self, StreamExt};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Recognise every slice of one PDF and join the results.
///
/// * One unit: the recognizer is called directly and its error, if any,
///   propagates to the document level.
/// * Several units: at most `min(cap, n)` are in flight. A failed slice is
///   replaced by `"Error processing PDF slice {index}: {error}"` and never
///   aborts its siblings. Entries are joined in index order with a blank
///   line after each, then trailing whitespace is trimmed.
///
/// # Errors
/// Only an empty `units` list, which no PDF can legitimately produce.
pub async fn recognize_slices(
    recognizer: &Arc<dyn Recognizer>,
    units: Vec<DocumentUnit>,
    concurrency_cap: usize,
) -> Result<String, UnitError> {
    match units.len() {
        0 => Err(UnitError::MalformedDocument {
            detail: "PDF produced no slices".into(),
        }),
        1 => recognizer.recognize(&units[0]).await,
        n => {
            let workers = concurrency_cap.max(1).min(n);
            debug!("Recognising {} slices with {} workers", n, workers);

            let results: BTreeMap<usize, String> =
                stream::iter(units.into_iter().enumerate().map(|(index, unit)| {
                    let recognizer = Arc::clone(recognizer);
                    async move {
                        let text = match recognizer.recognize(&unit).await {
                            Ok(text) => text,
                            Err(e) => {
                                warn!("PDF slice {}: {}", index, e);
                                slice_placeholder(index, &e)
                            }
                        };
                        (index, text)
                    }
                }))
                .buffer_unordered(workers)
                .collect()
                .await;

            Ok(join_ordered(&results).trim_end().to_string())
        }
    }
}

/// Placeholder text substituted for a failed slice.
pub fn slice_placeholder(index: usize, error: &UnitError) -> String {
    format!("Error processing PDF slice {index}: {error}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Answers with the unit's bytes as text; earlier slices sleep longer so
    /// they finish last. Bytes equal to "fail" produce an error.
    struct ScriptedRecognizer {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
        calls: AtomicUsize,
    }

    impl ScriptedRecognizer {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                in_flight: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl Recognizer for ScriptedRecognizer {
        async fn recognize(&self, unit: &DocumentUnit) -> Result<String, UnitError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);

            let text = String::from_utf8(unit.data.clone()).unwrap();
            let delay = text
                .trim_start_matches("slice-")
                .parse::<u64>()
                .map(|i| 40u64.saturating_sub(i * 10))
                .unwrap_or(5);
            tokio::time::sleep(Duration::from_millis(delay)).await;

            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            if text == "fail" {
                Err(UnitError::RecognitionResponse {
                    detail: "OCR response does not contain markdown text.".into(),
                })
            } else {
                Ok(text)
            }
        }
    }

    fn units(texts: &[&str]) -> Vec<DocumentUnit> {
        texts
            .iter()
            .map(|t| DocumentUnit::pdf(t.as_bytes().to_vec()))
            .collect()
    }

    #[tokio::test]
    async fn reassembles_in_page_order_despite_reverse_completion() {
        let rec = ScriptedRecognizer::new();
        let dyn_rec: Arc<dyn Recognizer> = rec.clone();
        let out = recognize_slices(&dyn_rec, units(&["slice-0", "slice-1", "slice-2", "slice-3"]), 3)
            .await
            .unwrap();
        assert_eq!(out, "slice-0\n\nslice-1\n\nslice-2\n\nslice-3");
        assert!(rec.peak.load(Ordering::SeqCst) <= 3);
        assert_eq!(rec.calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn failed_slice_becomes_placeholder_in_place() {
        let rec: Arc<dyn Recognizer> = ScriptedRecognizer::new();
        let out = recognize_slices(&rec, units(&["slice-0", "fail", "slice-2"]), 3)
            .await
            .unwrap();
        assert_eq!(
            out,
            "slice-0\n\n\
             Error processing PDF slice 1: OCR response does not contain markdown text.\n\n\
             slice-2"
        );
    }

    #[tokio::test]
    async fn single_slice_bypasses_pool_and_propagates_errors() {
        let rec: Arc<dyn Recognizer> = ScriptedRecognizer::new();
        let out = recognize_slices(&rec, units(&["  whole document  "]), 3)
            .await
            .unwrap();
        assert_eq!(out, "  whole document  ");

        let err = recognize_slices(&rec, units(&["fail"]), 3).await.unwrap_err();
        assert!(matches!(err, UnitError::RecognitionResponse { .. }));
    }

    #[tokio::test]
    async fn single_and_pooled_paths_yield_identical_text() {
        let rec: Arc<dyn Recognizer> = ScriptedRecognizer::new();
        let single = recognize_slices(&rec, units(&["slice-0"]), 3).await.unwrap();
        // The second slice recognises to nothing, so both paths carry the
        // same content.
        let pooled = recognize_slices(&rec, units(&["slice-0", ""]), 3)
            .await
            .unwrap();
        assert_eq!(pooled, single);
    }

    #[tokio::test]
    async fn cap_of_one_serialises() {
        let rec = ScriptedRecognizer::new();
        let dyn_rec: Arc<dyn Recognizer> = rec.clone();
        recognize_slices(&dyn_rec, units(&["slice-0", "slice-1", "slice-2"]), 1)
            .await
            .unwrap();
        assert_eq!(rec.peak.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn empty_input_is_an_error() {
        let rec: Arc<dyn Recognizer> = ScriptedRecognizer::new();
        let err = recognize_slices(&rec, Vec::new(), 3).await.unwrap_err();
        assert!(matches!(err, UnitError::MalformedDocument { .. }));
    }
}
