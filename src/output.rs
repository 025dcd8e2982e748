//! Output-side data model: ordered assembly and the emitted artifact.

use crate::document::OutputFormat;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Fixed filename of the file artifact.
pub const ARTIFACT_FILENAME: &str = "ocr_result.md";

/// Content type declared for the file artifact.
pub const ARTIFACT_CONTENT_TYPE: &str = "text/plain";

/// Blank-line separator appended after every assembled entry.
pub const ENTRY_SEPARATOR: &str = "\n\n";

/// The single value produced by one invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OcrArtifact {
    /// Inline payload; serialises as `{"result": "..."}`.
    Text { result: String },
    /// Binary attachment with a fixed name and content type.
    File {
        filename: String,
        content_type: String,
        data: Vec<u8>,
    },
}

impl OcrArtifact {
    /// Wrap the batch result according to the output selector.
    ///
    /// Both variants carry the same trimmed text, so a `File` artifact's bytes
    /// are exactly the UTF-8 encoding of the `Text` payload.
    pub fn from_batch_result(text: String, format: OutputFormat) -> Self {
        match format {
            OutputFormat::Text => OcrArtifact::Text { result: text },
            OutputFormat::File => OcrArtifact::File {
                filename: ARTIFACT_FILENAME.to_string(),
                content_type: ARTIFACT_CONTENT_TYPE.to_string(),
                data: text.into_bytes(),
            },
        }
    }

    /// Text view of the artifact, whichever variant it is.
    pub fn text(&self) -> std::borrow::Cow<'_, str> {
        match self {
            OcrArtifact::Text { result } => std::borrow::Cow::Borrowed(result),
            OcrArtifact::File { data, .. } => String::from_utf8_lossy(data),
        }
    }
}

/// Concatenate entries in ascending ordinal order, each followed by a blank
/// line, without trimming.
pub fn join_ordered(entries: &BTreeMap<usize, String>) -> String {
    let capacity = entries
        .values()
        .map(|e| e.len() + ENTRY_SEPARATOR.len())
        .sum();
    let mut out = String::with_capacity(capacity);
    for entry in entries.values() {
        out.push_str(entry);
        out.push_str(ENTRY_SEPARATOR);
    }
    out
}
