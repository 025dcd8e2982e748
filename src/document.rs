//! Input-side data model: document references, units and request parameters.
//!
//! A [`DocumentReference`] is what the caller submits; a [`DocumentUnit`] is
//! what the recognition service receives. The two are kept apart because one
//! PDF reference can fan out into many units (one per page-range slice).

use crate::error::UnitError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Handle to one input document.
///
/// `location` is the storage path appended verbatim to the configured base
/// URL. `name` is the original filename and carries the extension that
/// decides how the document is processed; when it is empty the extension is
/// taken from `location` instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentReference {
    pub name: String,
    pub location: String,
}

impl DocumentReference {
    /// Reference whose filename is the last path segment of `location`.
    pub fn new(location: impl Into<String>) -> Self {
        let location = location.into();
        let name = location
            .rsplit('/')
            .next()
            .unwrap_or_default()
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .to_string();
        Self { name, location }
    }

    /// Reference with an explicit filename (e.g. an upload whose storage key
    /// has no extension).
    pub fn named(name: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            location: location.into(),
        }
    }

    /// Lower-cased extension including the leading dot, or `""` when none.
    pub fn extension(&self) -> String {
        let source = if self.name.is_empty() {
            self.location
                .split(['?', '#'])
                .next()
                .unwrap_or_default()
        } else {
            self.name.as_str()
        };
        let file = source.rsplit('/').next().unwrap_or_default();
        match file.rfind('.') {
            Some(dot) => file[dot..].to_lowercase(),
            None => String::new(),
        }
    }

    /// Resolve the processing kind from the extension.
    pub fn document_type(&self) -> Result<DocumentType, UnitError> {
        DocumentType::from_extension(&self.extension())
    }
}

/// Kind of payload sent to the recognition service.
///
/// Decided by extension only; content is never sniffed, so a mislabeled file
/// is sent with its extension's tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DocumentType {
    /// Single raster image (`.jpg`, `.jpeg`, `.png`, `.bmp`).
    Image,
    /// Multi-page PDF (`.pdf`).
    Pdf,
}

impl DocumentType {
    /// Map a dotted, case-insensitive extension to a document type.
    pub fn from_extension(extension: &str) -> Result<Self, UnitError> {
        match extension.to_lowercase().as_str() {
            ".pdf" => Ok(DocumentType::Pdf),
            ".jpg" | ".jpeg" | ".png" | ".bmp" => Ok(DocumentType::Image),
            other => Err(UnitError::UnsupportedType {
                extension: other.to_string(),
            }),
        }
    }

    /// Numeric `fileType` tag understood by the layout-parsing service.
    pub fn wire_tag(self) -> u8 {
        match self {
            DocumentType::Pdf => 0,
            DocumentType::Image => 1,
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentType::Image => f.write_str("image"),
            DocumentType::Pdf => f.write_str("pdf"),
        }
    }
}

/// One binary payload ready for recognition: a whole document or a PDF slice.
#[derive(Clone, PartialEq, Eq)]
pub struct DocumentUnit {
    pub data: Vec<u8>,
    pub kind: DocumentType,
}

impl DocumentUnit {
    pub fn new(data: Vec<u8>, kind: DocumentType) -> Self {
        Self { data, kind }
    }

    pub fn image(data: Vec<u8>) -> Self {
        Self::new(data, DocumentType::Image)
    }

    pub fn pdf(data: Vec<u8>) -> Self {
        Self::new(data, DocumentType::Pdf)
    }
}

impl fmt::Debug for DocumentUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentUnit")
            .field("kind", &self.kind)
            .field("bytes", &self.data.len())
            .finish()
    }
}

/// How the final text is handed back to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OutputFormat {
    /// Inline `{"result": "..."}` payload.
    #[default]
    Text,
    /// Binary `ocr_result.md` attachment declared as `text/plain`.
    File,
}

impl OutputFormat {
    /// `"text"` selects [`OutputFormat::Text`]; any other value selects a file.
    pub fn from_selector(selector: &str) -> Self {
        if selector == "text" {
            OutputFormat::Text
        } else {
            OutputFormat::File
        }
    }
}

/// Parameters of one invocation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OcrRequest {
    pub documents: Vec<DocumentReference>,
    /// Pages per PDF slice. `None` or `Some(0)` sends each PDF whole.
    pub segmentation: Option<usize>,
    pub output_format: OutputFormat,
}

impl OcrRequest {
    pub fn new(documents: Vec<DocumentReference>) -> Self {
        Self {
            documents,
            ..Default::default()
        }
    }

    pub fn segmentation(mut self, pages: Option<usize>) -> Self {
        self.segmentation = pages;
        self
    }

    pub fn output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = format;
        self
    }
}
