//! Recognition: send one document unit to the layout-parsing service.
//!
//! The service accepts the whole file inline as base64 JSON and answers
//! with one layout result per detected region. Only the first result's
//! Markdown is used; the service already merges regions of a single upload
//! into that entry.
//!
//! No retry happens at this layer. A failed unit becomes a placeholder
//! at the calling coordinator; storage retries live in
//! [`crate::pipeline::fetch`].

use crate::config::OcrConfig;
use crate::document::DocumentUnit;
use crate::error::{OcrError, UnitError};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Anything that can turn a document unit into Markdown text.
#[async_trait]
pub trait Recognizer: Send + Sync {
    /// Recognise `unit` and return its text verbatim.
    async fn recognize(&self, unit: &DocumentUnit) -> Result<String, UnitError>;
}

/// Request body understood by the layout-parsing endpoint.
#[derive(Debug, Serialize)]
struct LayoutRequest<'a> {
    file: &'a str,
    #[serde(rename = "fileType")]
    file_type: u8,
}

#[derive(Debug, Deserialize)]
struct LayoutResponse {
    result: Option<LayoutResult>,
}

#[derive(Debug, Deserialize)]
struct LayoutResult {
    #[serde(rename = "layoutParsingResults")]
    layout_parsing_results: Option<Vec<LayoutEntry>>,
}

#[derive(Debug, Deserialize)]
struct LayoutEntry {
    markdown: Option<MarkdownBlock>,
}

#[derive(Debug, Deserialize)]
struct MarkdownBlock {
    text: Option<String>,
}

/// Recognition client over HTTP.
#[derive(Debug, Clone)]
pub struct HttpRecognizer {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpRecognizer {
    /// Build a recognizer for the config's OCR endpoint.
    ///
    /// # Errors
    /// [`OcrError::InvalidConfig`] when no `ocr_url` is configured.
    pub fn new(config: &OcrConfig) -> Result<Self, OcrError> {
        let endpoint = config
            .ocr_url
            .clone()
            .filter(|u| !u.is_empty())
            .ok_or_else(|| {
                OcrError::InvalidConfig("OCR URL is not configured.".into())
            })?;

        let client = reqwest::Client::builder()
            .timeout(config.api_timeout())
            .build()
            .map_err(|e| OcrError::InvalidConfig(format!("HTTP client: {e}")))?;

        Ok(Self { client, endpoint })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl Recognizer for HttpRecognizer {
    async fn recognize(&self, unit: &DocumentUnit) -> Result<String, UnitError> {
        let payload = encode_payload(&unit.data);
        debug!(
            "Recognising {} unit: {} bytes → {} bytes base64",
            unit.kind,
            unit.data.len(),
            payload.len()
        );

        let response = self
            .client
            .post(&self.endpoint)
            .json(&LayoutRequest {
                file: &payload,
                file_type: unit.kind.wire_tag(),
            })
            .send()
            .await
            .map_err(|e| UnitError::RecognitionService {
                status: None,
                body: e.to_string(),
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| UnitError::RecognitionService {
                status: Some(status.as_u16()),
                body: format!("failed to read response body: {e}"),
            })?;

        if !status.is_success() {
            return Err(UnitError::RecognitionService {
                status: Some(status.as_u16()),
                body,
            });
        }

        extract_markdown(&body)
    }
}

/// Base64-encode a unit's bytes for the `file` field.
pub fn encode_payload(data: &[u8]) -> String {
    STANDARD.encode(data)
}

/// Pull `result.layoutParsingResults[0].markdown.text` out of a response body.
pub fn extract_markdown(body: &str) -> Result<String, UnitError> {
    let parsed: LayoutResponse =
        serde_json::from_str(body).map_err(|e| UnitError::RecognitionResponse {
            detail: format!("OCR response is not valid JSON: {e}"),
        })?;

    let results = parsed
        .result
        .and_then(|r| r.layout_parsing_results)
        .ok_or_else(|| UnitError::RecognitionResponse {
            detail: "OCR response does not contain expected fields.".into(),
        })?;

    results
        .into_iter()
        .next()
        .and_then(|entry| entry.markdown)
        .and_then(|md| md.text)
        .ok_or_else(|| UnitError::RecognitionResponse {
            detail: "OCR response does not contain markdown text.".into(),
        })
}
