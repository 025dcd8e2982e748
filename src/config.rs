//! Configuration for batch OCR conversion.
//!
//! All service endpoints and pipeline knobs live in [`OcrConfig`], built via
//! its [`OcrConfigBuilder`]. The config is passed explicitly into the fetcher
//! and recognizer constructors; nothing in the library reads process
//! environment, so two configs can drive two different services side by side.

use crate::error::OcrError;
use crate::pipeline::fetch::DocumentSource;
use crate::pipeline::recognize::Recognizer;
use crate::progress::ProgressCallback;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Storage base address used when none is configured.
pub const DEFAULT_BASE_URL: &str = "http://nginx:80";

/// Configuration for one or more OCR invocations.
///
/// Built via [`OcrConfig::builder()`] or using [`OcrConfig::default()`].
///
/// # Example
/// ```rust
/// use doc_ocr::OcrConfig;
///
/// let config = OcrConfig::builder()
///     .ocr_url("http://paddle:8080/layout-parsing")
///     .base_url("http://files.internal")
///     .document_concurrency(2)
///     .build()
///     .unwrap();
/// assert_eq!(config.slice_concurrency, 3);
/// ```
#[derive(Clone)]
pub struct OcrConfig {
    /// Layout-parsing endpoint receiving `{file, fileType}` POSTs.
    ///
    /// Required unless a pre-built [`Recognizer`] is supplied.
    pub ocr_url: Option<String>,

    /// Prefix joined with each document location. Default: `http://nginx:80`.
    pub base_url: String,

    /// Maximum documents in flight at once. Default: 4.
    pub document_concurrency: usize,

    /// Maximum slices of one PDF in flight at once. Default: 3.
    ///
    /// Applies per document, so the worst case is
    /// `document_concurrency * slice_concurrency` recognition calls.
    pub slice_concurrency: usize,

    /// Storage GET attempts per document. Default: 3.
    pub fetch_attempts: u32,

    /// Fixed pause between storage attempts in milliseconds. Default: 1000.
    pub retry_pause_ms: u64,

    /// Per-request storage timeout in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Per-request recognition timeout in seconds. Default: 300.
    ///
    /// Layout parsing of a multi-page slice can take minutes on CPU-only
    /// deployments.
    pub api_timeout_secs: u64,

    /// Run [`crate::pipeline::postprocess::normalize_markdown`] on each
    /// document before assembly. Default: true.
    pub normalize: bool,

    /// Pre-constructed storage client. Takes precedence over `base_url`.
    pub source: Option<Arc<dyn DocumentSource>>,

    /// Pre-constructed recognition client. Takes precedence over `ocr_url`.
    pub recognizer: Option<Arc<dyn Recognizer>>,

    /// Receiver for per-document progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            ocr_url: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            document_concurrency: 4,
            slice_concurrency: 3,
            fetch_attempts: 3,
            retry_pause_ms: 1000,
            download_timeout_secs: 120,
            api_timeout_secs: 300,
            normalize: true,
            source: None,
            recognizer: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for OcrConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OcrConfig")
            .field("ocr_url", &self.ocr_url)
            .field("base_url", &self.base_url)
            .field("document_concurrency", &self.document_concurrency)
            .field("slice_concurrency", &self.slice_concurrency)
            .field("fetch_attempts", &self.fetch_attempts)
            .field("retry_pause_ms", &self.retry_pause_ms)
            .field("download_timeout_secs", &self.download_timeout_secs)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("normalize", &self.normalize)
            .field("source", &self.source.as_ref().map(|_| "<dyn DocumentSource>"))
            .field(
                "recognizer",
                &self.recognizer.as_ref().map(|_| "<dyn Recognizer>"),
            )
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn Callback>"),
            )
            .finish()
    }
}

impl OcrConfig {
    /// Create a new builder for `OcrConfig`.
    pub fn builder() -> OcrConfigBuilder {
        OcrConfigBuilder {
            config: Self::default(),
        }
    }

    pub fn retry_pause(&self) -> Duration {
        Duration::from_millis(self.retry_pause_ms)
    }

    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_secs)
    }

    pub fn api_timeout(&self) -> Duration {
        Duration::from_secs(self.api_timeout_secs)
    }
}

/// Builder for [`OcrConfig`].
#[derive(Debug)]
pub struct OcrConfigBuilder {
    config: OcrConfig,
}

impl OcrConfigBuilder {
    pub fn ocr_url(mut self, url: impl Into<String>) -> Self {
        self.config.ocr_url = Some(url.into());
        self
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into();
        self
    }

    pub fn document_concurrency(mut self, n: usize) -> Self {
        self.config.document_concurrency = n;
        self
    }

    pub fn slice_concurrency(mut self, n: usize) -> Self {
        self.config.slice_concurrency = n;
        self
    }

    pub fn fetch_attempts(mut self, n: u32) -> Self {
        self.config.fetch_attempts = n;
        self
    }

    pub fn retry_pause_ms(mut self, ms: u64) -> Self {
        self.config.retry_pause_ms = ms;
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn normalize(mut self, v: bool) -> Self {
        self.config.normalize = v;
        self
    }

    pub fn source(mut self, source: Arc<dyn DocumentSource>) -> Self {
        self.config.source = Some(source);
        self
    }

    pub fn recognizer(mut self, recognizer: Arc<dyn Recognizer>) -> Self {
        self.config.recognizer = Some(recognizer);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<OcrConfig, OcrError> {
        let c = &self.config;
        if c.document_concurrency == 0 || c.slice_concurrency == 0 {
            return Err(OcrError::InvalidConfig(
                "Concurrency caps must be ≥ 1".into(),
            ));
        }
        if c.fetch_attempts == 0 {
            return Err(OcrError::InvalidConfig(
                "Fetch attempts must be ≥ 1".into(),
            ));
        }
        if let Some(ref url) = c.ocr_url {
            if !is_http_url(url) {
                return Err(OcrError::InvalidConfig(format!(
                    "OCR URL must start with http:// or https://, got '{url}'"
                )));
            }
        }
        if c.source.is_none() && !is_http_url(&c.base_url) {
            return Err(OcrError::InvalidConfig(format!(
                "Base URL must start with http:// or https://, got '{}'",
                c.base_url
            )));
        }
        Ok(self.config)
    }
}

/// Check if the string looks like an HTTP(S) URL.
pub fn is_http_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}
