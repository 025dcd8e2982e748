//! Document retrieval: `GET {base_url}{location}` with a fixed retry budget.
//!
//! Storage sits behind a reverse proxy that occasionally answers 502/404
//! while an upload is still being committed, so every document gets a small
//! number of attempts with a fixed pause in between. The pause is a
//! `tokio::time::sleep`, which suspends only the retrying document's future;
//! sibling documents keep running.

use crate::config::OcrConfig;
use crate::error::{OcrError, UnitError};
use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Anything that can turn a document location into its raw bytes.
///
/// The default implementation is [`HttpFetcher`]; tests and embedders can
/// inject their own through [`crate::config::OcrConfigBuilder::source`].
#[async_trait]
pub trait DocumentSource: Send + Sync {
    /// Retrieve the complete body for `location`.
    async fn fetch(&self, location: &str) -> Result<Vec<u8>, UnitError>;

    /// Human-readable address for `location`, used in diagnostics.
    fn address(&self, location: &str) -> String {
        location.to_string()
    }
}

/// Storage client over plain HTTP.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    base_url: String,
    attempts: u32,
    pause: Duration,
}

impl HttpFetcher {
    /// Build a fetcher from the config's base URL, retry budget and timeout.
    pub fn new(config: &OcrConfig) -> Result<Self, OcrError> {
        let client = reqwest::Client::builder()
            .timeout(config.download_timeout())
            .build()
            .map_err(|e| OcrError::InvalidConfig(format!("HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            attempts: config.fetch_attempts.max(1),
            pause: config.retry_pause(),
        })
    }
}

#[async_trait]
impl DocumentSource for HttpFetcher {
    async fn fetch(&self, location: &str) -> Result<Vec<u8>, UnitError> {
        let url = self.address(location);
        let client = &self.client;
        let target = url.as_str();

        retry_fetch(target, self.attempts, self.pause, || async move {
            let response = match client.get(target).send().await {
                Ok(response) => response,
                Err(e) => return Err(e.to_string()),
            };
            if !response.status().is_success() {
                return Err(format!("HTTP {}", response.status()));
            }
            response
                .bytes()
                .await
                .map(|body| body.to_vec())
                .map_err(|e| format!("body read failed: {e}"))
        })
        .await
    }

    fn address(&self, location: &str) -> String {
        format!("{}{}", self.base_url, location)
    }
}

/// Run `attempt` up to `attempts` times with `pause` between consecutive
/// tries. No pause follows the final attempt.
async fn retry_fetch<F, Fut>(
    url: &str,
    attempts: u32,
    pause: Duration,
    mut attempt: F,
) -> Result<Vec<u8>, UnitError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Vec<u8>, String>>,
{
    let attempts = attempts.max(1);
    let mut last_reason = String::new();

    for n in 1..=attempts {
        match attempt().await {
            Ok(body) => {
                debug!("Fetched {} ({} bytes, attempt {})", url, body.len(), n);
                return Ok(body);
            }
            Err(reason) => last_reason = reason,
        }

        warn!(
            "Fetch {}: attempt {}/{} failed: {}",
            url, n, attempts, last_reason
        );
        if n < attempts {
            tokio::time::sleep(pause).await;
        }
    }

    Err(UnitError::Fetch {
        url: url.to_string(),
        attempts,
        reason: last_reason,
    })
}
