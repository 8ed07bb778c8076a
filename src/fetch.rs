//! # Image Fetch Module
//!
//! This module downloads cover photographs over HTTP and decodes them into
//! pixel data for the enhancement pipeline. Transport failures are retried
//! with exponential backoff and jitter; size and content-type are checked
//! before the body is decoded; corrupt or zero-sized payloads are rejected
//! with a typed error instead of reaching the pipeline.

use image::DynamicImage;
use rand::Rng;
use std::time::Duration;
use tracing::{debug, warn};

/// Errors raised while downloading or decoding an image.
///
/// `Network` failures are transient and retried by the fetcher itself; the
/// other kinds describe the payload and are not worth retrying on the same
/// URL.
#[derive(Debug)]
pub enum FetchError {
    /// Transport-level failure (DNS, connect, timeout, HTTP status)
    Network(String),
    /// Response body exceeds the configured size cap
    TooLarge { size: u64, max: u64 },
    /// Response is not an image
    UnsupportedContent(String),
    /// Body could not be decoded into pixels, or decoded to a zero-sized image
    Decode(String),
}

impl std::fmt::Display for FetchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FetchError::Network(msg) => write!(f, "[NETWORK] Image download failed: {}", msg),
            FetchError::TooLarge { size, max } => {
                write!(f, "Image too large: {} bytes (maximum allowed: {} bytes)", size, max)
            }
            FetchError::UnsupportedContent(msg) => {
                write!(f, "Unsupported response content: {}", msg)
            }
            FetchError::Decode(msg) => write!(f, "Failed to decode image: {}", msg),
        }
    }
}

impl std::error::Error for FetchError {}

impl FetchError {
    fn is_transient(&self) -> bool {
        matches!(self, FetchError::Network(_))
    }
}

/// Configuration for the image fetcher.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Maximum accepted body size in bytes
    pub max_bytes: u64,
    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,
    /// Maximum number of attempts for transient failures
    pub max_retries: u32,
    /// Base delay between retries in milliseconds
    pub base_retry_delay_ms: u64,
    /// Maximum delay between retries in milliseconds
    pub max_retry_delay_ms: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_bytes: 10 * 1024 * 1024, // 10MB limit for cover photographs
            request_timeout_secs: 5,
            max_retries: 3,
            base_retry_delay_ms: 1000,
            max_retry_delay_ms: 10000,
        }
    }
}

/// Downloads and decodes cover photographs.
pub struct ImageFetcher {
    client: reqwest::Client,
    config: FetchConfig,
}

impl ImageFetcher {
    pub fn new(config: FetchConfig) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| FetchError::Network(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client, config })
    }

    /// Downloads `url` and decodes the body into pixel data.
    ///
    /// Transient network failures are retried up to the configured attempt
    /// count with exponential backoff and jitter; payload errors surface
    /// immediately.
    pub async fn fetch_image(&self, url: &str) -> Result<DynamicImage, FetchError> {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match self.fetch_once(url).await {
                Ok(image) => return Ok(image),
                Err(err) if err.is_transient() && attempt < self.config.max_retries => {
                    let delay_ms = calculate_retry_delay(attempt, &self.config);
                    warn!(
                        "Image download attempt {attempt} failed: {err}. Retrying in {delay_ms}ms"
                    );
                    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn fetch_once(&self, url: &str) -> Result<DynamicImage, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?
            .error_for_status()
            .map_err(|e| FetchError::Network(e.to_string()))?;

        // A declared non-image content type is a hard failure; a missing
        // header falls through to the decoder, which has the final say
        if let Some(content_type) = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
        {
            if !content_type.starts_with("image/")
                && content_type != "application/octet-stream"
            {
                return Err(FetchError::UnsupportedContent(format!(
                    "content type '{}' for {}",
                    content_type, url
                )));
            }
        }

        // Check Content-Length before downloading the body
        if let Some(content_length) = response.content_length() {
            if content_length > self.config.max_bytes {
                return Err(FetchError::TooLarge {
                    size: content_length,
                    max: self.config.max_bytes,
                });
            }
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        if bytes.len() as u64 > self.config.max_bytes {
            return Err(FetchError::TooLarge {
                size: bytes.len() as u64,
                max: self.config.max_bytes,
            });
        }
        if bytes.is_empty() {
            return Err(FetchError::Decode("empty response body".to_string()));
        }

        let image = image::load_from_memory(&bytes)
            .map_err(|e| FetchError::Decode(e.to_string()))?;
        if image.width() == 0 || image.height() == 0 {
            return Err(FetchError::Decode("decoded image has zero size".to_string()));
        }

        debug!(
            "Downloaded image from {}: {} bytes, {}x{}",
            url,
            bytes.len(),
            image.width(),
            image.height()
        );
        Ok(image)
    }
}

/// Exponential backoff with jitter.
///
/// `delay = min(base * 2^(attempt-1), max)` plus up to `delay / 4` of random
/// jitter so synchronized clients spread out their retries.
fn calculate_retry_delay(attempt: u32, config: &FetchConfig) -> u64 {
    let exponential = config
        .base_retry_delay_ms
        .saturating_mul(1u64 << (attempt.saturating_sub(1)).min(16));
    let capped = exponential.min(config.max_retry_delay_ms);
    let jitter = rand::rng().random_range(0..=capped / 4);
    capped + jitter
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_delay_grows_and_caps() {
        let config = FetchConfig::default();

        let first = calculate_retry_delay(1, &config);
        assert!((1000..=1250).contains(&first), "got {}", first);

        let second = calculate_retry_delay(2, &config);
        assert!((2000..=2500).contains(&second), "got {}", second);

        // Past the cap the base delay stays pinned at max
        let late = calculate_retry_delay(10, &config);
        assert!((10000..=12500).contains(&late), "got {}", late);
    }

    #[test]
    fn test_network_errors_are_transient() {
        assert!(FetchError::Network("timeout".to_string()).is_transient());
        assert!(!FetchError::Decode("garbage".to_string()).is_transient());
        assert!(!FetchError::TooLarge { size: 10, max: 1 }.is_transient());
        assert!(!FetchError::UnsupportedContent("text/html".to_string()).is_transient());
    }

    #[tokio::test]
    async fn test_fetch_image_rejects_bad_url() {
        let fetcher = ImageFetcher::new(FetchConfig {
            max_retries: 1,
            request_timeout_secs: 1,
            ..FetchConfig::default()
        })
        .unwrap();

        let result = fetcher.fetch_image("http://127.0.0.1:9/unreachable").await;
        assert!(matches!(result, Err(FetchError::Network(_))));
    }
}
