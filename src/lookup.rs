//! # Purchase Link Lookup Module
//!
//! This module turns extracted cover text into a purchase link by querying
//! the Google Books volumes API. The core pipeline only supplies the trimmed
//! text; this module owns the request/response glue.

use serde::Deserialize;
use tracing::{debug, warn};

const GOOGLE_BOOKS_ENDPOINT: &str = "https://www.googleapis.com/books/v1/volumes";

/// Errors raised while querying the books API.
#[derive(Debug)]
pub enum LookupError {
    /// Transport-level failure
    Network(String),
    /// Response body could not be parsed
    Response(String),
}

impl std::fmt::Display for LookupError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LookupError::Network(msg) => write!(f, "[NETWORK] Book lookup failed: {}", msg),
            LookupError::Response(msg) => {
                write!(f, "Unexpected book lookup response: {}", msg)
            }
        }
    }
}

impl std::error::Error for LookupError {}

#[derive(Debug, Deserialize)]
struct VolumeList {
    #[serde(default)]
    items: Vec<Volume>,
}

#[derive(Debug, Deserialize)]
struct Volume {
    #[serde(rename = "volumeInfo")]
    volume_info: VolumeInfo,
}

#[derive(Debug, Deserialize)]
struct VolumeInfo {
    #[serde(default)]
    title: Option<String>,
    #[serde(rename = "infoLink")]
    info_link: Option<String>,
}

/// Client for the Google Books volumes API.
pub struct PurchaseLookup {
    client: reqwest::Client,
    endpoint: String,
}

impl PurchaseLookup {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            endpoint: GOOGLE_BOOKS_ENDPOINT.to_string(),
        }
    }

    /// Overrides the API endpoint, for tests against a local server.
    #[cfg(test)]
    fn with_endpoint(client: reqwest::Client, endpoint: String) -> Self {
        Self { client, endpoint }
    }

    /// Looks up a purchase link for the extracted cover text.
    ///
    /// Returns `Ok(None)` when the API has no match for the query; transport
    /// and parse failures surface as errors so the caller can distinguish
    /// "not found" from "lookup broken".
    pub async fn find_purchase_link(&self, query: &str) -> Result<Option<String>, LookupError> {
        let query = query.trim();
        if query.is_empty() {
            debug!("Skipping purchase lookup for empty query");
            return Ok(None);
        }

        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("q", query), ("maxResults", "1")])
            .send()
            .await
            .map_err(|e| LookupError::Network(e.to_string()))?
            .error_for_status()
            .map_err(|e| LookupError::Network(e.to_string()))?;

        let volumes: VolumeList = response
            .json()
            .await
            .map_err(|e| LookupError::Response(e.to_string()))?;

        match volumes.items.into_iter().next() {
            Some(volume) => {
                debug!(
                    "Lookup matched volume '{}'",
                    volume.volume_info.title.as_deref().unwrap_or("<untitled>")
                );
                Ok(volume.volume_info.info_link)
            }
            None => {
                warn!("No volume found for query '{}'", query);
                Ok(None)
            }
        }
    }
}
