//! Source of the text to publish on each tick

use std::future::Future;
use std::pin::Pin;

use serde::Deserialize;
use tracing::debug;

use crate::error::{Error, Result};

/// Supplier of generated message text.
///
/// Uses `Pin<Box<dyn Future>>` for dyn-compatibility (`Arc<dyn ContentSource>`).
pub trait ContentSource: Send + Sync {
    fn fetch(&self) -> Pin<Box<dyn Future<Output = Result<String>> + Send + '_>>;
}

#[derive(Deserialize)]
struct ContentBody {
    response: Option<String>,
}

/// Fetches text with a GET to a URL answering `{"response": "..."}`.
pub struct HttpContentSource {
    client: reqwest::Client,
    url: String,
}

impl HttpContentSource {
    pub fn new(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }

    async fn fetch_text(&self) -> Result<String> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| Error::Network(format!("content source unreachable: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            // A failing generator is treated like a failed fetch and retried
            return Err(Error::Network(format!(
                "failed to fetch content: status {status}"
            )));
        }

        let body: ContentBody = response
            .json()
            .await
            .map_err(|e| Error::Content(format!("undecodable content body: {e}")))?;

        let text = body
            .response
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| Error::Content("content body has no response text".into()))?;
        debug!(chars = text.chars().count(), "fetched content");
        Ok(text)
    }
}

impl ContentSource for HttpContentSource {
    fn fetch(&self) -> Pin<Box<dyn Future<Output = Result<String>> + Send + '_>> {
        Box::pin(self.fetch_text())
    }
}
