//! Signed POST to the tweet creation endpoint

use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, warn};
use twitter_auth::{AccessToken, Signer};

use crate::error::{Error, Result};

/// Twitter API v2 tweet creation endpoint
pub const TWEETS_ENDPOINT: &str = "https://api.twitter.com/2/tweets";

/// User-Agent sent with every publish request
pub const USER_AGENT: &str = concat!("tweet-bot/", env!("CARGO_PKG_VERSION"));

/// Result of a successful publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostedMessage {
    /// Identifier assigned by the platform, when the response carried one
    pub id: Option<String>,
    /// Full decoded response body
    pub body: serde_json::Value,
}

#[derive(Deserialize)]
struct CreatedData {
    id: Option<String>,
}

#[derive(Deserialize)]
struct CreatedEnvelope {
    data: Option<CreatedData>,
}

/// Publishes text messages on behalf of an authorized user.
pub struct Publisher {
    client: reqwest::Client,
    signer: Signer,
    endpoint: String,
}

impl Publisher {
    pub fn new(client: reqwest::Client, signer: Signer) -> Self {
        Self::with_endpoint(client, signer, TWEETS_ENDPOINT)
    }

    pub fn with_endpoint(client: reqwest::Client, signer: Signer, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            signer,
            endpoint: endpoint.into(),
        }
    }

    /// Publish `text` as the user identified by `token`.
    ///
    /// Makes no request when the token or its secret is empty. Non-2xx
    /// answers are returned as `Rejected`; nothing is retried here.
    pub async fn publish(&self, text: &str, token: &AccessToken) -> Result<PostedMessage> {
        if !token.is_complete() {
            return Err(Error::NotAuthenticated(
                "access token or secret is missing".into(),
            ));
        }

        let authorization = self
            .signer
            .authorize("POST", &self.endpoint, Some(token.credential()));

        debug!(endpoint = %self.endpoint, chars = text.chars().count(), "publishing message");

        let response = self
            .client
            .post(&self.endpoint)
            .header(reqwest::header::AUTHORIZATION, authorization)
            .header(reqwest::header::ACCEPT, "application/json")
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .json(&json!({ "text": text }))
            .send()
            .await
            .map_err(|e| Error::Network(format!("posting endpoint unreachable: {e}")))?;

        let status = response.status();
        // Not retryable: the post may already exist
        let raw = response
            .text()
            .await
            .map_err(|e| Error::InvalidResponse(format!("reading {status} response failed: {e}")))?;

        if !status.is_success() {
            let message = rejection_message(&raw);
            warn!(status = status.as_u16(), message, "message rejected");
            return Err(Error::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let body: serde_json::Value = serde_json::from_str(&raw)
            .map_err(|e| Error::InvalidResponse(format!("undecodable body: {e}")))?;
        let id = serde_json::from_value::<CreatedEnvelope>(body.clone())
            .ok()
            .and_then(|env| env.data)
            .and_then(|data| data.id);

        info!(id = ?id, "message published");
        Ok(PostedMessage { id, body })
    }
}

/// Human-readable reason from an error body, falling back to the raw text.
fn rejection_message(raw: &str) -> String {
    let Ok(body) = serde_json::from_str::<serde_json::Value>(raw) else {
        return raw.trim().to_string();
    };
    ["detail", "title"]
        .iter()
        .find_map(|key| body.get(key).and_then(|v| v.as_str()))
        .or_else(|| body.pointer("/errors/0/message").and_then(|v| v.as_str()))
        .map(str::to_string)
        .unwrap_or_else(|| raw.trim().to_string())
}
