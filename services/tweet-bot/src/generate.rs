//! Post text generation via the Gemini `generateContent` API

use common::Secret;
use serde_json::json;
use tracing::{debug, warn};

use crate::config::GeneratorConfig;
use crate::error::{Error, Result};

/// Characters replaced by a single space wherever they appear in a run
const STRIPPED: &[char] = &[
    '\\', '/', '"', '*', '+', '!', '@', '$', '%', '^', '&', '(', ')', '_', '=', '{', '}', '[', ']',
    ':', ';', '<', '>', '?', '|', '`', '~', '\n', '\r', '\t',
];

/// Replace each run of formatting/special characters with one space, then
/// trim. Letters, digits, `#`, `.`, `,`, `'`, `-` and emoji are kept.
pub fn clean_tweet(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut in_run = false;
    for c in input.chars() {
        if STRIPPED.contains(&c) {
            if !in_run {
                out.push(' ');
                in_run = true;
            }
        } else {
            out.push(c);
            in_run = false;
        }
    }
    out.trim().to_string()
}

/// Client for the content generation API.
pub struct Generator {
    client: reqwest::Client,
    url: String,
    prompt: String,
    temperature: f32,
    max_output_tokens: u32,
    api_key: Option<Secret<String>>,
}

impl Generator {
    pub fn new(
        client: reqwest::Client,
        config: &GeneratorConfig,
        api_key: Option<Secret<String>>,
    ) -> Self {
        let base = config.base_url.trim_end_matches('/');
        Self {
            client,
            url: format!("{base}/v1beta/models/{}:generateContent", config.model),
            prompt: config.prompt.clone(),
            temperature: config.temperature,
            max_output_tokens: config.max_output_tokens,
            api_key,
        }
    }

    /// Generate one cleaned post.
    ///
    /// Any answer without candidate text, including a JSON error status such
    /// as a 429 quota error, yields the `No response` sentinel. Transport
    /// failures and undecodable bodies are errors.
    pub async fn generate(&self) -> Result<String> {
        let api_key = self.api_key.as_ref().ok_or(Error::MissingApiKey)?;

        let body = json!({
            "contents": [{ "parts": [{ "text": self.prompt }] }],
            "generationConfig": {
                "temperature": self.temperature,
                "maxOutputTokens": self.max_output_tokens,
            }
        });

        let response = self
            .client
            .post(&self.url)
            .header("x-goog-api-key", api_key.expose().as_str())
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Generation(format!("generator unreachable: {e}")))?;

        let status = response.status();
        let data: serde_json::Value = response
            .json()
            .await
            .map_err(|e| Error::Generation(format!("undecodable generator body ({status}): {e}")))?;
        if !status.is_success() {
            let message = data
                .pointer("/error/message")
                .and_then(|v| v.as_str())
                .unwrap_or_default();
            warn!(status = status.as_u16(), message, "generator returned an error");
        }

        let text = data
            .pointer("/candidates/0/content/parts/0/text")
            .and_then(|v| v.as_str())
            .filter(|t| !t.is_empty())
            .unwrap_or(scheduler::NO_RESPONSE);
        debug!(chars = text.chars().count(), "generator answered");

        Ok(clean_tweet(text))
    }
}
