//! OAuth 1.0a token endpoints
//!
//! Handles the two token endpoint interactions of the PIN flow:
//! 1. Request token (consumer credential only, `oauth_callback=oob`)
//! 2. Access token (request token + `oauth_verifier` PIN)
//!
//! Both endpoints answer with a URL-encoded body (`key=value&key=value`).

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::constants::{ACCESS_TYPE, Endpoints, OOB_CALLBACK};
use crate::error::{Error, Result};
use crate::signer::{Signer, TokenCredential, encode, parse_pairs};

/// Temporary credential issued by the request token endpoint.
///
/// Lives only for the duration of one authorization attempt.
#[derive(Clone, PartialEq, Eq)]
pub struct RequestToken {
    pub oauth_token: String,
    pub oauth_token_secret: String,
    pub oauth_callback_confirmed: bool,
}

impl RequestToken {
    /// Build from a decoded token-endpoint body. `oauth_token` is required.
    pub fn from_form(mut fields: HashMap<String, String>) -> Result<Self> {
        let oauth_token = fields
            .remove("oauth_token")
            .filter(|t| !t.is_empty())
            .ok_or_else(|| Error::RequestToken("response has no oauth_token".into()))?;
        Ok(Self {
            oauth_token,
            oauth_token_secret: fields.remove("oauth_token_secret").unwrap_or_default(),
            oauth_callback_confirmed: fields
                .get("oauth_callback_confirmed")
                .is_some_and(|v| v == "true"),
        })
    }

    pub fn credential(&self) -> TokenCredential<'_> {
        TokenCredential {
            key: &self.oauth_token,
            secret: &self.oauth_token_secret,
        }
    }
}

impl fmt::Debug for RequestToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestToken")
            .field("oauth_token", &self.oauth_token)
            .field("oauth_token_secret", &"[REDACTED]")
            .field("oauth_callback_confirmed", &self.oauth_callback_confirmed)
            .finish()
    }
}

/// Long-lived user credential, persisted by the credential store.
///
/// Never mutated in place; a new authorization replaces it wholesale.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessToken {
    pub oauth_token: String,
    pub oauth_token_secret: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screen_name: Option<String>,
}

impl AccessToken {
    /// Build from a decoded token-endpoint body. Token and secret are required.
    pub fn from_form(mut fields: HashMap<String, String>) -> Result<Self> {
        let mut required = |name: &str| {
            fields
                .remove(name)
                .filter(|v| !v.is_empty())
                .ok_or_else(|| Error::AccessToken(format!("response has no {name}")))
        };
        let oauth_token = required("oauth_token")?;
        let oauth_token_secret = required("oauth_token_secret")?;
        Ok(Self {
            oauth_token,
            oauth_token_secret,
            user_id: fields.remove("user_id"),
            screen_name: fields.remove("screen_name"),
        })
    }

    /// Both halves of the credential are present and non-empty.
    pub fn is_complete(&self) -> bool {
        !self.oauth_token.is_empty() && !self.oauth_token_secret.is_empty()
    }

    pub fn credential(&self) -> TokenCredential<'_> {
        TokenCredential {
            key: &self.oauth_token,
            secret: &self.oauth_token_secret,
        }
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("oauth_token", &self.oauth_token)
            .field("oauth_token_secret", &"[REDACTED]")
            .field("user_id", &self.user_id)
            .field("screen_name", &self.screen_name)
            .finish()
    }
}

/// Decode a URL-encoded token-endpoint body into a field map.
pub fn parse_form_body(body: &str) -> HashMap<String, String> {
    parse_pairs(body.trim()).into_iter().collect()
}

/// Authorization page URL the user must visit to obtain a PIN.
pub fn authorize_url(endpoints: &Endpoints, request_token: &RequestToken) -> String {
    let separator = if endpoints.authorize.contains('?') { '&' } else { '?' };
    format!(
        "{}{}oauth_token={}",
        endpoints.authorize,
        separator,
        encode(&request_token.oauth_token)
    )
}

/// Leg 1: obtain a request token using only the consumer credential.
pub async fn request_token(
    client: &reqwest::Client,
    signer: &Signer,
    endpoints: &Endpoints,
) -> Result<RequestToken> {
    let url = format!(
        "{}?oauth_callback={}&x_auth_access_type={}",
        endpoints.request_token,
        encode(OOB_CALLBACK),
        encode(ACCESS_TYPE)
    );
    let body = post_signed(client, signer, &url, None)
        .await
        .map_err(Error::RequestToken)?;
    let token = RequestToken::from_form(parse_form_body(&body))?;
    debug!(
        callback_confirmed = token.oauth_callback_confirmed,
        "obtained request token"
    );
    Ok(token)
}

/// Leg 3: exchange the request token and user PIN for an access token.
pub async fn access_token(
    client: &reqwest::Client,
    signer: &Signer,
    endpoints: &Endpoints,
    request_token: &RequestToken,
    pin: &str,
) -> Result<AccessToken> {
    let url = format!("{}?oauth_verifier={}", endpoints.access_token, encode(pin));
    let body = post_signed(client, signer, &url, Some(request_token.credential()))
        .await
        .map_err(Error::AccessToken)?;
    let token = AccessToken::from_form(parse_form_body(&body))?;
    debug!(screen_name = ?token.screen_name, "obtained access token");
    Ok(token)
}

/// POST a signed, bodyless request and return the response text.
///
/// Errors are plain strings so each leg can wrap them in its own variant.
async fn post_signed(
    client: &reqwest::Client,
    signer: &Signer,
    url: &str,
    token: Option<TokenCredential<'_>>,
) -> std::result::Result<String, String> {
    let authorization = signer.authorize("POST", url, token);
    let response = client
        .post(url)
        .header(reqwest::header::AUTHORIZATION, authorization)
        .send()
        .await
        .map_err(|e| format!("request failed: {e}"))?;

    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| format!("reading response body failed: {e}"))?;
    if !status.is_success() {
        return Err(format!("token endpoint returned {status}: {body}"));
    }
    Ok(body)
}
