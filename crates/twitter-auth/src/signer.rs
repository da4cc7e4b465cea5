//! OAuth 1.0a request signing (HMAC-SHA1)
//!
//! Builds the `Authorization` header for a single request. Each call draws a
//! fresh nonce and timestamp; the deterministic [`Signer::header`] entry point
//! takes both explicitly so signatures can be recomputed and compared.
//!
//! Signature base string:
//! `METHOD & enc(base_url) & enc(sorted "k=v" pairs joined by "&")`
//! where every key and value is RFC 3986 percent-encoded before sorting.

use std::collections::BTreeMap;
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use common::Secret;
use hmac::{Hmac, Mac};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};
use rand::RngExt;
use sha1::Sha1;

use crate::constants::{OAUTH_VERSION, SIGNATURE_METHOD};

/// RFC 3986 unreserved characters stay literal; everything else is encoded.
const OAUTH_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Application-level key/secret identifying the calling application.
#[derive(Debug, Clone)]
pub struct ConsumerCredential {
    pub key: String,
    pub secret: Secret<String>,
}

impl ConsumerCredential {
    pub fn new(key: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            secret: Secret::new(secret.into()),
        }
    }
}

/// Borrowed token key/secret pair (request token or access token).
#[derive(Clone, Copy)]
pub struct TokenCredential<'a> {
    pub key: &'a str,
    pub secret: &'a str,
}

impl fmt::Debug for TokenCredential<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenCredential")
            .field("key", &self.key)
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

/// Signs outgoing requests with the consumer credential and an optional token.
#[derive(Debug, Clone)]
pub struct Signer {
    consumer: ConsumerCredential,
}

impl Signer {
    pub fn new(consumer: ConsumerCredential) -> Self {
        Self { consumer }
    }

    /// `Authorization` header for a request whose only parameters live in
    /// the URL query string (or that has a JSON body, which is never signed).
    pub fn authorize(&self, method: &str, url: &str, token: Option<TokenCredential<'_>>) -> String {
        self.authorize_with_params(method, url, token, &[])
    }

    /// `Authorization` header including extra form-body parameters in the
    /// signature. `params` are raw (unencoded) key/value pairs.
    pub fn authorize_with_params(
        &self,
        method: &str,
        url: &str,
        token: Option<TokenCredential<'_>>,
        params: &[(&str, &str)],
    ) -> String {
        self.header(method, url, token, params, &generate_nonce(), unix_timestamp())
    }

    /// Deterministic header construction with a caller-supplied nonce and
    /// timestamp.
    pub fn header(
        &self,
        method: &str,
        url: &str,
        token: Option<TokenCredential<'_>>,
        params: &[(&str, &str)],
        nonce: &str,
        timestamp: u64,
    ) -> String {
        let timestamp = timestamp.to_string();
        let mut oauth: Vec<(&str, &str)> = vec![
            ("oauth_consumer_key", self.consumer.key.as_str()),
            ("oauth_nonce", nonce),
            ("oauth_signature_method", SIGNATURE_METHOD),
            ("oauth_timestamp", timestamp.as_str()),
            ("oauth_version", OAUTH_VERSION),
        ];
        if let Some(token) = token {
            oauth.push(("oauth_token", token.key));
        }

        let signature = self.signature(method, url, token, &oauth, params);
        oauth.push(("oauth_signature", signature.as_str()));
        oauth.sort_by(|a, b| a.0.cmp(b.0));

        let fields: Vec<String> = oauth
            .iter()
            .map(|(k, v)| format!("{}=\"{}\"", encode(k), encode(v)))
            .collect();
        format!("OAuth {}", fields.join(", "))
    }

    fn signature(
        &self,
        method: &str,
        url: &str,
        token: Option<TokenCredential<'_>>,
        oauth: &[(&str, &str)],
        params: &[(&str, &str)],
    ) -> String {
        let (base_url, query) = split_url(url);
        let base_url = normalize_base_url(base_url);
        let mut encoded: Vec<(String, String)> = oauth
            .iter()
            .chain(params.iter())
            .map(|(k, v)| (encode(k), encode(v)))
            .collect();
        encoded.extend(
            parse_pairs(query)
                .into_iter()
                .map(|(k, v)| (encode(&k), encode(&v))),
        );

        let base = base_string(method, &base_url, encoded);
        let key = signing_key(self.consumer.secret.expose(), token.map(|t| t.secret));
        hmac_sha1_base64(&key, &base)
    }
}

/// Percent-encode a string per RFC 3986 (OAuth 1.0a section 3.6).
pub fn encode(value: &str) -> String {
    utf8_percent_encode(value, OAUTH_ENCODE_SET).to_string()
}

/// Decode one `application/x-www-form-urlencoded` component.
pub(crate) fn decode(value: &str) -> String {
    let spaced = value.replace('+', " ");
    percent_decode_str(&spaced).decode_utf8_lossy().into_owned()
}

/// Parse `k=v&k=v` into decoded pairs, keeping order and duplicates.
pub(crate) fn parse_pairs(input: &str) -> Vec<(String, String)> {
    input
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((k, v)) => (decode(k), decode(v)),
            None => (decode(pair), String::new()),
        })
        .collect()
}

/// Signature base string from already-encoded parameter pairs.
pub fn base_string(method: &str, base_url: &str, mut encoded_params: Vec<(String, String)>) -> String {
    encoded_params.sort();
    let joined = encoded_params
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");
    format!(
        "{}&{}&{}",
        method.to_ascii_uppercase(),
        encode(base_url),
        encode(&joined)
    )
}

/// `enc(consumer_secret) & enc(token_secret)`; the token half is empty when
/// no token takes part in the request.
pub fn signing_key(consumer_secret: &str, token_secret: Option<&str>) -> String {
    format!(
        "{}&{}",
        encode(consumer_secret),
        encode(token_secret.unwrap_or(""))
    )
}

fn hmac_sha1_base64(key: &str, base: &str) -> String {
    let mut mac =
        Hmac::<Sha1>::new_from_slice(key.as_bytes()).expect("HMAC accepts keys of any length");
    mac.update(base.as_bytes());
    STANDARD.encode(mac.finalize().into_bytes())
}

/// Split off query string and fragment: `(base_url, query)`.
fn split_url(url: &str) -> (&str, &str) {
    let url = url.split('#').next().unwrap_or(url);
    match url.split_once('?') {
        Some((base, query)) => (base, query),
        None => (url, ""),
    }
}

/// Base string URI: scheme and host lowercased, default port dropped.
fn normalize_base_url(base_url: &str) -> String {
    let Some((scheme, rest)) = base_url.split_once("://") else {
        return base_url.to_string();
    };
    let scheme = scheme.to_ascii_lowercase();
    let (authority, path) = match rest.find('/') {
        Some(i) => rest.split_at(i),
        None => (rest, "/"),
    };
    let authority = authority.to_ascii_lowercase();
    let default_port = match scheme.as_str() {
        "https" => Some(":443"),
        "http" => Some(":80"),
        _ => None,
    };
    let host = default_port
        .and_then(|port| authority.strip_suffix(port))
        .unwrap_or(&authority);
    format!("{scheme}://{host}{path}")
}

/// Fresh 256-bit random nonce, hex encoded.
pub fn generate_nonce() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill(&mut bytes);
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

fn unix_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Parse an `OAuth k="v", ...` header back into decoded parameters.
///
/// Returns `None` when the value does not carry the `OAuth ` scheme.
pub fn parse_header(value: &str) -> Option<BTreeMap<String, String>> {
    let rest = value.strip_prefix("OAuth ")?;
    let mut params = BTreeMap::new();
    for field in rest.split(',') {
        let (k, v) = field.trim().split_once('=')?;
        let v = v.trim_matches('"');
        params.insert(decode(k), decode(v));
    }
    Some(params)
}
