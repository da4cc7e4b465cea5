//! Twitter OAuth 1.0a endpoints
//!
//! The three-legged PIN flow uses the legacy `api.twitter.com/oauth/*`
//! endpoints; signed requests to the v2 API reuse the same consumer and
//! access credentials.

/// Request token endpoint (leg 1)
pub const REQUEST_TOKEN_URL: &str = "https://api.twitter.com/oauth/request_token";

/// Browser authorization page (leg 2); the user receives a PIN here
pub const AUTHORIZE_URL: &str = "https://api.twitter.com/oauth/authorize";

/// Access token endpoint (leg 3)
pub const ACCESS_TOKEN_URL: &str = "https://api.twitter.com/oauth/access_token";

/// Out-of-band callback: the user copies a PIN instead of being redirected
pub const OOB_CALLBACK: &str = "oob";

/// Access level requested for the token; posting needs write access
pub const ACCESS_TYPE: &str = "write";

pub const SIGNATURE_METHOD: &str = "HMAC-SHA1";

pub const OAUTH_VERSION: &str = "1.0";

/// Endpoint set used by the authorization flow.
///
/// Defaults point at Twitter; tests and alternative deployments override
/// them through configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub request_token: String,
    pub authorize: String,
    pub access_token: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            request_token: REQUEST_TOKEN_URL.to_string(),
            authorize: AUTHORIZE_URL.to_string(),
            access_token: ACCESS_TOKEN_URL.to_string(),
        }
    }
}

impl Endpoints {
    /// Endpoints rooted at a different base URL (same paths as Twitter).
    pub fn with_base(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            request_token: format!("{base}/oauth/request_token"),
            authorize: format!("{base}/oauth/authorize"),
            access_token: format!("{base}/oauth/access_token"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_endpoints_are_twitter() {
        let endpoints = Endpoints::default();
        assert_eq!(endpoints.request_token, REQUEST_TOKEN_URL);
        assert_eq!(endpoints.authorize, AUTHORIZE_URL);
        assert_eq!(endpoints.access_token, ACCESS_TOKEN_URL);
    }

    #[test]
    fn with_base_strips_trailing_slash() {
        let endpoints = Endpoints::with_base("http://127.0.0.1:4000/");
        assert_eq!(
            endpoints.request_token,
            "http://127.0.0.1:4000/oauth/request_token"
        );
        assert_eq!(endpoints.authorize, "http://127.0.0.1:4000/oauth/authorize");
    }
}
