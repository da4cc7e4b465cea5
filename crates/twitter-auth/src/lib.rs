//! Twitter OAuth 1.0a authentication library
//!
//! Provides HMAC-SHA1 request signing, the three-legged PIN authorization
//! flow, and access token file storage. The library has no dependency on the
//! bot binary and can be tested independently.
//!
//! Credential flow:
//! 1. `Session::current()` reads the stored record via `CredentialStore::load()`
//! 2. Without one, `AuthFlow::run()` calls `token::request_token()`
//! 3. The user visits `token::authorize_url()` and returns a PIN via a `PinSource`
//! 4. `token::access_token()` exchanges the request token and PIN
//! 5. The access token is stored with `CredentialStore::save()`
//! 6. Callers sign API requests with `Signer::authorize()`

pub mod constants;
pub mod credentials;
pub mod error;
pub mod flow;
pub mod pin;
pub mod session;
pub mod signer;
pub mod token;

pub use constants::*;
pub use credentials::{CredentialStore, DEFAULT_CREDENTIALS_FILE};
pub use error::{Error, Result};
pub use flow::{AuthFlow, AuthPhase};
pub use pin::{PinHandoff, PinSource};
pub use session::Session;
pub use signer::{ConsumerCredential, Signer, TokenCredential};
pub use token::{AccessToken, RequestToken};
