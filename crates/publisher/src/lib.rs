//! Publishing of text messages to the Twitter API
//!
//! `Publisher::publish()` sends one OAuth 1.0a signed request per call and
//! reports the outcome. Retry policy lives in the scheduler, not here.

pub mod error;
pub mod tweets;

pub use error::{Error, Result};
pub use tweets::{PostedMessage, Publisher, TWEETS_ENDPOINT, USER_AGENT};
