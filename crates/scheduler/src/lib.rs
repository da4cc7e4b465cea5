//! Scheduled generate-and-publish loop
//!
//! A `PostJob` fetches text from a `ContentSource` and hands it, with the
//! configured suffix, to a `MessageSink`. `spawn_post_task` runs the job on a
//! fixed interval; network-class failures are repeated once through a
//! `RetryTimer`.
//!
//! Metrics: `tweets_total` (counter), label `outcome` =
//! `posted` | `skipped` | `failed` | `retry_scheduled`.

pub mod content;
pub mod error;
pub mod job;
pub mod retry;
pub mod sink;
pub mod task;

pub use content::{ContentSource, HttpContentSource};
pub use error::{Error, Result};
pub use job::{DEFAULT_SUFFIX, NO_RESPONSE, Outcome, PostJob};
pub use retry::{RetryHandle, RetryTimer};
pub use sink::{MessageSink, PublisherSink};
pub use task::{attempt, spawn_post_task};
