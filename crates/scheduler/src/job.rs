//! One generate+publish attempt

use std::sync::Arc;

use tracing::info;

use crate::content::ContentSource;
use crate::error::Result;
use crate::sink::MessageSink;

/// Text the generator returns when it produced nothing usable
pub const NO_RESPONSE: &str = "No response";

/// Suffix appended to every published message
pub const DEFAULT_SUFFIX: &str = " - AI Generated";

/// Outcome of a successful attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Generator had nothing to say; nothing was published
    Skipped,
    Posted { id: Option<String> },
}

/// Fetch text from a source and publish it to a sink.
pub struct PostJob {
    source: Arc<dyn ContentSource>,
    sink: Arc<dyn MessageSink>,
    suffix: String,
}

impl PostJob {
    pub fn new(source: Arc<dyn ContentSource>, sink: Arc<dyn MessageSink>) -> Self {
        Self {
            source,
            sink,
            suffix: DEFAULT_SUFFIX.to_string(),
        }
    }

    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = suffix.into();
        self
    }

    /// Run the attempt once. Does not retry.
    pub async fn run_once(&self) -> Result<Outcome> {
        let text = self.source.fetch().await?;

        if text.trim() == NO_RESPONSE {
            info!("generator returned no content, skipping");
            return Ok(Outcome::Skipped);
        }

        let message = format!("{text}{}", self.suffix);
        let posted = self.sink.publish(&message).await?;
        Ok(Outcome::Posted { id: posted.id })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::Error;
    use publisher::PostedMessage;
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Source that returns scripted results in order, repeating the last one.
    pub(crate) struct ScriptedSource {
        results: Mutex<Vec<Result<String>>>,
        pub(crate) calls: AtomicUsize,
    }

    impl ScriptedSource {
        pub(crate) fn new(results: Vec<Result<String>>) -> Self {
            Self {
                results: Mutex::new(results),
                calls: AtomicUsize::new(0),
            }
        }

        pub(crate) fn text(text: &str) -> Self {
            Self::new(vec![Ok(text.to_string())])
        }
    }

    impl ContentSource for ScriptedSource {
        fn fetch(&self) -> Pin<Box<dyn Future<Output = Result<String>> + Send + '_>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut results = self.results.lock().unwrap();
            let next = if results.len() > 1 {
                results.remove(0)
            } else {
                results[0].clone()
            };
            Box::pin(async move { next })
        }
    }

    /// Sink that records messages and answers with a fixed result.
    pub(crate) struct RecordingSink {
        pub(crate) published: Mutex<Vec<String>>,
        result: Result<Option<String>>,
    }

    impl RecordingSink {
        pub(crate) fn ok(id: &str) -> Self {
            Self {
                published: Mutex::new(Vec::new()),
                result: Ok(Some(id.to_string())),
            }
        }

        pub(crate) fn failing(err: Error) -> Self {
            Self {
                published: Mutex::new(Vec::new()),
                result: Err(err),
            }
        }

        pub(crate) fn count(&self) -> usize {
            self.published.lock().unwrap().len()
        }
    }

    impl MessageSink for RecordingSink {
        fn publish<'a>(
            &'a self,
            text: &'a str,
        ) -> Pin<Box<dyn Future<Output = Result<PostedMessage>> + Send + 'a>> {
            self.published.lock().unwrap().push(text.to_string());
            let result = self.result.clone().map(|id| PostedMessage {
                id,
                body: serde_json::Value::Null,
            });
            Box::pin(async move { result })
        }
    }

    #[tokio::test]
    async fn no_response_is_skipped() {
        let sink = Arc::new(RecordingSink::ok("1"));
        let job = PostJob::new(Arc::new(ScriptedSource::text(NO_RESPONSE)), sink.clone());

        assert_eq!(job.run_once().await.unwrap(), Outcome::Skipped);
        assert_eq!(sink.count(), 0);
    }

    #[tokio::test]
    async fn suffix_is_appended() {
        let sink = Arc::new(RecordingSink::ok("123"));
        let job = PostJob::new(
            Arc::new(ScriptedSource::text(
                "Use early returns to reduce nesting. #CodingTips",
            )),
            sink.clone(),
        );

        let outcome = job.run_once().await.unwrap();

        assert_eq!(
            outcome,
            Outcome::Posted {
                id: Some("123".into())
            }
        );
        assert_eq!(
            sink.published.lock().unwrap().as_slice(),
            ["Use early returns to reduce nesting. #CodingTips - AI Generated"]
        );
    }

    #[tokio::test]
    async fn custom_suffix() {
        let sink = Arc::new(RecordingSink::ok("1"));
        let job = PostJob::new(Arc::new(ScriptedSource::text("tip")), sink.clone())
            .with_suffix(" #bot");
        job.run_once().await.unwrap();
        assert_eq!(sink.published.lock().unwrap()[0], "tip #bot");
    }

    #[tokio::test]
    async fn source_failure_skips_publish() {
        let sink = Arc::new(RecordingSink::ok("1"));
        let job = PostJob::new(
            Arc::new(ScriptedSource::new(vec![Err(Error::Network("down".into()))])),
            sink.clone(),
        );
        let err = job.run_once().await.unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(sink.count(), 0);
    }
}
