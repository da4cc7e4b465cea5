//! Destination for generated messages

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use publisher::{PostedMessage, Publisher};
use twitter_auth::Session;

use crate::error::{Error, Result};

/// Publishes one message.
pub trait MessageSink: Send + Sync {
    fn publish<'a>(
        &'a self,
        text: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<PostedMessage>> + Send + 'a>>;
}

/// Sink that publishes through `Publisher` with the session's current token.
pub struct PublisherSink {
    publisher: Arc<Publisher>,
    session: Arc<Session>,
}

impl PublisherSink {
    pub fn new(publisher: Arc<Publisher>, session: Arc<Session>) -> Self {
        Self { publisher, session }
    }
}

impl MessageSink for PublisherSink {
    fn publish<'a>(
        &'a self,
        text: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<PostedMessage>> + Send + 'a>> {
        Box::pin(async move {
            let token = self.session.current().await?.ok_or_else(|| {
                Error::NotAuthenticated("no stored access token, authorize first".into())
            })?;
            Ok(self.publisher.publish(text, &token).await?)
        })
    }
}
