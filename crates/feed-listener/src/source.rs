//! Remote Feed Boundary

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;

use crate::FeedError;

/// A push source of raw key-value payloads organised in named channels
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &str;

    /// Subscribe to one channel
    async fn subscribe(&self, channel: &str) -> Result<RawSubscription, FeedError>;
}

/// Synchronous cancel hook for one subscription
pub struct Canceller(Option<Box<dyn FnOnce() + Send>>);

impl Canceller {
    pub fn new<F>(cancel: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self(Some(Box::new(cancel)))
    }

    /// Detach from the source; no-op after the first call
    pub fn cancel(&mut self) {
        if let Some(cancel) = self.0.take() {
            cancel();
        }
    }
}

/// Live subscription: the payload stream plus its cancel hook
pub struct RawSubscription {
    pub channel: String,
    pub payloads: mpsc::UnboundedReceiver<Value>,
    pub canceller: Canceller,
}

impl RawSubscription {
    pub fn new(channel: impl Into<String>, payloads: mpsc::UnboundedReceiver<Value>, canceller: Canceller) -> Self {
        Self {
            channel: channel.into(),
            payloads,
            canceller,
        }
    }
}
