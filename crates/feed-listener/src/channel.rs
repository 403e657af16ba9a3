//! In-Process Push Source

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc;
use tracing::debug;

use crate::source::{Canceller, FeedSource, RawSubscription};
use crate::FeedError;

#[derive(Default)]
struct Hub {
    subscribers: HashMap<String, Vec<(u64, mpsc::UnboundedSender<Value>)>>,
    last: HashMap<String, Value>,
    next_id: u64,
}

/// In-process feed hub
///
/// Behaves like a realtime database node: each channel remembers its last
/// payload and replays it to new subscribers. Clones share the same hub.
#[derive(Clone, Default)]
pub struct ChannelFeed {
    hub: Arc<Mutex<Hub>>,
}

impl ChannelFeed {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Hub> {
        self.hub.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Push a payload to every subscriber of `channel`; returns how many were reached
    pub fn publish(&self, channel: &str, payload: Value) -> usize {
        let mut hub = self.lock();
        hub.last.insert(channel.to_string(), payload.clone());

        let Some(subscribers) = hub.subscribers.get_mut(channel) else {
            return 0;
        };
        subscribers.retain(|(_, tx)| tx.send(payload.clone()).is_ok());
        subscribers.len()
    }

    /// Number of live subscriptions on `channel`
    pub fn subscriber_count(&self, channel: &str) -> usize {
        self.lock().subscribers.get(channel).map_or(0, Vec::len)
    }
}

#[async_trait]
impl FeedSource for ChannelFeed {
    fn name(&self) -> &str {
        "channel"
    }

    async fn subscribe(&self, channel: &str) -> Result<RawSubscription, FeedError> {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = {
            let mut hub = self.lock();
            if let Some(last) = hub.last.get(channel) {
                let _ = tx.send(last.clone());
            }
            hub.next_id += 1;
            let id = hub.next_id;
            hub.subscribers
                .entry(channel.to_string())
                .or_default()
                .push((id, tx));
            id
        };
        debug!("Subscriber {} attached to channel '{}'", id, channel);

        let hub = self.clone();
        let name = channel.to_string();
        let canceller = Canceller::new(move || {
            let mut inner = hub.lock();
            if let Some(subscribers) = inner.subscribers.get_mut(&name) {
                subscribers.retain(|(sub_id, _)| *sub_id != id);
            }
            debug!("Subscriber {} detached from channel '{}'", id, name);
        });

        Ok(RawSubscription::new(channel, rx, canceller))
    }
}
