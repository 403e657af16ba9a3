//! Feed Listener
//!
//! Subscribes to the configured channels, normalizes every payload into a
//! [`Reading`] and hands it to a single callback. Split-channel feeds merge
//! each partial update into the last known reading and deliver once every
//! channel has reported since the previous delivery, so one physical reading
//! yields one callback.

use chrono::Utc;
use sensor_model::{Reading, SensorField};
use serde_json::Value;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::normalize::{extract_partial, normalize_composite, normalize_field};
use crate::source::{Canceller, FeedSource};
use crate::FeedError;

/// How the remote feed lays out sensor values
#[derive(Debug, Clone, PartialEq)]
pub enum FeedShape {
    /// One channel carrying an object with every field
    Composite { channel: String },
    /// One channel per field, each carrying a bare value
    Split { channels: Vec<(String, SensorField)> },
}

impl FeedShape {
    pub fn composite(channel: impl Into<String>) -> Self {
        Self::Composite {
            channel: channel.into(),
        }
    }

    pub fn split<I, S>(channels: I) -> Self
    where
        I: IntoIterator<Item = (S, SensorField)>,
        S: Into<String>,
    {
        Self::Split {
            channels: channels.into_iter().map(|(c, f)| (c.into(), f)).collect(),
        }
    }
}

type Callback = Box<dyn FnMut(Reading) + Send>;

/// Delivery gate shared by the pumps and the handle
///
/// Callbacks run with the gate held, so once `callback` is cleared no
/// further delivery can start or be in progress.
struct Gate {
    callback: Option<Callback>,
    current: Reading,
    /// Split channels heard from since the last delivery, by slot
    reported: Vec<bool>,
}

fn lock(gate: &Mutex<Gate>) -> MutexGuard<'_, Gate> {
    gate.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl Gate {
    /// Mark a split slot as reported; true once every slot has reported
    fn report(&mut self, slot: usize) -> bool {
        self.reported[slot] = true;
        if self.reported.iter().all(|r| *r) {
            self.reported.fill(false);
            true
        } else {
            false
        }
    }

    fn deliver(&mut self) -> bool {
        match self.callback.as_mut() {
            Some(callback) => {
                callback(self.current.clone());
                true
            }
            None => false,
        }
    }
}

/// What a pump does with each payload on its channel
#[derive(Debug, Clone, Copy)]
enum Route {
    Composite,
    Field { field: SensorField, slot: usize },
}

/// Listener for one feed layout
pub struct FeedListener {
    shape: FeedShape,
}

impl FeedListener {
    pub fn new(shape: FeedShape) -> Result<Self, FeedError> {
        match &shape {
            FeedShape::Composite { channel } if channel.is_empty() => {
                return Err(FeedError::Config("composite channel name is empty".to_string()));
            }
            FeedShape::Split { channels } if channels.is_empty() => {
                return Err(FeedError::Config("split feed has no channels".to_string()));
            }
            _ => {}
        }
        Ok(Self { shape })
    }

    pub fn shape(&self) -> &FeedShape {
        &self.shape
    }

    /// Subscribe and start delivering readings to `callback`
    ///
    /// If any channel fails to subscribe, the channels already subscribed
    /// are cancelled and the error is returned.
    pub async fn start<F>(&self, source: &dyn FeedSource, callback: F) -> Result<FeedHandle, FeedError>
    where
        F: FnMut(Reading) + Send + 'static,
    {
        let routes: Vec<(String, Route)> = match &self.shape {
            FeedShape::Composite { channel } => vec![(channel.clone(), Route::Composite)],
            FeedShape::Split { channels } => channels
                .iter()
                .enumerate()
                .map(|(slot, (channel, field))| (channel.clone(), Route::Field { field: *field, slot }))
                .collect(),
        };
        let slots = match &self.shape {
            FeedShape::Composite { .. } => 0,
            FeedShape::Split { channels } => channels.len(),
        };

        let gate = Arc::new(Mutex::new(Gate {
            callback: Some(Box::new(callback)),
            current: Reading::unavailable(Utc::now()),
            reported: vec![false; slots],
        }));
        let mut handle = FeedHandle {
            gate: gate.clone(),
            cancellers: Vec::with_capacity(routes.len()),
            pumps: Vec::with_capacity(routes.len()),
        };

        for (channel, route) in routes {
            // On error `handle` is dropped, which cancels what was subscribed so far
            let subscription = source.subscribe(&channel).await?;
            handle.cancellers.push(subscription.canceller);
            handle.pumps.push(tokio::spawn(pump(
                gate.clone(),
                subscription.channel,
                route,
                subscription.payloads,
            )));
        }

        info!("Listening to {} feed: {:?}", source.name(), self.shape);
        Ok(handle)
    }
}

async fn pump(gate: Arc<Mutex<Gate>>, channel: String, route: Route, mut payloads: mpsc::UnboundedReceiver<Value>) {
    while let Some(payload) = payloads.recv().await {
        let mut open = lock(&gate);
        if open.callback.is_none() {
            break;
        }

        let now = Utc::now();
        match route {
            Route::Composite => match normalize_composite(&channel, &payload, now) {
                Ok(Some(reading)) => open.current = reading,
                Ok(None) => {
                    debug!("Channel '{}' holds no data yet", channel);
                    continue;
                }
                Err(e) => {
                    warn!("{}", e);
                    open.current = Reading::unavailable(now);
                }
            },
            Route::Field { field, slot } => {
                let value = normalize_field(field, extract_partial(field, &payload));
                open.current.merge_field(field, value, now);
                if !open.report(slot) {
                    continue;
                }
            }
        }

        if !open.deliver() {
            break;
        }
    }
    debug!("Pump for channel '{}' stopped", channel);
}

/// Active subscription set; dropping it also unsubscribes
pub struct FeedHandle {
    gate: Arc<Mutex<Gate>>,
    cancellers: Vec<Canceller>,
    pumps: Vec<JoinHandle<()>>,
}

impl FeedHandle {
    /// Stop delivery; no callback runs after this returns
    pub fn unsubscribe(mut self) {
        self.shutdown();
    }

    pub fn is_active(&self) -> bool {
        lock(&self.gate).callback.is_some()
    }

    fn shutdown(&mut self) {
        // Waits for an in-progress callback to finish
        let callback = lock(&self.gate).callback.take();
        drop(callback);

        for canceller in &mut self.cancellers {
            canceller.cancel();
        }
        for pump in self.pumps.drain(..) {
            pump.abort();
        }
    }
}

impl Drop for FeedHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}
