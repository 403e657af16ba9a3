//! Sensor Feed Listener
//!
//! Subscribes to a push-based remote feed (MQTT, an in-process hub, or a
//! simulator) and turns raw payloads into [`sensor_model::Reading`]s.

mod channel;
mod error;
mod listener;
mod mqtt;
mod normalize;
mod simulated;
mod source;

pub use channel::ChannelFeed;
pub use error::FeedError;
pub use listener::{FeedHandle, FeedListener, FeedShape};
pub use mqtt::{MqttConfig, MqttFeed};
pub use normalize::{normalize_composite, normalize_field};
pub use simulated::{SimulatedFeed, DEFAULT_SIMULATION_INTERVAL};
pub use source::{Canceller, FeedSource, RawSubscription};
