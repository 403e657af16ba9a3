//! Feed Error Types

use thiserror::Error;

/// Errors that can occur while listening to the remote feed
#[derive(Debug, Clone, Error)]
pub enum FeedError {
    /// Subscribing to a channel failed
    #[error("Failed to subscribe to channel '{channel}': {reason}")]
    Subscribe { channel: String, reason: String },

    /// Connection to the remote source failed
    #[error("Feed connection error: {0}")]
    Connection(String),

    /// Payload could not be interpreted; its fields degrade to unavailable
    #[error("Malformed payload on channel '{channel}': {reason}")]
    MalformedPayload { channel: String, reason: String },

    /// Invalid listener configuration
    #[error("Invalid feed configuration: {0}")]
    Config(String),
}
