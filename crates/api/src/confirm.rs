//! Two-Step Confirmation Tokens
//!
//! Destructive requests must quote a token issued by a separate request.
//! Tokens are single-use and expire.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::ApiError;

/// How long an issued token stays valid
pub const CONFIRMATION_TTL: Duration = Duration::from_secs(60);

/// Issued, unconsumed tokens
pub struct ConfirmationTokens {
    ttl: Duration,
    pending: Mutex<HashMap<String, Instant>>,
}

impl ConfirmationTokens {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            pending: Mutex::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Instant>> {
        self.pending.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Issue a new token
    pub fn issue(&self) -> String {
        let now = Instant::now();
        let token = Uuid::new_v4().to_string();

        let mut pending = self.lock();
        pending.retain(|_, expires| *expires > now);
        pending.insert(token.clone(), now + self.ttl);
        debug!("Issued confirmation token ({} pending)", pending.len());
        token
    }

    /// Consume a token; fails if it is unknown, already used, or expired
    pub fn consume(&self, token: Option<&str>) -> Result<(), ApiError> {
        let Some(token) = token.filter(|t| !t.is_empty()) else {
            return Err(ApiError::Confirmation("missing confirmation token".to_string()));
        };

        match self.lock().remove(token) {
            Some(expires) if Instant::now() < expires => Ok(()),
            Some(_) => {
                warn!("Rejected expired confirmation token");
                Err(ApiError::Confirmation("confirmation token expired".to_string()))
            }
            None => {
                warn!("Rejected unknown confirmation token");
                Err(ApiError::Confirmation("unknown confirmation token".to_string()))
            }
        }
    }
}

impl Default for ConfirmationTokens {
    fn default() -> Self {
        Self::new(CONFIRMATION_TTL)
    }
}
