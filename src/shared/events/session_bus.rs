//! Session-expiry event bus backed by a `tokio::sync::broadcast` channel.
//!
//! The HTTP client wrapper is the only producer: it publishes
//! [`SessionEvent::Expired`] whenever the backend answers 401/403. Any number
//! of consumers (a login prompt, the CLI, the import tracker's owner) can
//! subscribe independently.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    /// The backend refused the bearer credential.
    Expired {
        status: u16,
        endpoint: String,
        at: DateTime<Utc>,
    },
}

impl SessionEvent {
    pub fn expired(status: u16, endpoint: impl Into<String>) -> Self {
        SessionEvent::Expired {
            status,
            endpoint: endpoint.into(),
            at: Utc::now(),
        }
    }
}

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 16;

/// Fan-out bus for [`SessionEvent`]s. Share it as `Arc<SessionEventBus>`.
///
/// Slow receivers that fall more than `capacity` events behind observe
/// `RecvError::Lagged`; expiry is idempotent so skipping is harmless.
pub struct SessionEventBus {
    sender: broadcast::Sender<SessionEvent>,
}

impl SessionEventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publish to all current subscribers. Dropped silently when nobody listens.
    pub fn publish(&self, event: SessionEvent) {
        // SendError only means there are zero receivers.
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for SessionEventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
