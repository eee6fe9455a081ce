//! In-process notification bus for instrumented request records.

use serde::Serialize;
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::debug;

#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    pub name: String,
    pub payload: Value,
}

#[derive(Debug, Clone)]
pub struct Notifications {
    tx: broadcast::Sender<Notification>,
}

impl Notifications {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Publish `payload` under `name`. Returns how many subscribers received
    /// it; having none is not an error.
    pub fn instrument(&self, name: &str, payload: Value) -> usize {
        let notification = Notification {
            name: name.to_string(),
            payload,
        };

        match self.tx.send(notification) {
            Ok(receivers) => receivers,
            Err(_) => {
                debug!(name, "No active notification subscribers");
                0
            }
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.tx.subscribe()
    }
}

impl Default for Notifications {
    fn default() -> Self {
        Self::new(256)
    }
}
