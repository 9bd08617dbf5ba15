//! Transport Seam
//!
//! The prediction core only needs two things from the pub/sub transport:
//! whether it is connected, and a fire-and-forget `publish`. Inbound
//! traffic arrives separately as [`TransportEvent`]s on a channel.

use crate::network::protocol::{Achievement, ActionMessage, WorldSnapshot};

/// Transport errors. Callers in the core drop the action and move on.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Not connected right now.
    #[error("Transport not connected")]
    NotConnected,

    /// Outbound queue full; the action was dropped.
    #[error("Outbound queue full")]
    QueueFull,

    /// Connection task has shut down.
    #[error("Transport closed")]
    Closed,

    /// Payload could not be serialized.
    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Outbound side of the pub/sub transport.
pub trait Transport {
    /// Currently connected to the broker.
    fn is_connected(&self) -> bool;

    /// Publish an action to a destination. Must not block.
    fn publish(&mut self, destination: &str, message: &ActionMessage) -> Result<(), TransportError>;
}

/// Inbound traffic and lifecycle notifications, delivered in arrival order.
#[derive(Debug, Clone)]
pub enum TransportEvent {
    /// Broker session established.
    Connected,
    /// Socket dropped or broker reported an error.
    Disconnected {
        /// Human-readable cause.
        reason: String,
    },
    /// World snapshot from the game-state topic.
    Snapshot(WorldSnapshot),
    /// Achievement notification.
    Achievement {
        /// Decoded record.
        achievement: Achievement,
        /// Arrived on the per-user queue.
        personal: bool,
    },
}

/// In-memory transport that records everything it publishes.
///
/// Used by tests and the offline demo.
#[derive(Debug, Default)]
pub struct RecordingTransport {
    connected: bool,
    published: Vec<(String, ActionMessage)>,
}

impl RecordingTransport {
    /// Create a connected recorder.
    pub fn connected() -> Self {
        Self {
            connected: true,
            published: Vec::new(),
        }
    }

    /// Create a disconnected recorder.
    pub fn disconnected() -> Self {
        Self::default()
    }

    /// Flip the connection flag.
    pub fn set_connected(&mut self, connected: bool) {
        self.connected = connected;
    }

    /// Everything published so far, with destinations.
    pub fn published(&self) -> &[(String, ActionMessage)] {
        &self.published
    }

    /// Published messages only.
    pub fn messages(&self) -> impl Iterator<Item = &ActionMessage> {
        self.published.iter().map(|(_, m)| m)
    }

    /// Drain the record.
    pub fn take(&mut self) -> Vec<(String, ActionMessage)> {
        std::mem::take(&mut self.published)
    }
}

impl Transport for RecordingTransport {
    fn is_connected(&self) -> bool {
        self.connected
    }

    fn publish(&mut self, destination: &str, message: &ActionMessage) -> Result<(), TransportError> {
        if !self.connected {
            return Err(TransportError::NotConnected);
        }
        self.published.push((destination.to_string(), message.clone()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::protocol::{NoData, PlayerAction};

    fn shoot() -> ActionMessage {
        ActionMessage {
            action: PlayerAction::Shoot(NoData {}),
            player_id: "p".to_string(),
            timestamp: 0,
        }
    }

    #[test]
    fn test_recording_transport_drops_when_disconnected() {
        let mut transport = RecordingTransport::disconnected();
        assert!(matches!(
            transport.publish("/app/game/action", &shoot()),
            Err(TransportError::NotConnected)
        ));
        assert!(transport.published().is_empty());

        transport.set_connected(true);
        transport.publish("/app/game/action", &shoot()).unwrap();
        assert_eq!(transport.published().len(), 1);
        assert_eq!(transport.published()[0].0, "/app/game/action");

        assert_eq!(transport.take().len(), 1);
        assert_eq!(transport.messages().count(), 0);
    }
}
