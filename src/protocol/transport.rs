//! Outbound message boundary.
//!
//! The session never talks to sockets. It hands JSON messages to a
//! `Transport`, which knows how to reach one player or every player in a
//! room. Delivery failures come back as `TransportError` and are only
//! logged by the caller.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use crate::core::{PlayerId, TransportError};

#[async_trait]
pub trait Transport: Send + Sync {
    /// Deliver one message to one player.
    async fn send(&self, player: PlayerId, message: Value) -> Result<(), TransportError>;

    /// Deliver one message to every player connected to `room`.
    async fn broadcast(&self, room: &str, message: Value) -> Result<(), TransportError>;
}

/// Where a recorded message went.
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    Direct { player: PlayerId, message: Value },
    Room { room: String, message: Value },
}

impl Outbound {
    #[must_use]
    pub fn message(&self) -> &Value {
        match self {
            Outbound::Direct { message, .. } | Outbound::Room { message, .. } => message,
        }
    }

    /// The `type` field of the message, if it has one.
    #[must_use]
    pub fn kind(&self) -> Option<&str> {
        self.message().get("type").and_then(Value::as_str)
    }
}

/// In-memory transport that records everything it is asked to deliver.
///
/// Useful for hosts that want an audit trail and for tests.
#[derive(Debug, Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<Outbound>>,
}

impl RecordingTransport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything delivered so far, in order.
    #[must_use]
    pub fn messages(&self) -> Vec<Outbound> {
        self.sent.lock().clone()
    }

    /// Messages of one `type` that reached `player` directly.
    #[must_use]
    pub fn sent_to(&self, player: PlayerId, kind: &str) -> Vec<Value> {
        self.sent
            .lock()
            .iter()
            .filter_map(|out| match out {
                Outbound::Direct { player: p, message } if *p == player => Some(message),
                _ => None,
            })
            .filter(|m| m.get("type").and_then(Value::as_str) == Some(kind))
            .cloned()
            .collect()
    }

    /// Room-wide messages of one `type`.
    #[must_use]
    pub fn broadcasts(&self, kind: &str) -> Vec<Value> {
        self.sent
            .lock()
            .iter()
            .filter_map(|out| match out {
                Outbound::Room { message, .. } => Some(message),
                Outbound::Direct { .. } => None,
            })
            .filter(|m| m.get("type").and_then(Value::as_str) == Some(kind))
            .cloned()
            .collect()
    }

    pub fn clear(&self) {
        self.sent.lock().clear();
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn send(&self, player: PlayerId, message: Value) -> Result<(), TransportError> {
        self.sent.lock().push(Outbound::Direct { player, message });
        Ok(())
    }

    async fn broadcast(&self, room: &str, message: Value) -> Result<(), TransportError> {
        self.sent.lock().push(Outbound::Room {
            room: room.to_string(),
            message,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_recording_transport_filters() {
        let transport = RecordingTransport::new();
        transport
            .send(PlayerId(1), json!({ "type": "game_state", "n": 1 }))
            .await
            .unwrap();
        transport
            .send(PlayerId(2), json!({ "type": "game_state", "n": 2 }))
            .await
            .unwrap();
        transport
            .broadcast("room", json!({ "type": "new_turn" }))
            .await
            .unwrap();

        assert_eq!(transport.messages().len(), 3);
        assert_eq!(transport.sent_to(PlayerId(1), "game_state"), vec![json!({ "type": "game_state", "n": 1 })]);
        assert_eq!(transport.broadcasts("new_turn").len(), 1);
        assert_eq!(transport.messages()[2].kind(), Some("new_turn"));

        transport.clear();
        assert!(transport.messages().is_empty());
    }
}
