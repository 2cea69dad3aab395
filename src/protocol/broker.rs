//! Correlated request/response with a deadline.
//!
//! `ask` sends a player a request envelope
//! `{type, request_id, expires_at, ...payload}` and suspends until either a
//! response carrying the same `request_id` comes back through `resolve`, or
//! the deadline passes. Whichever happens first wins; the other is dropped.
//! The caller decides what a missing answer means (usually a uniform random
//! pick, see [`selection`](super::selection)).
//!
//! At most one request per (player, kind) is outstanding. Asking again
//! supersedes the old request, whose waiter resumes with
//! [`Reply::Cancelled`].

use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde_json::{Map, Value};
use tokio::sync::oneshot;
use uuid::Uuid;

use super::transport::Transport;
use crate::core::{PlayerId, ProtocolError};

const LOG_TARGET: &str = "protocol::broker";

/// Outcome of a request.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// The player responded in time.
    Answered(Value),
    /// The deadline passed.
    TimedOut,
    /// The request was superseded or the session is shutting down.
    Cancelled,
}

impl Reply {
    #[must_use]
    pub fn answer(&self) -> Option<&Value> {
        match self {
            Reply::Answered(value) => Some(value),
            Reply::TimedOut | Reply::Cancelled => None,
        }
    }

    #[must_use]
    pub fn is_answered(&self) -> bool {
        matches!(self, Reply::Answered(_))
    }
}

struct PendingRequest {
    player: PlayerId,
    kind: String,
    expires_at: DateTime<Utc>,
    envelope: Value,
    slot: oneshot::Sender<Value>,
}

/// Table of outstanding requests for one session.
#[derive(Default)]
pub struct RequestBroker {
    pending: Mutex<FxHashMap<Uuid, PendingRequest>>,
}

impl std::fmt::Debug for RequestBroker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestBroker")
            .field("outstanding", &self.outstanding())
            .finish()
    }
}

impl RequestBroker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask `player` for a decision and wait at most `timeout` for it.
    pub async fn ask(
        &self,
        transport: &dyn Transport,
        player: PlayerId,
        kind: &str,
        payload: Value,
        timeout: Duration,
    ) -> Reply {
        let request_id = Uuid::new_v4();
        let expires_at = Utc::now()
            + chrono::Duration::from_std(timeout).unwrap_or_else(|_| chrono::Duration::zero());
        let envelope = envelope(kind, request_id, expires_at, payload);
        let (tx, rx) = oneshot::channel();

        {
            let mut pending = self.pending.lock();
            let before = pending.len();
            pending.retain(|_, req| !(req.player == player && req.kind == kind));
            if pending.len() != before {
                tracing::debug!(target: LOG_TARGET, %player, kind, "superseding outstanding request");
            }
            pending.insert(
                request_id,
                PendingRequest {
                    player,
                    kind: kind.to_string(),
                    expires_at,
                    envelope: envelope.clone(),
                    slot: tx,
                },
            );
        }

        if let Err(err) = transport.send(player, envelope).await {
            tracing::warn!(target: LOG_TARGET, %player, kind, error = %err, "failed to deliver request");
        }

        let reply = match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(value)) => Reply::Answered(value),
            Ok(Err(_)) => Reply::Cancelled,
            Err(_) => {
                tracing::debug!(target: LOG_TARGET, %player, kind, %request_id, "request timed out");
                Reply::TimedOut
            }
        };
        self.pending.lock().remove(&request_id);
        reply
    }

    /// Deliver an inbound response to the waiting request.
    pub fn resolve(&self, player: PlayerId, response: Value) -> Result<(), ProtocolError> {
        let raw_id = response
            .get("request_id")
            .and_then(Value::as_str)
            .ok_or(ProtocolError::MissingRequestId)?
            .to_string();
        let request_id =
            Uuid::parse_str(&raw_id).map_err(|_| ProtocolError::UnknownRequest(raw_id.clone()))?;

        let request = {
            let mut pending = self.pending.lock();
            match pending.get(&request_id) {
                Some(req) if req.player == player => pending.remove(&request_id),
                _ => None,
            }
        }
        .ok_or_else(|| ProtocolError::UnknownRequest(raw_id.clone()))?;

        request
            .slot
            .send(response)
            .map_err(|_| ProtocolError::UnknownRequest(raw_id))
    }

    /// Envelopes of every request still waiting on `player`, oldest first.
    #[must_use]
    pub fn replay(&self, player: PlayerId) -> Vec<Value> {
        let pending = self.pending.lock();
        let mut requests: Vec<_> = pending.values().filter(|r| r.player == player).collect();
        requests.sort_by_key(|r| r.expires_at);
        requests.into_iter().map(|r| r.envelope.clone()).collect()
    }

    #[must_use]
    pub fn outstanding(&self) -> usize {
        self.pending.lock().len()
    }

    /// Drop every outstanding request. Waiters resume with `Reply::Cancelled`.
    pub fn invalidate_all(&self) {
        let dropped = {
            let mut pending = self.pending.lock();
            let count = pending.len();
            pending.clear();
            count
        };
        if dropped > 0 {
            tracing::info!(target: LOG_TARGET, dropped, "invalidated outstanding requests");
        }
    }
}

fn envelope(kind: &str, request_id: Uuid, expires_at: DateTime<Utc>, payload: Value) -> Value {
    let mut body = match payload {
        Value::Object(map) => map,
        Value::Null => Map::new(),
        other => {
            let mut map = Map::new();
            map.insert("payload".into(), other);
            map
        }
    };
    body.insert("type".into(), Value::String(kind.to_string()));
    body.insert("request_id".into(), Value::String(request_id.to_string()));
    body.insert("expires_at".into(), Value::String(expires_at.to_rfc3339()));
    Value::Object(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::transport::RecordingTransport;
    use serde_json::json;

    fn last_request_id(transport: &RecordingTransport) -> String {
        transport
            .messages()
            .last()
            .and_then(|m| m.message().get("request_id").and_then(Value::as_str).map(String::from))
            .unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_resumes_at_deadline() {
        let broker = RequestBroker::new();
        let transport = RecordingTransport::new();
        let start = tokio::time::Instant::now();

        let reply = broker
            .ask(&transport, PlayerId(1), "discard_selection", json!({ "count": 1 }), Duration::from_secs(30))
            .await;

        assert_eq!(reply, Reply::TimedOut);
        assert_eq!(start.elapsed(), Duration::from_secs(30));
        assert_eq!(broker.outstanding(), 0);

        let sent = transport.sent_to(PlayerId(1), "discard_selection");
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0]["count"], 1);
        assert!(sent[0]["expires_at"].is_string());
    }

    #[tokio::test(start_paused = true)]
    async fn test_answer_resolves_waiter() {
        let broker = RequestBroker::new();
        let transport = RecordingTransport::new();

        let (reply, resolved) = tokio::join!(
            broker.ask(&transport, PlayerId(1), "recipe_selection", json!({}), Duration::from_secs(30)),
            async {
                tokio::task::yield_now().await;
                let id = last_request_id(&transport);
                broker.resolve(PlayerId(1), json!({ "request_id": id, "recipe_id": "r1" }))
            }
        );

        assert_eq!(resolved, Ok(()));
        assert_eq!(reply.answer().and_then(|v| v.get("recipe_id")), Some(&json!("r1")));
        assert_eq!(broker.outstanding(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wrong_player_cannot_answer() {
        let broker = RequestBroker::new();
        let transport = RecordingTransport::new();

        let (reply, resolved) = tokio::join!(
            broker.ask(&transport, PlayerId(1), "defense_request", json!({}), Duration::from_secs(5)),
            async {
                tokio::task::yield_now().await;
                let id = last_request_id(&transport);
                broker.resolve(PlayerId(2), json!({ "request_id": id, "defend": true }))
            }
        );

        assert!(matches!(resolved, Err(ProtocolError::UnknownRequest(_))));
        assert_eq!(reply, Reply::TimedOut);
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_request_of_same_kind_supersedes_first() {
        let broker = RequestBroker::new();
        let transport = RecordingTransport::new();

        let (first, second) = tokio::join!(
            broker.ask(&transport, PlayerId(1), "discard_selection", json!({}), Duration::from_secs(30)),
            async {
                tokio::task::yield_now().await;
                broker
                    .ask(&transport, PlayerId(1), "discard_selection", json!({}), Duration::from_secs(10))
                    .await
            }
        );

        assert_eq!(first, Reply::Cancelled);
        assert_eq!(second, Reply::TimedOut);
    }

    #[tokio::test(start_paused = true)]
    async fn test_replay_and_invalidate() {
        let broker = RequestBroker::new();
        let transport = RecordingTransport::new();

        let (reply, replayed) = tokio::join!(
            broker.ask(&transport, PlayerId(3), "top_cards_selection", json!({ "count": 2 }), Duration::from_secs(30)),
            async {
                tokio::task::yield_now().await;
                let replayed = broker.replay(PlayerId(3));
                assert!(broker.replay(PlayerId(4)).is_empty());
                broker.invalidate_all();
                replayed
            }
        );

        assert_eq!(reply, Reply::Cancelled);
        assert_eq!(replayed.len(), 1);
        assert_eq!(replayed[0]["type"], "top_cards_selection");
        assert_eq!(broker.outstanding(), 0);
    }

    #[test]
    fn test_resolve_rejects_malformed_responses() {
        let broker = RequestBroker::new();

        assert_eq!(
            broker.resolve(PlayerId(1), json!({ "defend": true })),
            Err(ProtocolError::MissingRequestId)
        );
        assert!(matches!(
            broker.resolve(PlayerId(1), json!({ "request_id": "nope" })),
            Err(ProtocolError::UnknownRequest(_))
        ));
        assert!(matches!(
            broker.resolve(PlayerId(1), json!({ "request_id": Uuid::new_v4().to_string() })),
            Err(ProtocolError::UnknownRequest(_))
        ));
    }

    #[test]
    fn test_envelope_wraps_scalar_payloads() {
        let id = Uuid::new_v4();
        let env = envelope("ping", id, Utc::now(), json!(5));
        assert_eq!(env["payload"], 5);
        assert_eq!(env["type"], "ping");
        assert_eq!(env["request_id"], id.to_string());
    }
}
