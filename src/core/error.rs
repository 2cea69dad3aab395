//! Error types.
//!
//! None of these are fatal to a session. A `MoveError` is reported to the
//! acting player only and leaves the session untouched. A `TransportError`
//! is logged and the move carries on. Request timeouts are not errors at
//! all: they resolve through the fallback selection.

use crate::core::player::PlayerId;

/// Why a move was rejected. Rejection never mutates the session.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MoveError {
    #[error("player is not seated in this room")]
    UnknownPlayer,
    #[error("game has not started")]
    NotStarted,
    #[error("not your turn")]
    NotYourTurn,
    #[error("game is already over")]
    GameOver,
    #[error("unknown action `{0}`")]
    UnknownAction(String),
    #[error("action `{action}` is not allowed while {state}")]
    IllegalInState { action: String, state: String },
    #[error("target player has finished and cannot be targeted")]
    FrozenTarget,
    #[error("{0}")]
    Invalid(String),
}

impl MoveError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::Invalid(msg.into())
    }
}

/// Failure to deliver a message. Logged, never propagated into game logic.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("{0} is not connected")]
    Disconnected(PlayerId),
    #[error("transport closed")]
    Closed,
    #[error("transport error: {0}")]
    Other(String),
}

/// Problems with an inbound correlated response.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    #[error("response carries no request_id")]
    MissingRequestId,
    #[error("no outstanding request {0} for this player")]
    UnknownRequest(String),
}

/// Failures of the room store boundary.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("room {0} not found")]
    NotFound(String),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Session lifecycle failures.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("session has not been initialized")]
    NotStarted,
    #[error("game is not over yet")]
    NotFinished,
    #[error("snapshot error: {0}")]
    Snapshot(String),
    #[error("room store error: {0}")]
    Store(#[from] StoreError),
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
    #[error("room {0} has no running session")]
    RoomNotFound(String),
    #[error("room {0} already has a running session")]
    RoomExists(String),
}

impl SessionError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn snapshot(msg: impl Into<String>) -> Self {
        Self::Snapshot(msg.into())
    }
}

impl From<serde_json::Error> for SessionError {
    fn from(err: serde_json::Error) -> Self {
        Self::Snapshot(err.to_string())
    }
}

impl From<bincode::Error> for SessionError {
    fn from(err: bincode::Error) -> Self {
        Self::Snapshot(err.to_string())
    }
}
