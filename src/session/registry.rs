//! Explicit registry of running sessions, owned by the hosting service.
//!
//! Each session sits behind an async mutex so moves are applied one at a
//! time. Responses to player requests bypass that mutex and go straight to
//! the session's broker, since the move waiting for them holds the lock.
//! Reconnects read the session's journal for the same reason.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::Mutex as AsyncMutex;

use super::engine::Session;
use super::journal::Journal;
use super::moves::MoveOutcome;
use super::variant::Variant;
use crate::core::{MoveError, PlayerId, SessionError, StoreError};
use crate::protocol::{RequestBroker, Transport};

const LOG_TARGET: &str = "session::registry";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomStatus {
    Waiting,
    InProgress,
    Finished,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerStatus {
    Playing,
    Won,
    Lost,
    Left,
}

/// Room and roster records kept by the hosting service.
#[async_trait]
pub trait RoomStore: Send + Sync {
    async fn set_room_status(&self, room: &str, status: RoomStatus) -> Result<(), StoreError>;

    async fn set_player_status(&self, room: &str, player: PlayerId, status: PlayerStatus) -> Result<(), StoreError>;
}

/// In-memory `RoomStore`.
#[derive(Debug, Default)]
pub struct MemoryRoomStore {
    rooms: Mutex<FxHashMap<String, RoomStatus>>,
    players: Mutex<FxHashMap<(String, PlayerId), PlayerStatus>>,
}

impl MemoryRoomStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn room_status(&self, room: &str) -> Option<RoomStatus> {
        self.rooms.lock().get(room).copied()
    }

    #[must_use]
    pub fn player_status(&self, room: &str, player: PlayerId) -> Option<PlayerStatus> {
        self.players.lock().get(&(room.to_string(), player)).copied()
    }
}

#[async_trait]
impl RoomStore for MemoryRoomStore {
    async fn set_room_status(&self, room: &str, status: RoomStatus) -> Result<(), StoreError> {
        self.rooms.lock().insert(room.to_string(), status);
        Ok(())
    }

    async fn set_player_status(&self, room: &str, player: PlayerId, status: PlayerStatus) -> Result<(), StoreError> {
        self.players.lock().insert((room.to_string(), player), status);
        Ok(())
    }
}

/// A registered session with the parts reachable while it is locked.
pub struct SessionHandle<V: Variant> {
    pub session: Arc<AsyncMutex<Session<V>>>,
    pub broker: Arc<RequestBroker>,
    pub journal: Arc<Journal>,
}

impl<V: Variant> Clone for SessionHandle<V> {
    fn clone(&self) -> Self {
        Self {
            session: Arc::clone(&self.session),
            broker: Arc::clone(&self.broker),
            journal: Arc::clone(&self.journal),
        }
    }
}

pub struct SessionRegistry<V: Variant> {
    sessions: RwLock<FxHashMap<String, SessionHandle<V>>>,
    store: Arc<dyn RoomStore>,
    transport: Arc<dyn Transport>,
}

impl<V: Variant> SessionRegistry<V> {
    pub fn new(store: Arc<dyn RoomStore>, transport: Arc<dyn Transport>) -> Self {
        Self {
            sessions: RwLock::new(FxHashMap::default()),
            store,
            transport,
        }
    }

    /// Create, register and initialize the session of a room that just
    /// went in progress.
    pub async fn start(
        &self,
        room_id: &str,
        players: Vec<PlayerId>,
        settings: &Value,
        seed: u64,
    ) -> Result<SessionHandle<V>, SessionError> {
        if self.sessions.read().contains_key(room_id) {
            return Err(SessionError::RoomExists(room_id.to_string()));
        }
        let session = Session::<V>::from_room(room_id, players.clone(), settings, seed, Arc::clone(&self.transport))?;
        let handle = self.insert(room_id, session)?;

        self.store.set_room_status(room_id, RoomStatus::InProgress).await?;
        for &player in &players {
            self.store.set_player_status(room_id, player, PlayerStatus::Playing).await?;
        }
        handle.session.lock().await.initialize().await?;
        Ok(handle)
    }

    /// Register a session restored from a snapshot.
    pub fn adopt(&self, session: Session<V>) -> Result<SessionHandle<V>, SessionError> {
        let room_id = session.room_id().to_string();
        self.insert(&room_id, session)
    }

    fn insert(&self, room_id: &str, session: Session<V>) -> Result<SessionHandle<V>, SessionError> {
        let handle = SessionHandle {
            broker: session.broker(),
            journal: session.journal(),
            session: Arc::new(AsyncMutex::new(session)),
        };
        let mut sessions = self.sessions.write();
        if sessions.contains_key(room_id) {
            return Err(SessionError::RoomExists(room_id.to_string()));
        }
        sessions.insert(room_id.to_string(), handle.clone());
        tracing::debug!(target: LOG_TARGET, room = room_id, "session registered");
        Ok(handle)
    }

    #[must_use]
    pub fn get(&self, room_id: &str) -> Option<SessionHandle<V>> {
        self.sessions.read().get(room_id).cloned()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }

    /// Route a move to its room. Finished games update the room store.
    pub async fn submit_move(
        &self,
        room_id: &str,
        player: PlayerId,
        action: &str,
        payload: Value,
    ) -> Result<Result<MoveOutcome, MoveError>, SessionError> {
        let handle = self
            .get(room_id)
            .ok_or_else(|| SessionError::RoomNotFound(room_id.to_string()))?;
        let mut session = handle.session.lock().await;
        let was_over = session.is_over();
        let result = session.process_move(player, action, payload).await;
        if !was_over && session.is_over() {
            self.record_result(&session).await?;
        }
        Ok(result)
    }

    /// Deliver a correlated response without waiting for the session lock.
    pub fn respond(&self, room_id: &str, player: PlayerId, response: Value) -> Result<(), SessionError> {
        let handle = self
            .get(room_id)
            .ok_or_else(|| SessionError::RoomNotFound(room_id.to_string()))?;
        handle.broker.resolve(player, response)?;
        Ok(())
    }

    /// Bring a reconnecting player up to date.
    ///
    /// While a move is suspended on player requests the session stays
    /// locked; the player then gets the journal's history, the outstanding
    /// requests and the last state pushed to them.
    pub async fn reconnect(&self, room_id: &str, player: PlayerId) -> Result<(), SessionError> {
        let handle = self
            .get(room_id)
            .ok_or_else(|| SessionError::RoomNotFound(room_id.to_string()))?;
        if let Ok(session) = handle.session.try_lock() {
            session.reconnect(player).await;
            return Ok(());
        }
        tracing::debug!(target: LOG_TARGET, room = room_id, %player, "replaying journal for reconnect");
        let messages = handle
            .journal
            .events()
            .into_iter()
            .chain(handle.broker.replay(player))
            .chain(handle.journal.state(player));
        for message in messages {
            if let Err(err) = self.transport.send(player, message).await {
                tracing::warn!(target: LOG_TARGET, room = room_id, %player, error = %err, "replay failed");
            }
        }
        Ok(())
    }

    /// Unregister and tear down a room's session.
    pub async fn remove(&self, room_id: &str) -> Result<(), SessionError> {
        let handle = self
            .sessions
            .write()
            .remove(room_id)
            .ok_or_else(|| SessionError::RoomNotFound(room_id.to_string()))?;
        handle.broker.invalidate_all();
        let mut session = handle.session.lock().await;
        session.teardown();
        if !session.is_over() {
            self.store.set_room_status(room_id, RoomStatus::Finished).await?;
        }
        tracing::info!(target: LOG_TARGET, room = room_id, "session removed");
        Ok(())
    }

    async fn record_result(&self, session: &Session<V>) -> Result<(), SessionError> {
        let room_id = session.room_id();
        let stats = session.get_game_stats()?;
        self.store.set_room_status(room_id, RoomStatus::Finished).await?;
        for line in &stats.players {
            let status = if Some(line.player) == stats.winner {
                PlayerStatus::Won
            } else {
                PlayerStatus::Lost
            };
            self.store.set_player_status(room_id, line.player, status).await?;
        }
        Ok(())
    }
}
