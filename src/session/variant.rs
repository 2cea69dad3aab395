//! Variant strategy and the shell context handed to it.
//!
//! A `Session` is a fixed shell (turn rotation, move gating, request
//! plumbing, completion bookkeeping, snapshots) parameterized by a
//! `Variant` that owns the rules and the game-specific state. Handlers get
//! the shell as a `Table`: the roster, the turn machine, the RNG and the
//! outbound channels.
//!
//! ## Implementation Notes
//!
//! - `handle`: validate everything before mutating anything. Once a handler
//!   has mutated state it must finish successfully.
//! - `handle` returns `MoveOutcome::continues()` to keep the turn open; the
//!   turn state it entered tells the router which follow-up moves are legal.
//! - `settle`: per-move post-conditions that run before completion is
//!   checked (hand limits, staged events).
//! - `is_complete`: the win condition. The first seat to satisfy it becomes
//!   the first finisher.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::journal::Journal;
use super::moves::{MoveOutcome, MoveTable};
use super::turn::TurnMachine;
use crate::core::{GameRng, MoveError, PlayerId, PlayerMap, Roster, Seat, SessionConfig, SessionError};
use crate::protocol::{Reply, RequestBroker, Transport};

const LOG_TARGET: &str = "session::table";

/// Final position of one player.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Standing {
    pub seat: Seat,
    pub player: PlayerId,
    pub score: i32,
    /// Variant-specific score components.
    pub breakdown: Value,
}

/// Game rules plugged into a `Session`.
#[async_trait]
pub trait Variant: Clone + Send + Sync + Serialize + DeserializeOwned + 'static {
    /// Variant action enum, resolved from the wire name by the move table.
    type Action: Copy + fmt::Debug + Send + Sync + 'static;

    /// Rule settings, read from the room's settings object.
    type Settings: Default + DeserializeOwned + Send;

    /// Game identifier used in messages and stats.
    const NAME: &'static str;
    const MIN_PLAYERS: usize;
    const MAX_PLAYERS: usize;

    fn move_table() -> MoveTable<Self::Action>;

    /// Build the initial state: decks, deals, layouts.
    fn setup(settings: Self::Settings, table: &mut Table) -> Result<Self, SessionError>;

    /// Consistency check run after `setup` and after a snapshot is loaded.
    fn validate(&self) -> Result<(), SessionError> {
        Ok(())
    }

    /// Interactive part of the setup (e.g. players choosing goals).
    async fn start(&mut self, _table: &mut Table) {}

    async fn handle(
        &mut self,
        table: &mut Table,
        seat: Seat,
        action: Self::Action,
        payload: &Value,
    ) -> Result<MoveOutcome, MoveError>;

    /// Post-conditions of a turn-ending move, before completion is checked.
    async fn settle(&mut self, _table: &mut Table, _seat: Seat) {}

    fn is_complete(&self, seat: Seat) -> bool;

    /// End the game right now instead of playing out the final round.
    fn ends_immediately(&self, _table: &Table) -> bool {
        false
    }

    /// Every seat, best first.
    fn standings(&self, table: &Table) -> Vec<Standing>;

    /// Winner given `standings`; `None` for a draw.
    fn winner(&self, _table: &Table, standings: &[Standing]) -> Option<Seat> {
        standings.first().map(|s| s.seat)
    }

    /// Variant part of the state as seen by `viewer`.
    fn view(&self, table: &Table, viewer: Seat) -> Value;

    /// Move-driven prompts still waiting on `seat`, resent on reconnect.
    fn prompts(&self, _table: &Table, _seat: Seat) -> Vec<Value> {
        Vec::new()
    }

    /// Resolve anything that was waiting on a player when the snapshot was
    /// taken, as if the player had timed out.
    ///
    /// Returns true when this completed the current player's move, in which
    /// case the session runs the turn-ending post-conditions.
    async fn on_restore(&mut self, _table: &mut Table) -> bool {
        false
    }
}

/// Shell state shared with variant handlers.
pub struct Table {
    pub(crate) room_id: String,
    pub(crate) roster: Roster,
    pub(crate) config: SessionConfig,
    pub turn: TurnMachine,
    pub rng: GameRng,
    pub(crate) moves: PlayerMap<u32>,
    pub(crate) journal: Arc<Journal>,
    pub(crate) broker: Arc<RequestBroker>,
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) started_at: DateTime<Utc>,
    pub(crate) finished_at: Option<DateTime<Utc>>,
}

impl fmt::Debug for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Table")
            .field("room_id", &self.room_id)
            .field("roster", &self.roster)
            .field("turn", &self.turn)
            .field("moves", &self.moves)
            .finish_non_exhaustive()
    }
}

impl Table {
    pub fn new(
        room_id: impl Into<String>,
        roster: Roster,
        config: SessionConfig,
        seed: u64,
        transport: Arc<dyn Transport>,
    ) -> Self {
        let player_count = roster.len();
        let journal = Arc::new(Journal::new(config.event_log_limit));
        Self {
            room_id: room_id.into(),
            turn: TurnMachine::new(player_count),
            moves: PlayerMap::with_value(player_count, 0),
            roster,
            config,
            rng: GameRng::new(seed),
            journal,
            broker: Arc::new(RequestBroker::new()),
            transport,
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    #[must_use]
    pub fn room_id(&self) -> &str {
        &self.room_id
    }

    #[must_use]
    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    #[must_use]
    pub fn player_count(&self) -> usize {
        self.roster.len()
    }

    #[must_use]
    pub fn player(&self, seat: Seat) -> PlayerId {
        self.roster.player(seat)
    }

    #[must_use]
    pub fn seat_of(&self, player: PlayerId) -> Option<Seat> {
        self.roster.seat_of(player)
    }

    pub fn seats(&self) -> impl Iterator<Item = Seat> {
        self.roster.seats()
    }

    /// Accepted moves made by `seat`.
    #[must_use]
    pub fn moves(&self, seat: Seat) -> u32 {
        self.moves[seat]
    }

    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Resolve the `field` of a payload (a player id) to a seat.
    pub fn seat_in_payload(&self, payload: &Value, field: &str) -> Result<Seat, MoveError> {
        let player = payload
            .get(field)
            .and_then(Value::as_u64)
            .ok_or_else(|| MoveError::invalid(format!("{field} required")))?;
        self.seat_of(PlayerId(player))
            .ok_or_else(|| MoveError::invalid(format!("{field} is not in this room")))
    }

    /// Message one player. Delivery failures are logged.
    pub async fn send(&self, seat: Seat, message: Value) {
        self.send_to(self.player(seat), message).await;
    }

    pub(crate) async fn send_to(&self, player: PlayerId, message: Value) {
        if let Err(err) = self.transport.send(player, message).await {
            tracing::warn!(target: LOG_TARGET, room = %self.room_id, %player, error = %err, "send failed");
        }
    }

    /// Message the whole room and keep the message for reconnect replay.
    pub async fn broadcast(&mut self, message: Value) {
        self.journal.record(message.clone());
        if let Err(err) = self.transport.broadcast(&self.room_id, message).await {
            tracing::warn!(target: LOG_TARGET, room = %self.room_id, error = %err, "broadcast failed");
        }
    }

    /// Ask `seat` for a decision, waiting up to the configured timeout.
    pub async fn ask(&self, seat: Seat, kind: &str, payload: Value) -> Reply {
        self.broker
            .ask(
                self.transport.as_ref(),
                self.player(seat),
                kind,
                payload,
                self.config.request_timeout(),
            )
            .await
    }
}
