//! The per-room session: move router and lifecycle.
//!
//! ```text
//! process_move(player, action, payload)
//!   ├─ gate: seated? started? not over? player's turn? known action?
//!   │        legal in the turn state? target not frozen?
//!   ├─ variant handler (may suspend on player requests)
//!   ├─ if the move ends the turn:
//!   │     settle → completion check → advance or game over
//!   └─ push a player-scoped state to everyone
//! ```
//!
//! A rejected move is reported to the caller only and changes nothing.

use std::collections::VecDeque;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};

use super::journal::Journal;
use super::moves::{MoveOutcome, MoveTable};
use super::snapshot::SessionSnapshot;
use super::turn::{TurnAdvance, TurnState};
use super::variant::{Standing, Table, Variant};
use crate::core::{GameRng, MoveError, PlayerId, PlayerMap, Roster, Seat, SessionConfig, SessionError};
use crate::protocol::{RequestBroker, Transport};

const LOG_TARGET: &str = "session::engine";

/// Per-player line of the final statistics.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PlayerStats {
    pub player: PlayerId,
    pub seat: Seat,
    pub rank: usize,
    pub score: i32,
    pub moves_made: u32,
    pub breakdown: Value,
}

/// Statistics of a finished game.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GameStats {
    pub room_id: String,
    pub game: &'static str,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_secs: i64,
    pub total_moves: u32,
    pub turns_played: u32,
    pub winner: Option<PlayerId>,
    pub first_finisher: Option<PlayerId>,
    pub players: Vec<PlayerStats>,
}

/// One running game.
pub struct Session<V: Variant> {
    table: Table,
    variant: V,
    moves: MoveTable<V::Action>,
    started: bool,
}

impl<V: Variant> std::fmt::Debug for Session<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("game", &V::NAME)
            .field("table", &self.table)
            .field("started", &self.started)
            .finish_non_exhaustive()
    }
}

impl<V: Variant> Session<V> {
    /// Create a session for `players` (in turn order).
    pub fn new(
        room_id: impl Into<String>,
        players: Vec<PlayerId>,
        settings: V::Settings,
        config: SessionConfig,
        seed: u64,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, SessionError> {
        config.validate()?;
        let roster = Roster::new(players)
            .ok_or_else(|| SessionError::config("roster must be non-empty and free of duplicates"))?;
        if !(V::MIN_PLAYERS..=V::MAX_PLAYERS).contains(&roster.len()) {
            return Err(SessionError::config(format!(
                "{} needs {}-{} players, got {}",
                V::NAME,
                V::MIN_PLAYERS,
                V::MAX_PLAYERS,
                roster.len()
            )));
        }
        let mut table = Table::new(room_id, roster, config, seed, transport);
        let variant = V::setup(settings, &mut table)?;
        variant.validate()?;
        Ok(Self {
            table,
            variant,
            moves: V::move_table(),
            started: false,
        })
    }

    /// Create a session from a room's JSON settings object.
    ///
    /// Shell and variant settings are read from the same object; missing
    /// keys take their defaults.
    pub fn from_room(
        room_id: impl Into<String>,
        players: Vec<PlayerId>,
        settings: &Value,
        seed: u64,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, SessionError> {
        let config = SessionConfig::from_settings(settings)?;
        let rules = if settings.is_null() {
            V::Settings::default()
        } else {
            serde_json::from_value(settings.clone())
                .map_err(|e| SessionError::config(format!("invalid {} settings: {e}", V::NAME)))?
        };
        Self::new(room_id, players, rules, config, seed, transport)
    }

    /// Run the interactive setup and announce the first turn.
    pub async fn initialize(&mut self) -> Result<(), SessionError> {
        if self.started {
            return Ok(());
        }
        tracing::info!(
            target: LOG_TARGET,
            room = %self.table.room_id,
            game = V::NAME,
            players = self.table.player_count(),
            "starting session"
        );
        let players: Vec<_> = self.table.roster.players().to_vec();
        self.table
            .broadcast(json!({ "type": "game_started", "game": V::NAME, "players": players }))
            .await;
        self.push_states().await;

        self.variant.start(&mut self.table).await;
        self.started = true;
        self.table.started_at = Utc::now();

        let current = self.table.turn.current();
        self.announce_turn(current).await;
        self.push_states().await;
        Ok(())
    }

    /// Validate and apply one move.
    pub async fn process_move(
        &mut self,
        player: PlayerId,
        action: &str,
        payload: Value,
    ) -> Result<MoveOutcome, MoveError> {
        let result = self.route(player, action, &payload).await;
        match &result {
            Ok(outcome) => tracing::debug!(
                target: LOG_TARGET,
                room = %self.table.room_id,
                %player,
                action,
                continues = outcome.continues,
                "move accepted"
            ),
            Err(err) => {
                tracing::debug!(
                    target: LOG_TARGET,
                    room = %self.table.room_id,
                    %player,
                    action,
                    error = %err,
                    "move rejected"
                );
                self.table
                    .send_to(
                        player,
                        json!({ "type": "move_rejected", "action": action, "error": err.to_string() }),
                    )
                    .await;
            }
        }
        result
    }

    async fn route(&mut self, player: PlayerId, action: &str, payload: &Value) -> Result<MoveOutcome, MoveError> {
        let seat = self.table.seat_of(player).ok_or(MoveError::UnknownPlayer)?;
        if !self.started {
            return Err(MoveError::NotStarted);
        }
        if self.table.turn.is_over() {
            return Err(MoveError::GameOver);
        }
        if self.table.turn.current() != seat {
            return Err(MoveError::NotYourTurn);
        }
        let spec = self
            .moves
            .lookup(action)
            .ok_or_else(|| MoveError::UnknownAction(action.to_string()))?;
        let state = self.table.turn.state();
        if !spec.legal_in(state) {
            return Err(MoveError::IllegalInState {
                action: action.to_string(),
                state: state.to_string(),
            });
        }
        let act = spec.action;
        if let Some(target) = payload.get("target_player").and_then(Value::as_u64) {
            if let Some(target) = self.table.seat_of(PlayerId(target)) {
                if self.table.turn.is_frozen(target) {
                    return Err(MoveError::FrozenTarget);
                }
            }
        }

        let outcome = self.variant.handle(&mut self.table, seat, act, payload).await?;
        self.table.moves[seat] += 1;
        if !outcome.continues {
            self.complete_move(seat).await;
        }
        self.push_states().await;
        Ok(outcome)
    }

    /// Post-conditions of a turn-ending move.
    async fn complete_move(&mut self, seat: Seat) {
        self.variant.settle(&mut self.table, seat).await;
        self.check_completion(seat).await;

        if self.variant.ends_immediately(&self.table) {
            self.finish().await;
            return;
        }
        match self.table.turn.advance() {
            TurnAdvance::Next(next) => self.announce_turn(next).await,
            TurnAdvance::GameOver => self.finish().await,
        }
    }

    async fn check_completion(&mut self, actor: Seat) {
        if self.table.turn.first_finisher().is_some() {
            return;
        }
        let count = self.table.player_count() as u8;
        let finisher = (0..count)
            .map(|offset| Seat((actor.0 + offset) % count))
            .find(|&seat| self.variant.is_complete(seat));
        if let Some(seat) = finisher {
            self.table.turn.set_first_finisher(seat);
            let player = self.table.player(seat);
            tracing::info!(target: LOG_TARGET, room = %self.table.room_id, %player, "first finisher");
            self.table
                .broadcast(json!({ "type": "goal_completed", "player": player }))
                .await;
        }
    }

    async fn announce_turn(&mut self, seat: Seat) {
        let player = self.table.player(seat);
        let turn_number = self.table.turn.turn_number();
        self.table
            .broadcast(json!({ "type": "new_turn", "player": player, "turn_number": turn_number }))
            .await;
    }

    async fn finish(&mut self) {
        self.table.turn.finish();
        self.table.finished_at = Some(Utc::now());
        let standings = self.variant.standings(&self.table);
        let winner = self
            .variant
            .winner(&self.table, &standings)
            .map(|seat| self.table.player(seat));
        tracing::info!(
            target: LOG_TARGET,
            room = %self.table.room_id,
            winner = ?winner,
            "game over"
        );
        self.table
            .broadcast(json!({ "type": "game_over", "winner": winner, "standings": standings }))
            .await;
    }

    async fn push_states(&self) {
        for (_, player) in self.table.roster.iter() {
            if let Some(state) = self.get_state(player) {
                let message = json!({ "type": "game_state", "state": state });
                self.table.journal.set_state(player, message.clone());
                self.table.send_to(player, message).await;
            }
        }
    }

    /// State as seen by `player`; `None` if they are not seated here.
    #[must_use]
    pub fn get_state(&self, player: PlayerId) -> Option<Value> {
        let seat = self.table.seat_of(player)?;
        let mut view = self.variant.view(&self.table, seat);
        let map = view.as_object_mut()?;

        let moves: serde_json::Map<String, Value> = self
            .table
            .roster
            .iter()
            .map(|(s, p)| (p.0.to_string(), json!(self.table.moves[s])))
            .collect();
        map.insert("room_id".into(), json!(self.table.room_id));
        map.insert("game".into(), json!(V::NAME));
        map.insert("you".into(), json!(player));
        map.insert("players".into(), json!(self.table.roster.players()));
        map.insert("current_player".into(), json!(self.current_player()));
        map.insert("turn_state".into(), json!(self.table.turn.state()));
        let legal = if self.started && !self.is_over() && self.table.turn.current() == seat {
            self.moves.legal_names(self.table.turn.state())
        } else {
            Vec::new()
        };
        map.insert("legal_actions".into(), json!(legal));
        map.insert("turn_number".into(), json!(self.table.turn.turn_number()));
        map.insert(
            "first_finisher".into(),
            json!(self.table.turn.first_finisher().map(|s| self.table.player(s))),
        );
        map.insert("moves_made".into(), Value::Object(moves));
        map.insert("game_over".into(), json!(self.is_over()));
        if self.is_over() {
            let standings = self.variant.standings(&self.table);
            let winner = self
                .variant
                .winner(&self.table, &standings)
                .map(|s| self.table.player(s));
            map.insert("winner".into(), json!(winner));
            map.insert("standings".into(), json!(standings));
        }
        Some(view)
    }

    /// Final statistics. Only available once the game is over.
    pub fn get_game_stats(&self) -> Result<GameStats, SessionError> {
        if !self.is_over() {
            return Err(SessionError::NotFinished);
        }
        let finished_at = self.table.finished_at.unwrap_or_else(Utc::now);
        let standings: Vec<Standing> = self.variant.standings(&self.table);
        let winner = self
            .variant
            .winner(&self.table, &standings)
            .map(|s| self.table.player(s));
        let players = standings
            .into_iter()
            .enumerate()
            .map(|(i, s)| PlayerStats {
                player: s.player,
                seat: s.seat,
                rank: i + 1,
                score: s.score,
                moves_made: self.table.moves[s.seat],
                breakdown: s.breakdown,
            })
            .collect();
        Ok(GameStats {
            room_id: self.table.room_id.clone(),
            game: V::NAME,
            started_at: self.table.started_at,
            finished_at,
            duration_secs: (finished_at - self.table.started_at).num_seconds(),
            total_moves: self.table.moves.values().sum(),
            turns_played: self.table.turn.turn_number(),
            winner,
            first_finisher: self.table.turn.first_finisher().map(|s| self.table.player(s)),
            players,
        })
    }

    /// Bring a reconnecting player up to date: broadcast history, pending
    /// requests and prompts, then a fresh state.
    pub async fn reconnect(&self, player: PlayerId) {
        let Some(seat) = self.table.seat_of(player) else {
            return;
        };
        tracing::debug!(target: LOG_TARGET, room = %self.table.room_id, %player, "replaying for reconnect");
        for message in self.table.journal.events() {
            self.table.send_to(player, message).await;
        }
        for request in self.table.broker.replay(player) {
            self.table.send_to(player, request).await;
        }
        for prompt in self.variant.prompts(&self.table, seat) {
            self.table.send_to(player, prompt).await;
        }
        if let Some(state) = self.get_state(player) {
            self.table
                .send_to(player, json!({ "type": "game_state", "state": state }))
                .await;
        }
    }

    /// Capture everything needed to rebuild the session.
    ///
    /// Outstanding requests are not captured.
    #[must_use]
    pub fn dump(&self) -> SessionSnapshot<V> {
        SessionSnapshot {
            room_id: self.table.room_id.clone(),
            roster: self.table.roster.clone(),
            config: self.table.config.clone(),
            started: self.started,
            turn: self.table.turn.clone(),
            rng: self.table.rng.state(),
            moves: self.table.moves.clone(),
            log: self
                .table
                .journal
                .events()
                .iter()
                .filter_map(|m| serde_json::to_string(m).ok())
                .collect(),
            started_at: self.table.started_at,
            finished_at: self.table.finished_at,
            variant: self.variant.clone(),
        }
    }

    /// Rebuild a session from a snapshot.
    ///
    /// Anything that was waiting on a player is resolved as timed out.
    pub async fn load(snapshot: SessionSnapshot<V>, transport: Arc<dyn Transport>) -> Result<Self, SessionError> {
        snapshot.config.validate()?;
        snapshot.variant.validate()?;
        let log: VecDeque<Value> = snapshot
            .log
            .iter()
            .map(|m| serde_json::from_str(m))
            .collect::<Result<_, serde_json::Error>>()?;
        if snapshot.moves.player_count() != snapshot.roster.len() {
            return Err(SessionError::snapshot("move counters do not match the roster"));
        }
        let journal = Arc::new(Journal::restore(snapshot.config.event_log_limit, log));
        let table = Table {
            room_id: snapshot.room_id,
            roster: snapshot.roster,
            config: snapshot.config,
            turn: snapshot.turn,
            rng: GameRng::from_state(&snapshot.rng),
            moves: snapshot.moves,
            journal,
            broker: Arc::new(RequestBroker::new()),
            transport,
            started_at: snapshot.started_at,
            finished_at: snapshot.finished_at,
        };
        let mut session = Self {
            table,
            variant: snapshot.variant,
            moves: V::move_table(),
            started: snapshot.started,
        };
        tracing::info!(target: LOG_TARGET, room = %session.table.room_id, "session restored");

        if session.started && !session.is_over() {
            let current = session.table.turn.current();
            if session.variant.on_restore(&mut session.table).await {
                session.complete_move(current).await;
            }
            session.push_states().await;
        }
        Ok(session)
    }

    /// Drop outstanding requests. Waiters resume with their fallbacks.
    pub fn teardown(&mut self) {
        tracing::info!(target: LOG_TARGET, room = %self.table.room_id, "tearing down session");
        self.table.broker.invalidate_all();
    }

    /// Handle for delivering correlated responses while a move is suspended.
    #[must_use]
    pub fn broker(&self) -> Arc<RequestBroker> {
        Arc::clone(&self.table.broker)
    }

    /// Broadcast history and last pushed states, shared with the registry.
    #[must_use]
    pub fn journal(&self) -> Arc<Journal> {
        Arc::clone(&self.table.journal)
    }

    #[must_use]
    pub fn room_id(&self) -> &str {
        &self.table.room_id
    }

    #[must_use]
    pub fn is_started(&self) -> bool {
        self.started
    }

    #[must_use]
    pub fn is_over(&self) -> bool {
        self.table.turn.is_over()
    }

    #[must_use]
    pub fn turn_state(&self) -> TurnState {
        self.table.turn.state()
    }

    #[must_use]
    pub fn current_player(&self) -> PlayerId {
        self.table.player(self.table.turn.current())
    }

    #[must_use]
    pub fn first_finisher(&self) -> Option<PlayerId> {
        self.table.turn.first_finisher().map(|s| self.table.player(s))
    }

    #[must_use]
    pub fn moves_made(&self) -> &PlayerMap<u32> {
        &self.table.moves
    }

    #[must_use]
    pub fn table(&self) -> &Table {
        &self.table
    }

    #[must_use]
    pub fn variant(&self) -> &V {
        &self.variant
    }

    /// Mutable access to the rules state, for scripted setups.
    pub fn variant_mut(&mut self) -> &mut V {
        &mut self.variant
    }
}
