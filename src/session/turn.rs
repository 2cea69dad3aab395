//! Turn state machine.
//!
//! Turns rotate in seat order. A move may push the turn into one waiting
//! state (a discard, a defense window, a selection, an optional exchange)
//! and must restore the state it came from before the turn can advance.
//! Only one level is kept: entering a second waiting state while already
//! waiting replaces the inner state but still restores the outer one.
//!
//! Once a player first satisfies the win condition they become the first
//! finisher. Every other player gets one more turn, and the game is over
//! when the turn would come back to the first finisher.

use serde::{Deserialize, Serialize};

use crate::core::Seat;

/// Phase of the current turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnState {
    NormalTurn,
    WaitingForSelection,
    WaitingForDiscard,
    WaitingForDefense,
    WaitingForExchange,
    GameOver,
}

impl TurnState {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            TurnState::NormalTurn => "normal_turn",
            TurnState::WaitingForSelection => "waiting_for_selection",
            TurnState::WaitingForDiscard => "waiting_for_discard",
            TurnState::WaitingForDefense => "waiting_for_defense",
            TurnState::WaitingForExchange => "waiting_for_exchange",
            TurnState::GameOver => "game_over",
        }
    }

    #[must_use]
    pub fn is_waiting(self) -> bool {
        !matches!(self, TurnState::NormalTurn | TurnState::GameOver)
    }
}

impl std::fmt::Display for TurnState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of ending a turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TurnAdvance {
    Next(Seat),
    GameOver,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnMachine {
    seats: u8,
    current: Seat,
    state: TurnState,
    saved: Option<TurnState>,
    first_finisher: Option<Seat>,
    turn_number: u32,
}

impl TurnMachine {
    /// Start at seat 0 in a normal turn.
    #[must_use]
    pub fn new(player_count: usize) -> Self {
        assert!(player_count > 0, "Must have at least 1 player");
        Self {
            seats: player_count as u8,
            current: Seat(0),
            state: TurnState::NormalTurn,
            saved: None,
            first_finisher: None,
            turn_number: 1,
        }
    }

    #[must_use]
    pub fn current(&self) -> Seat {
        self.current
    }

    #[must_use]
    pub fn state(&self) -> TurnState {
        self.state
    }

    /// 1-based count of turns started.
    #[must_use]
    pub fn turn_number(&self) -> u32 {
        self.turn_number
    }

    #[must_use]
    pub fn is_over(&self) -> bool {
        self.state == TurnState::GameOver
    }

    #[must_use]
    pub fn first_finisher(&self) -> Option<Seat> {
        self.first_finisher
    }

    /// The first finisher cannot be targeted by other players' effects.
    #[must_use]
    pub fn is_frozen(&self, seat: Seat) -> bool {
        self.first_finisher == Some(seat)
    }

    /// Record the first finisher. Later calls are ignored.
    ///
    /// Returns true if `seat` became the first finisher.
    pub fn set_first_finisher(&mut self, seat: Seat) -> bool {
        if self.first_finisher.is_some() {
            return false;
        }
        self.first_finisher = Some(seat);
        true
    }

    /// Push into a waiting state.
    pub fn enter(&mut self, waiting: TurnState) {
        debug_assert!(waiting.is_waiting(), "enter() takes a waiting state");
        if self.is_over() {
            return;
        }
        if self.saved.is_none() {
            self.saved = Some(self.state);
        }
        self.state = waiting;
    }

    /// Pop back to the state saved by `enter`.
    pub fn restore(&mut self) {
        if self.is_over() {
            return;
        }
        self.state = self.saved.take().unwrap_or(TurnState::NormalTurn);
    }

    /// End the current turn.
    ///
    /// Moves to the next seat, or ends the game when that seat is the first
    /// finisher.
    pub fn advance(&mut self) -> TurnAdvance {
        if self.is_over() {
            return TurnAdvance::GameOver;
        }
        let next = Seat((self.current.0 + 1) % self.seats);
        if self.first_finisher == Some(next) {
            self.finish();
            return TurnAdvance::GameOver;
        }
        self.current = next;
        self.state = TurnState::NormalTurn;
        self.saved = None;
        self.turn_number += 1;
        TurnAdvance::Next(next)
    }

    /// End the game immediately.
    pub fn finish(&mut self) {
        self.state = TurnState::GameOver;
        self.saved = None;
    }
}
