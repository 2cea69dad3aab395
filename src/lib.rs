//! # ccg-session
//!
//! Authoritative per-room session engine for real-time, turn-based,
//! multiplayer card games.
//!
//! ## Design Principles
//!
//! 1. **One Owner Per Room**: A `Session` is the sole mutator of its game.
//!    Callers serialize access; a move either applies completely or is
//!    rejected without touching anything.
//!
//! 2. **N-Player First**: Seats, maps and turn rotation take the player
//!    count as context. Nothing assumes two players.
//!
//! 3. **Strategy Over Hierarchy**: The shell (turns, move routing, requests,
//!    completion, snapshots) is fixed. Rules plug in through the `Variant`
//!    trait.
//!
//! 4. **Deterministic**: Every random decision goes through the session's
//!    seeded `GameRng`, whose state is part of every snapshot.
//!
//! ## Architecture
//!
//! - **Suspending Moves**: A handler may ask players for decisions mid-move.
//!   Requests carry a deadline; an unanswered or malformed reply resolves
//!   to a uniform random pick.
//!
//! - **Fan-Out**: Requests to several players at once are issued together
//!   and joined, so the wait is bounded by one timeout.
//!
//! ## Modules
//!
//! - `core`: Player ids, seats, card uids, RNG, configuration, errors
//! - `zones`: Card piles and the shared deck/market/discard economy
//! - `protocol`: Outbound transport, request broker, selection fallback
//! - `session`: Turn state machine, move router, variant trait, snapshots,
//!   session registry
//! - `games`: Borscht, Gems and Grid variants

pub mod core;
pub mod games;
pub mod protocol;
pub mod session;
pub mod zones;

// Re-export commonly used types
pub use crate::core::{
    CardUid, GameRng, GameRngState, MoveError, PlayerId, PlayerMap, Roster, Seat, SessionConfig, SessionError,
};

pub use crate::zones::{Economy, Pile, PilePosition};

pub use crate::protocol::{RecordingTransport, Reply, RequestBroker, Transport};

pub use crate::session::{
    GameStats, MoveOutcome, Session, SessionRegistry, SessionSnapshot, Standing, Table, TurnState, Variant,
};
