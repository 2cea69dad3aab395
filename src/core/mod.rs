//! Core types shared by every session: identities, seating, RNG,
//! configuration and errors.
//!
//! Nothing in here knows about a particular card game.

pub mod card;
pub mod config;
pub mod error;
pub mod player;
pub mod rng;

pub use card::{CardUid, Identified, UidAllocator};
pub use config::SessionConfig;
pub use error::{MoveError, ProtocolError, SessionError, StoreError, TransportError};
pub use player::{PlayerId, PlayerMap, Roster, Seat};
pub use rng::{GameRng, GameRngState};
