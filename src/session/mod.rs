//! The session shell: turn state machine, move routing, variant strategy,
//! persistence and the registry of running sessions.

pub mod engine;
pub mod journal;
pub mod moves;
pub mod registry;
pub mod snapshot;
pub mod turn;
pub mod variant;

pub use engine::{GameStats, PlayerStats, Session};
pub use journal::Journal;
pub use moves::{MoveOutcome, MoveSpec, MoveTable};
pub use registry::{MemoryRoomStore, PlayerStatus, RoomStatus, RoomStore, SessionHandle, SessionRegistry};
pub use snapshot::SessionSnapshot;
pub use turn::{TurnAdvance, TurnMachine, TurnState};
pub use variant::{Standing, Table, Variant};
