//! Persistence format of a suspended session.
//!
//! A snapshot captures every container, all player state, the turn machine
//! and the RNG position. It does not capture outstanding player requests:
//! a restored session resolves whatever was pending as timed out.
//!
//! Two encodings are offered: JSON for inspection and bincode for storage.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::turn::TurnMachine;
use crate::core::{GameRngState, PlayerMap, Roster, SessionConfig, SessionError};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot<V> {
    pub room_id: String,
    pub roster: Roster,
    pub config: SessionConfig,
    pub started: bool,
    pub turn: TurnMachine,
    pub rng: GameRngState,
    pub moves: PlayerMap<u32>,
    /// Broadcast history, one JSON document per entry.
    pub log: Vec<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub variant: V,
}

impl<V: Serialize + DeserializeOwned> SessionSnapshot<V> {
    pub fn to_json(&self) -> Result<String, SessionError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, SessionError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, SessionError> {
        Ok(bincode::serialize(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SessionError> {
        Ok(bincode::deserialize(bytes)?)
    }
}
