//! Player identification, seating and per-seat data storage.
//!
//! ## PlayerId
//!
//! External identifier handed to us by the room roster (a user id).
//!
//! ## Seat
//!
//! 0-based position at the table. Turn order is seat order.
//!
//! ## PlayerMap
//!
//! Per-seat data storage backed by `Vec` for O(1) access.
//! Supports iteration and indexing by `Seat`.

use serde::{Deserialize, Serialize};
use std::ops::{Index, IndexMut};

/// Identifier of a player as known by the room and the transport.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub u64);

impl std::fmt::Display for PlayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "player#{}", self.0)
    }
}

/// Seat at the table, supporting 1-255 players.
///
/// Seats are 0-based: the first player in the roster sits at `Seat(0)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Seat(pub u8);

impl Seat {
    #[must_use]
    pub const fn new(seat: u8) -> Self {
        Self(seat)
    }

    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Iterate over all seats of a table with `player_count` players.
    ///
    /// ```
    /// use ccg_session::core::Seat;
    ///
    /// let seats: Vec<_> = Seat::all(3).collect();
    /// assert_eq!(seats, vec![Seat(0), Seat(1), Seat(2)]);
    /// ```
    pub fn all(player_count: usize) -> impl Iterator<Item = Seat> {
        (0..player_count as u8).map(Seat)
    }
}

impl std::fmt::Display for Seat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "seat {}", self.0)
    }
}

/// Ordered roster: seat `i` is occupied by `players[i]`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roster {
    players: Vec<PlayerId>,
}

impl Roster {
    /// Build a roster from the room's player list, in turn order.
    ///
    /// Returns `None` for an empty list, more than 255 players or a
    /// duplicated id.
    #[must_use]
    pub fn new(players: Vec<PlayerId>) -> Option<Self> {
        if players.is_empty() || players.len() > 255 {
            return None;
        }
        let mut sorted = players.clone();
        sorted.sort_unstable();
        sorted.dedup();
        if sorted.len() != players.len() {
            return None;
        }
        Some(Self { players })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.players.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// Player sitting at `seat`.
    ///
    /// Panics if the seat is out of range.
    #[must_use]
    pub fn player(&self, seat: Seat) -> PlayerId {
        self.players[seat.index()]
    }

    #[must_use]
    pub fn seat_of(&self, player: PlayerId) -> Option<Seat> {
        self.players
            .iter()
            .position(|&p| p == player)
            .map(|i| Seat(i as u8))
    }

    pub fn seats(&self) -> impl Iterator<Item = Seat> {
        Seat::all(self.players.len())
    }

    /// Iterate over (Seat, PlayerId) pairs in turn order.
    pub fn iter(&self) -> impl Iterator<Item = (Seat, PlayerId)> + '_ {
        self.players
            .iter()
            .enumerate()
            .map(|(i, &p)| (Seat(i as u8), p))
    }

    #[must_use]
    pub fn players(&self) -> &[PlayerId] {
        &self.players
    }
}

/// Per-seat data storage with O(1) access.
///
/// Backed by a `Vec<T>` with one entry per seat.
///
/// ```
/// use ccg_session::core::{PlayerMap, Seat};
///
/// let mut moves: PlayerMap<u32> = PlayerMap::with_value(3, 0);
/// moves[Seat(1)] += 1;
/// assert_eq!(moves[Seat(1)], 1);
/// assert_eq!(moves[Seat(0)], 0);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlayerMap<T> {
    data: Vec<T>,
}

impl<T> PlayerMap<T> {
    /// Create a new PlayerMap with values from a factory function.
    pub fn new(player_count: usize, factory: impl FnMut(Seat) -> T) -> Self {
        assert!(player_count > 0, "Must have at least 1 player");
        assert!(player_count <= 255, "At most 255 players supported");

        let data = Seat::all(player_count).map(factory).collect();
        Self { data }
    }

    pub fn with_value(player_count: usize, value: T) -> Self
    where
        T: Clone,
    {
        Self::new(player_count, |_| value.clone())
    }

    pub fn with_default(player_count: usize) -> Self
    where
        T: Default,
    {
        Self::new(player_count, |_| T::default())
    }

    #[must_use]
    pub fn player_count(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn get(&self, seat: Seat) -> &T {
        &self.data[seat.index()]
    }

    pub fn get_mut(&mut self, seat: Seat) -> &mut T {
        &mut self.data[seat.index()]
    }

    /// Iterate over (Seat, &T) pairs.
    pub fn iter(&self) -> impl Iterator<Item = (Seat, &T)> {
        self.data
            .iter()
            .enumerate()
            .map(|(i, v)| (Seat(i as u8), v))
    }

    /// Iterate over (Seat, &mut T) pairs.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Seat, &mut T)> {
        self.data
            .iter_mut()
            .enumerate()
            .map(|(i, v)| (Seat(i as u8), v))
    }

    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.data.iter()
    }
}

impl<T> Index<Seat> for PlayerMap<T> {
    type Output = T;

    fn index(&self, seat: Seat) -> &Self::Output {
        self.get(seat)
    }
}

impl<T> IndexMut<Seat> for PlayerMap<T> {
    fn index_mut(&mut self, seat: Seat) -> &mut Self::Output {
        self.get_mut(seat)
    }
}
