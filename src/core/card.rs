//! Card identity.
//!
//! Every physical card in a session has a unique `CardUid`, even when two
//! cards share the same ingredient name. Uids are allocated once per session
//! by a `UidAllocator` and never reused, so a uid in a client message always
//! names one specific card.
//!
//! ```
//! use ccg_session::core::UidAllocator;
//!
//! let mut uids = UidAllocator::new();
//! let a = uids.next_uid();
//! let b = uids.next_uid();
//! assert_ne!(a, b);
//! ```

use serde::{Deserialize, Serialize};

/// Unique identifier of a physical card within a session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CardUid(pub u32);

impl CardUid {
    #[must_use]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for CardUid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "card#{}", self.0)
    }
}

/// Anything that lives in a [`Pile`](crate::zones::Pile).
pub trait Identified {
    fn uid(&self) -> CardUid;
}

/// Monotonic uid source. Starts at 1 so that 0 never names a card.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UidAllocator {
    next: u32,
}

impl Default for UidAllocator {
    fn default() -> Self {
        Self { next: 1 }
    }
}

impl UidAllocator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_uid(&mut self) -> CardUid {
        let uid = CardUid(self.next);
        self.next += 1;
        uid
    }

    /// Number of uids handed out so far.
    #[must_use]
    pub fn allocated(&self) -> u32 {
        self.next - 1
    }
}
