//! Card containers and the shared card economy.
//!
//! ## Key Types
//!
//! - `Pile`: Ordered container that owns its cards
//! - `PilePosition`: Position specifier for inserts
//! - `Economy`: Deck, market, discard and staged event piles with the
//!   draw/reshuffle/refill rules
//! - `check_exchange`: Market exchange legality

pub mod economy;
pub mod pile;

pub use economy::{check_exchange, Economy, EconomyCard, ExchangeError};
pub use pile::{Pile, PilePosition, UidList};
