//! Game variants plugged into the session shell.
//!
//! - `borscht`: the reference card game (recipes, market, specials, events)
//! - `gems`: token economy with development cards and nobles
//! - `grid`: two-player tic-tac-toe

pub mod borscht;
pub mod gems;
pub mod grid;

pub use borscht::{Borscht, BorschtSettings};
pub use gems::{Gems, GemsSettings};
pub use grid::{Grid, GridSettings};
