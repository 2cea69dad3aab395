//! Development cards and noble tiles.
//!
//! Every color gets the same set of cost shapes per level. A shape lists
//! the gems needed starting at the card's own bonus color and walking the
//! color wheel (white, blue, green, red, black), so the five colors come
//! out as rotations of each other.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::tokens::{Gem, TokenSet};
use crate::core::{CardUid, Identified, UidAllocator};

pub const LEVELS: usize = 3;

/// (cost shape, prestige) per level.
const SHAPES: [&[([u32; 5], i32)]; LEVELS] = [
    &[
        ([0, 1, 1, 1, 1], 0),
        ([0, 1, 2, 1, 1], 0),
        ([0, 2, 2, 0, 1], 0),
        ([1, 3, 1, 0, 0], 0),
        ([0, 0, 1, 2, 0], 0),
        ([0, 2, 0, 0, 2], 0),
        ([0, 0, 0, 3, 0], 0),
        ([0, 0, 4, 0, 0], 1),
    ],
    &[
        ([0, 2, 2, 3, 0], 1),
        ([2, 3, 0, 0, 3], 1),
        ([0, 0, 1, 4, 2], 2),
        ([0, 5, 3, 0, 0], 2),
        ([0, 0, 5, 0, 0], 2),
        ([6, 0, 0, 0, 0], 3),
    ],
    &[
        ([0, 3, 3, 5, 3], 3),
        ([0, 0, 7, 0, 0], 4),
        ([3, 0, 6, 3, 0], 4),
        ([3, 0, 7, 0, 0], 5),
    ],
];

const NOBLE_POINTS: i32 = 3;

/// A development card.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GemCard {
    pub uid: CardUid,
    /// 1 to 3.
    pub level: u8,
    pub bonus: Gem,
    pub points: i32,
    pub cost: TokenSet,
}

impl Identified for GemCard {
    fn uid(&self) -> CardUid {
        self.uid
    }
}

impl GemCard {
    #[must_use]
    pub fn to_json(&self) -> Value {
        json!({
            "uid": self.uid,
            "level": self.level,
            "bonus": self.bonus,
            "points": self.points,
            "cost": self.cost.to_json(),
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Noble {
    pub id: String,
    pub points: i32,
    /// Card bonuses needed per color.
    pub requires: TokenSet,
}

impl Noble {
    #[must_use]
    pub fn to_json(&self) -> Value {
        json!({ "id": self.id, "points": self.points, "requires": self.requires.to_json() })
    }
}

fn rotated(shape: [u32; 5], start: usize) -> TokenSet {
    shape
        .iter()
        .enumerate()
        .fold(TokenSet::new(), |set, (offset, &n)| {
            set.with(Gem::COLORS[(start + offset) % Gem::COLORS.len()], n)
        })
}

/// The full deck of one level, unshuffled.
#[must_use]
pub fn level_cards(level: u8, uids: &mut UidAllocator) -> Vec<GemCard> {
    let shapes = SHAPES[usize::from(level - 1)];
    let mut cards = Vec::with_capacity(shapes.len() * Gem::COLORS.len());
    for (start, bonus) in Gem::COLORS.into_iter().enumerate() {
        for &(shape, points) in shapes {
            cards.push(GemCard {
                uid: uids.next_uid(),
                level,
                bonus,
                points,
                cost: rotated(shape, start),
            });
        }
    }
    cards
}

/// Ten nobles: five asking 4+4 of neighbouring colors and five asking
/// 3+3+3.
#[must_use]
pub fn nobles() -> Vec<Noble> {
    let pairs = (0..5).map(|start| rotated([4, 4, 0, 0, 0], start));
    let triples = (0..5).map(|start| rotated([3, 3, 3, 0, 0], start));
    pairs
        .chain(triples)
        .enumerate()
        .map(|(i, requires)| Noble {
            id: format!("noble-{}", i + 1),
            points: NOBLE_POINTS,
            requires,
        })
        .collect()
}
