//! Gem colors and token counts.

use std::ops::{Index, IndexMut};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gem {
    White,
    Blue,
    Green,
    Red,
    Black,
    /// Wild token, never a card bonus.
    Gold,
}

impl Gem {
    /// The five colors cards are bought with.
    pub const COLORS: [Gem; 5] = [Gem::White, Gem::Blue, Gem::Green, Gem::Red, Gem::Black];
    pub const ALL: [Gem; 6] = [Gem::White, Gem::Blue, Gem::Green, Gem::Red, Gem::Black, Gem::Gold];

    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Gem::White => "white",
            Gem::Blue => "blue",
            Gem::Green => "green",
            Gem::Red => "red",
            Gem::Black => "black",
            Gem::Gold => "gold",
        }
    }

    #[must_use]
    pub fn parse(name: &str) -> Option<Gem> {
        Gem::ALL.into_iter().find(|g| g.as_str() == name)
    }

    #[must_use]
    pub fn is_color(self) -> bool {
        self != Gem::Gold
    }
}

/// A count per gem, gold included.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TokenSet([u32; 6]);

impl TokenSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Same count of every color, no gold.
    #[must_use]
    pub fn of_colors(count: u32) -> Self {
        let mut set = Self::new();
        for gem in Gem::COLORS {
            set[gem] = count;
        }
        set
    }

    #[must_use]
    pub fn with(mut self, gem: Gem, count: u32) -> Self {
        self[gem] += count;
        self
    }

    #[must_use]
    pub fn total(&self) -> u32 {
        self.0.iter().sum()
    }

    /// At least as many of every gem as `other`.
    #[must_use]
    pub fn covers(&self, other: &TokenSet) -> bool {
        Gem::ALL.iter().all(|&g| self[g] >= other[g])
    }

    /// Move `amount` into `into`. Callers check `covers` first.
    pub fn transfer(&mut self, into: &mut TokenSet, amount: &TokenSet) {
        for gem in Gem::ALL {
            let n = amount[gem].min(self[gem]);
            self[gem] -= n;
            into[gem] += n;
        }
    }

    /// One entry per token, in gem order.
    #[must_use]
    pub fn units(&self) -> Vec<Gem> {
        Gem::ALL
            .iter()
            .flat_map(|&g| std::iter::repeat(g).take(self[g] as usize))
            .collect()
    }

    #[must_use]
    pub fn from_units(units: &[Gem]) -> Self {
        units.iter().fold(Self::new(), |set, &g| set.with(g, 1))
    }

    /// Read `{"red": 2, "gold": 1}`. Unknown colors and non-integer counts
    /// make the whole map invalid.
    #[must_use]
    pub fn from_json(value: &Value) -> Option<Self> {
        let mut set = Self::new();
        for (name, count) in value.as_object()? {
            let gem = Gem::parse(name)?;
            set[gem] += u32::try_from(count.as_u64()?).ok()?;
        }
        Some(set)
    }

    #[must_use]
    pub fn to_json(&self) -> Value {
        let map: Map<String, Value> = Gem::ALL
            .iter()
            .map(|&g| (g.as_str().to_string(), Value::from(self[g])))
            .collect();
        Value::Object(map)
    }
}

impl Index<Gem> for TokenSet {
    type Output = u32;

    fn index(&self, gem: Gem) -> &u32 {
        &self.0[gem.index()]
    }
}

impl IndexMut<Gem> for TokenSet {
    fn index_mut(&mut self, gem: Gem) -> &mut u32 {
        &mut self.0[gem.index()]
    }
}
