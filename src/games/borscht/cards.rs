//! Cards and recipes of the recipe-building game.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::core::{CardUid, Identified};
use crate::zones::EconomyCard;

/// What a special card does when played.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Effect {
    StealOrDiscard,
    DiscardOrTake,
    Defense,
    TakeMarket,
    TakeDiscard,
    LookTopFive,
    RefreshMarket,
}

impl Effect {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Effect::StealOrDiscard => "steal_or_discard",
            Effect::DiscardOrTake => "discard_or_take",
            Effect::Defense => "defense",
            Effect::TakeMarket => "take_market",
            Effect::TakeDiscard => "take_discard",
            Effect::LookTopFive => "look_top_5",
            Effect::RefreshMarket => "refresh_market",
        }
    }
}

/// Card kinds. Each carries only the fields that matter for it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CardKind {
    /// Common recipe ingredient.
    Regular { cost: u32, points: i32 },
    /// Scarcer recipe ingredient.
    Rare { cost: u32, points: i32 },
    /// Bonus ingredient, addable to any borscht. A wildcard also counts
    /// toward recipe completion.
    Extra { cost: u32, points: i32, wildcard: bool },
    /// Played from hand for its effect, never added to a borscht.
    Special { cost: u32, effect: Effect },
    /// Resolved when drawn, never held.
    Event,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    pub uid: CardUid,
    /// Ingredient or event name, shared by every copy.
    pub name: String,
    pub kind: CardKind,
}

impl Card {
    pub fn new(uid: CardUid, name: impl Into<String>, kind: CardKind) -> Self {
        Self {
            uid,
            name: name.into(),
            kind,
        }
    }

    #[must_use]
    pub fn cost(&self) -> u32 {
        match self.kind {
            CardKind::Regular { cost, .. }
            | CardKind::Rare { cost, .. }
            | CardKind::Extra { cost, .. }
            | CardKind::Special { cost, .. } => cost,
            CardKind::Event => 0,
        }
    }

    #[must_use]
    pub fn points(&self) -> i32 {
        match self.kind {
            CardKind::Regular { points, .. } | CardKind::Rare { points, .. } | CardKind::Extra { points, .. } => points,
            CardKind::Special { .. } | CardKind::Event => 0,
        }
    }

    #[must_use]
    pub fn effect(&self) -> Option<Effect> {
        match self.kind {
            CardKind::Special { effect, .. } => Some(effect),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_event(&self) -> bool {
        matches!(self.kind, CardKind::Event)
    }

    #[must_use]
    pub fn is_special(&self) -> bool {
        matches!(self.kind, CardKind::Special { .. })
    }

    /// Regular and rare cards must belong to the player's recipe.
    #[must_use]
    pub fn is_recipe_ingredient(&self) -> bool {
        matches!(self.kind, CardKind::Regular { .. } | CardKind::Rare { .. })
    }

    /// Counts toward completing a recipe once in a borscht.
    #[must_use]
    pub fn counts_toward_goal(&self) -> bool {
        matches!(
            self.kind,
            CardKind::Regular { .. } | CardKind::Rare { .. } | CardKind::Extra { wildcard: true, .. }
        )
    }

    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self.kind {
            CardKind::Regular { .. } => "regular",
            CardKind::Rare { .. } => "rare",
            CardKind::Extra { .. } => "extra",
            CardKind::Special { .. } => "special",
            CardKind::Event => "event",
        }
    }

    /// Wire form sent to clients.
    #[must_use]
    pub fn to_json(&self) -> Value {
        json!({
            "uid": self.uid,
            "id": self.name,
            "type": self.type_name(),
            "cost": self.cost(),
            "points": self.points(),
            "effect": self.effect().map(Effect::as_str),
        })
    }
}

impl Identified for Card {
    fn uid(&self) -> CardUid {
        self.uid
    }
}

impl EconomyCard for Card {
    fn is_event(&self) -> bool {
        Card::is_event(self)
    }

    fn cost(&self) -> u32 {
        Card::cost(self)
    }

    fn label(&self) -> &str {
        &self.name
    }
}

/// A secret goal: the ingredients to collect and the bonus tiers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipe {
    pub id: String,
    pub name: String,
    pub ingredients: Vec<String>,
    /// (ingredients collected, bonus points), ascending.
    pub levels: Vec<(usize, i32)>,
}

impl Recipe {
    #[must_use]
    pub fn contains(&self, ingredient: &str) -> bool {
        self.ingredients.iter().any(|i| i == ingredient)
    }

    #[must_use]
    pub fn size(&self) -> usize {
        self.ingredients.len()
    }

    /// Bonus of the highest tier reached with `collected` ingredients.
    #[must_use]
    pub fn bonus_for(&self, collected: usize) -> i32 {
        self.levels
            .iter()
            .filter(|(threshold, _)| collected >= *threshold)
            .map(|&(_, points)| points)
            .last()
            .unwrap_or(0)
    }

    #[must_use]
    pub fn to_json(&self) -> Value {
        let levels: Vec<Value> = self
            .levels
            .iter()
            .map(|(count, points)| json!({ "ingredients": count, "points": points }))
            .collect();
        json!({
            "id": self.id,
            "name": self.name,
            "ingredients": self.ingredients,
            "levels": levels,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_card_accessors() {
        let onion = Card::new(CardUid(1), "onion", CardKind::Regular { cost: 1, points: 1 });
        let lard = Card::new(CardUid(2), "vinnik_lard", CardKind::Extra { cost: 6, points: 0, wildcard: true });
        let salt = Card::new(CardUid(3), "salt", CardKind::Extra { cost: 1, points: 2, wildcard: false });
        let chili = Card::new(CardUid(4), "chili_pepper", CardKind::Special { cost: 4, effect: Effect::StealOrDiscard });
        let storm = Card::new(CardUid(5), "tiny_pot", CardKind::Event);

        assert!(onion.counts_toward_goal() && onion.is_recipe_ingredient());
        assert!(lard.counts_toward_goal() && !lard.is_recipe_ingredient());
        assert!(!salt.counts_toward_goal());
        assert_eq!(chili.effect(), Some(Effect::StealOrDiscard));
        assert_eq!(chili.points(), 0);
        assert_eq!(EconomyCard::cost(&storm), 0);
        assert!(storm.is_event());
    }

    #[test]
    fn test_card_wire_form() {
        let chili = Card::new(CardUid(4), "chili_pepper", CardKind::Special { cost: 4, effect: Effect::StealOrDiscard });
        assert_eq!(
            chili.to_json(),
            json!({ "uid": 4, "id": "chili_pepper", "type": "special", "cost": 4, "points": 0, "effect": "steal_or_discard" })
        );
    }

    #[test]
    fn test_recipe_bonus_tiers() {
        let recipe = Recipe {
            id: "r".into(),
            name: "R".into(),
            ingredients: vec!["a".into(), "b".into(), "c".into()],
            levels: vec![(1, 1), (2, 3), (3, 6)],
        };

        assert_eq!(recipe.bonus_for(0), 0);
        assert_eq!(recipe.bonus_for(2), 3);
        assert_eq!(recipe.bonus_for(3), 6);
        assert!(recipe.contains("b"));
        assert!(!recipe.contains("z"));
    }
}
