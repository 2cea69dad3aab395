//! Card and recipe catalog.
//!
//! Static tables expanded into concrete cards at setup. Every copy gets its
//! own uid from the session allocator.

use super::cards::{Card, CardKind, Effect, Recipe};
use crate::core::UidAllocator;

#[derive(Clone, Copy, Debug)]
enum Spec {
    Regular(u32, i32),
    Rare(u32, i32),
    Extra(u32, i32),
    Wildcard(u32, i32),
    Special(u32, Effect),
}

impl Spec {
    fn kind(self) -> CardKind {
        match self {
            Spec::Regular(cost, points) => CardKind::Regular { cost, points },
            Spec::Rare(cost, points) => CardKind::Rare { cost, points },
            Spec::Extra(cost, points) => CardKind::Extra { cost, points, wildcard: false },
            Spec::Wildcard(cost, points) => CardKind::Extra { cost, points, wildcard: true },
            Spec::Special(cost, effect) => CardKind::Special { cost, effect },
        }
    }
}

/// (name, copies, kind)
const INGREDIENTS: &[(&str, usize, Spec)] = &[
    ("onion", 9, Spec::Regular(1, 1)),
    ("potato", 9, Spec::Regular(1, 0)),
    ("beet", 7, Spec::Regular(2, 1)),
    ("cabbage", 7, Spec::Regular(1, 1)),
    ("carrot", 9, Spec::Regular(2, 0)),
    ("celery_root", 7, Spec::Regular(2, 1)),
    ("tomato_paste", 6, Spec::Regular(2, 1)),
    ("sweet_pepper", 6, Spec::Regular(2, 2)),
    ("fresh_tomato", 6, Spec::Regular(2, 2)),
    ("pork", 6, Spec::Regular(2, 1)),
    ("beef", 4, Spec::Rare(3, 2)),
    ("beans", 3, Spec::Rare(3, 2)),
    ("eggs", 4, Spec::Rare(4, 3)),
    ("mushroom", 3, Spec::Rare(3, 2)),
    ("white_beet", 3, Spec::Rare(5, 4)),
    ("lamb", 2, Spec::Rare(6, 4)),
    ("prunes", 3, Spec::Rare(5, 3)),
    ("sorrel", 2, Spec::Rare(5, 4)),
    ("chicken", 2, Spec::Rare(5, 4)),
    ("fish", 3, Spec::Rare(5, 3)),
    ("eggplant", 2, Spec::Rare(4, 2)),
    ("flour", 4, Spec::Rare(3, 2)),
    ("beet_kvass", 3, Spec::Rare(6, 3)),
    ("sauerkraut", 3, Spec::Rare(3, 2)),
    ("sauerkraut_tomato", 3, Spec::Rare(6, 3)),
    ("smoked_pear", 3, Spec::Rare(6, 4)),
    ("apple", 2, Spec::Rare(6, 4)),
    ("home_sausages", 2, Spec::Rare(6, 4)),
    ("honey", 2, Spec::Rare(6, 4)),
    ("salt", 3, Spec::Extra(1, 2)),
    ("garlic", 2, Spec::Extra(5, 4)),
    ("vinnik_lard", 2, Spec::Wildcard(6, 0)),
    ("rye_bread", 2, Spec::Extra(6, 5)),
    ("bay_leaf", 2, Spec::Extra(4, 3)),
    ("vitamin_bunch", 2, Spec::Extra(2, 2)),
    ("chili_pepper", 6, Spec::Special(4, Effect::StealOrDiscard)),
    ("black_pepper", 4, Spec::Special(3, Effect::DiscardOrTake)),
    ("sour_cream", 4, Spec::Special(4, Effect::Defense)),
    ("ginger", 3, Spec::Special(3, Effect::TakeMarket)),
    ("cinnamon", 3, Spec::Special(5, Effect::TakeDiscard)),
    ("olive_oil", 3, Spec::Special(3, Effect::LookTopFive)),
    ("paprika", 3, Spec::Special(4, Effect::RefreshMarket)),
];

pub const EVENTS: &[&str] = &[
    "greedy_merchant",
    "tiny_pot",
    "crowded_stall",
    "talkative_cook",
    "sour_milk",
    "spoiled_market",
    "kitchen_cleanup",
];

struct RecipeSpec {
    id: &'static str,
    name: &'static str,
    ingredients: &'static [&'static str],
    levels: [(usize, i32); 3],
}

macro_rules! recipe {
    ($id:literal, $name:literal, [$($ing:literal),* $(,)?], $levels:expr) => {
        RecipeSpec { id: $id, name: $name, ingredients: &[$($ing),*], levels: $levels }
    };
}

const RECIPES: &[RecipeSpec] = &[
    recipe!("donetsk", "Donetsk borscht",
        ["cabbage", "onion", "tomato_paste", "carrot", "potato", "fresh_tomato", "beet", "fish", "beef", "sauerkraut"],
        [(5, 4), (7, 7), (10, 9)]),
    recipe!("volyn", "Volyn borscht",
        ["cabbage", "onion", "tomato_paste", "carrot", "potato", "fresh_tomato", "beet", "prunes", "mushroom", "sweet_pepper"],
        [(5, 4), (7, 7), (10, 9)]),
    recipe!("lenten_dumplings", "Lenten borscht with dumplings and kvass",
        ["cabbage", "onion", "tomato_paste", "carrot", "potato", "beet", "sweet_pepper", "celery_root", "beet_kvass",
         "sauerkraut", "flour", "eggs"],
        [(8, 3), (10, 4), (12, 6)]),
    recipe!("eggplant", "Borscht with eggplant",
        ["cabbage", "onion", "tomato_paste", "carrot", "potato", "fresh_tomato", "beet", "pork", "eggplant", "beans"],
        [(5, 4), (7, 6), (10, 8)]),
    recipe!("polissia", "Polissia borscht",
        ["cabbage", "onion", "carrot", "potato", "beet", "pork", "honey", "sauerkraut"],
        [(4, 4), (6, 7), (8, 8)]),
    recipe!("smoked_pear", "Borscht with smoked pear",
        ["cabbage", "onion", "tomato_paste", "carrot", "potato", "fresh_tomato", "beet", "sweet_pepper", "pork",
         "smoked_pear", "celery_root"],
        [(5, 4), (7, 6), (11, 8)]),
    recipe!("lviv", "Lviv borscht",
        ["cabbage", "onion", "tomato_paste", "carrot", "potato", "fresh_tomato", "beet", "beans", "beef", "mushroom"],
        [(5, 4), (7, 7), (10, 9)]),
    recipe!("lenten_pear", "Lenten borscht with smoked pear",
        ["cabbage", "onion", "tomato_paste", "carrot", "potato", "beet", "sweet_pepper", "beans", "smoked_pear",
         "celery_root"],
        [(5, 4), (7, 6), (10, 8)]),
    recipe!("yellow", "Yellow borscht",
        ["cabbage", "onion", "celery_root", "carrot", "potato", "fresh_tomato", "pork", "sweet_pepper", "mushroom",
         "eggplant", "white_beet"],
        [(7, 6), (9, 7), (11, 8)]),
    recipe!("transcarpathian", "Transcarpathian bograch borscht",
        ["cabbage", "onion", "tomato_paste", "carrot", "potato", "sweet_pepper", "beet", "pork", "celery_root",
         "home_sausages"],
        [(5, 3), (7, 4), (10, 6)]),
    recipe!("cherkasy", "Cherkasy borscht",
        ["cabbage", "onion", "tomato_paste", "carrot", "potato", "fresh_tomato", "beet", "fish", "flour"],
        [(4, 3), (6, 4), (9, 6)]),
    recipe!("odesa", "Odesa borscht",
        ["cabbage", "onion", "carrot", "potato", "fresh_tomato", "white_beet", "fish", "sauerkraut_tomato"],
        [(4, 3), (6, 5), (8, 6)]),
    recipe!("meatballs", "Borscht with meatballs",
        ["cabbage", "onion", "carrot", "potato", "sweet_pepper", "beet", "chicken", "celery_root"],
        [(4, 3), (6, 4), (8, 5)]),
    recipe!("prunes", "Borscht with pickled tomatoes and prunes",
        ["cabbage", "onion", "tomato_paste", "carrot", "potato", "celery_root", "beet", "prunes", "sauerkraut_tomato"],
        [(5, 3), (7, 4), (9, 7)]),
    recipe!("green_chicken", "Green borscht on chicken broth",
        ["celery_root", "onion", "carrot", "potato", "eggs", "sorrel", "chicken"],
        [(4, 3), (5, 4), (7, 7)]),
    recipe!("poltava", "Poltava borscht",
        ["cabbage", "onion", "sweet_pepper", "carrot", "potato", "celery_root", "beet", "pork", "eggs", "flour"],
        [(5, 4), (7, 6), (10, 8)]),
    recipe!("frankivsk", "Ivano-Frankivsk borscht",
        ["cabbage", "onion", "tomato_paste", "carrot", "potato", "beet", "apple", "beef"],
        [(4, 4), (6, 6), (8, 7)]),
    recipe!("green_classic", "Classic green borscht",
        ["celery_root", "onion", "pork", "carrot", "potato", "sorrel", "eggs"],
        [(4, 3), (5, 4), (7, 5)]),
    recipe!("crimean_tatar", "Crimean Tatar borscht",
        ["cabbage", "onion", "sweet_pepper", "carrot", "potato", "fresh_tomato", "beet", "celery_root", "eggs", "lamb"],
        [(5, 4), (8, 6), (10, 8)]),
    recipe!("lenten_mushroom", "Lenten borscht with mushroom dumplings",
        ["cabbage", "onion", "celery_root", "carrot", "potato", "eggs", "beet", "beans", "flour", "mushroom"],
        [(5, 4), (7, 6), (10, 8)]),
    recipe!("hutsul", "Hutsul borscht",
        ["white_beet", "onion", "home_sausages", "carrot", "potato", "beet_kvass", "beef"],
        [(4, 3), (5, 5), (7, 6)]),
];

/// Every non-event card, one entry per copy.
pub fn ingredient_cards(uids: &mut UidAllocator) -> Vec<Card> {
    INGREDIENTS
        .iter()
        .flat_map(|&(name, copies, spec)| std::iter::repeat((name, spec)).take(copies))
        .map(|(name, spec)| Card::new(uids.next_uid(), name, spec.kind()))
        .collect()
}

/// One card per event in the catalog.
pub fn event_cards(uids: &mut UidAllocator) -> Vec<Card> {
    EVENTS
        .iter()
        .map(|name| Card::new(uids.next_uid(), *name, CardKind::Event))
        .collect()
}

pub fn recipes() -> Vec<Recipe> {
    RECIPES
        .iter()
        .map(|spec| Recipe {
            id: spec.id.to_string(),
            name: spec.name.to_string(),
            ingredients: spec.ingredients.iter().map(|i| i.to_string()).collect(),
            levels: spec.levels.to_vec(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustc_hash::FxHashSet;

    #[test]
    fn test_every_recipe_ingredient_is_a_regular_or_rare_card() {
        let mut uids = UidAllocator::new();
        let cards = ingredient_cards(&mut uids);

        for recipe in recipes() {
            for ingredient in &recipe.ingredients {
                let card = cards.iter().find(|c| &c.name == ingredient);
                assert!(
                    card.is_some_and(|c| c.is_recipe_ingredient()),
                    "{} needs unknown ingredient {ingredient}",
                    recipe.id
                );
            }
        }
    }

    #[test]
    fn test_recipe_levels_are_ascending_and_reachable() {
        for recipe in recipes() {
            assert!(recipe.levels.windows(2).all(|w| w[0].0 < w[1].0 && w[0].1 <= w[1].1));
            assert_eq!(recipe.levels.last().map(|l| l.0), Some(recipe.size()), "{}", recipe.id);
        }
    }

    #[test]
    fn test_uids_are_unique() {
        let mut uids = UidAllocator::new();
        let mut cards = ingredient_cards(&mut uids);
        cards.extend(event_cards(&mut uids));

        let distinct: FxHashSet<_> = cards.iter().map(|c| c.uid).collect();
        assert_eq!(distinct.len(), cards.len());
        assert_eq!(cards.iter().filter(|c| c.name == "olive_oil").count(), 3);
        assert_eq!(cards.iter().filter(|c| c.name == "vinnik_lard" && c.counts_toward_goal()).count(), 2);
    }
}
