//! Completion, scoring and ranking.

use std::cmp::Ordering;

use serde::Serialize;

use super::cards::{Card, Recipe};
use crate::core::Seat;
use crate::zones::Pile;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ScoreBreakdown {
    pub ingredient_points: i32,
    pub recipe_bonus: i32,
    pub first_finisher_bonus: i32,
    /// Distinct recipe ingredients in the borscht.
    pub collected: usize,
    pub total: i32,
}

/// Cards in `tableau` that count toward completing a recipe.
#[must_use]
pub fn goal_count(tableau: &Pile<Card>) -> usize {
    tableau.iter().filter(|c| c.counts_toward_goal()).count()
}

/// A borscht is complete once it holds as many goal cards as the recipe
/// lists ingredients. Wildcards stand in for missing ingredients.
#[must_use]
pub fn is_complete(tableau: &Pile<Card>, recipe: &Recipe) -> bool {
    goal_count(tableau) >= recipe.size()
}

#[must_use]
pub fn score(tableau: &Pile<Card>, recipe: Option<&Recipe>, first_finisher: bool, bonus: i32) -> ScoreBreakdown {
    let ingredient_points: i32 = tableau.iter().map(Card::points).sum();
    let collected = recipe.map_or(0, |r| {
        r.ingredients
            .iter()
            .filter(|name| tableau.iter().any(|c| &c.name == *name))
            .count()
    });
    let recipe_bonus = recipe.map_or(0, |r| r.bonus_for(collected));
    let first_finisher_bonus = if first_finisher { bonus } else { 0 };
    ScoreBreakdown {
        ingredient_points,
        recipe_bonus,
        first_finisher_bonus,
        collected,
        total: ingredient_points + recipe_bonus + first_finisher_bonus,
    }
}

/// One player's entry in the final ranking.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Contender {
    pub seat: Seat,
    pub score: i32,
    /// Total cost of the cards left in hand.
    pub hand_cost: u32,
    pub first_finisher: bool,
    pub moves: u32,
    pub breakdown: ScoreBreakdown,
}

/// Best first: score, then hand cost, then the first finisher, then fewer
/// moves, then seat order.
#[must_use]
pub fn rank(mut contenders: Vec<Contender>) -> Vec<Contender> {
    contenders.sort_by(compare);
    contenders
}

fn compare(a: &Contender, b: &Contender) -> Ordering {
    b.score
        .cmp(&a.score)
        .then(b.hand_cost.cmp(&a.hand_cost))
        .then(b.first_finisher.cmp(&a.first_finisher))
        .then(a.moves.cmp(&b.moves))
        .then(a.seat.cmp(&b.seat))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::CardUid;
    use crate::games::borscht::cards::CardKind;
    use pretty_assertions::assert_eq;

    fn regular(uid: u32, name: &str, points: i32) -> Card {
        Card::new(CardUid(uid), name, CardKind::Regular { cost: 1, points })
    }

    fn abc() -> Recipe {
        Recipe {
            id: "abc".into(),
            name: "ABC".into(),
            ingredients: vec!["a".into(), "b".into(), "c".into()],
            levels: vec![(2, 3), (3, 5)],
        }
    }

    fn contender(seat: u8, score: i32, hand_cost: u32) -> Contender {
        Contender {
            seat: Seat(seat),
            score,
            hand_cost,
            first_finisher: false,
            moves: 4,
            breakdown: ScoreBreakdown::default(),
        }
    }

    #[test]
    fn test_goal_completion() {
        let mut tableau = Pile::from_cards(vec![regular(1, "a", 1), regular(2, "b", 0), regular(3, "c", 2)]);
        assert!(is_complete(&tableau, &abc()));

        tableau.take(CardUid(2));
        assert!(!is_complete(&tableau, &abc()));
    }

    #[test]
    fn test_wildcard_counts_toward_completion() {
        let tableau = Pile::from_cards(vec![
            regular(1, "a", 1),
            regular(2, "b", 0),
            Card::new(CardUid(3), "vinnik_lard", CardKind::Extra { cost: 6, points: 0, wildcard: true }),
        ]);
        assert!(is_complete(&tableau, &abc()));

        let salted = Pile::from_cards(vec![
            regular(1, "a", 1),
            regular(2, "b", 0),
            Card::new(CardUid(3), "salt", CardKind::Extra { cost: 1, points: 2, wildcard: false }),
        ]);
        assert!(!is_complete(&salted, &abc()));
    }

    #[test]
    fn test_score_breakdown() {
        let tableau = Pile::from_cards(vec![
            regular(1, "a", 1),
            regular(2, "b", 2),
            Card::new(CardUid(3), "salt", CardKind::Extra { cost: 1, points: 2, wildcard: false }),
        ]);

        let breakdown = score(&tableau, Some(&abc()), true, 2);
        assert_eq!(
            breakdown,
            ScoreBreakdown {
                ingredient_points: 5,
                recipe_bonus: 3,
                first_finisher_bonus: 2,
                collected: 2,
                total: 10,
            }
        );
        assert_eq!(score(&tableau, None, false, 2).total, 5);
    }

    #[test]
    fn test_tie_broken_by_hand_cost() {
        let ranked = rank(vec![contender(0, 7, 3), contender(1, 7, 9), contender(2, 5, 20)]);
        let seats: Vec<_> = ranked.iter().map(|c| c.seat).collect();
        assert_eq!(seats, vec![Seat(1), Seat(0), Seat(2)]);
    }

    #[test]
    fn test_later_tie_breaks() {
        let mut finisher = contender(2, 7, 3);
        finisher.first_finisher = true;
        let mut busy = contender(0, 7, 3);
        busy.moves = 9;
        let quiet = contender(1, 7, 3);

        let ranked = rank(vec![busy, quiet, finisher]);
        let seats: Vec<_> = ranked.iter().map(|c| c.seat).collect();
        assert_eq!(seats, vec![Seat(2), Seat(1), Seat(0)]);
    }
}
