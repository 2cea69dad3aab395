//! Validation of player selections with a uniform random fallback.
//!
//! A selection is valid when it names exactly the required number of
//! distinct items from the offered set. Anything else (a timeout, a
//! cancelled request, a malformed or short answer, an unknown or repeated
//! item) falls back to a uniform random pick of the required size. There is
//! no second round of asking.

use serde::de::DeserializeOwned;
use serde_json::Value;

use super::broker::Reply;
use crate::core::GameRng;

/// Items chosen for a request, and whether the fallback picked them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection<T> {
    pub chosen: Vec<T>,
    pub fallback: bool,
}

/// Read `reply[field]` as `count` distinct members of `offered`, or pick
/// them at random.
///
/// `count` is capped at `offered.len()`. A scalar answer counts as a list
/// of one.
pub fn select<T>(reply: &Reply, field: &str, offered: &[T], count: usize, rng: &mut GameRng) -> Selection<T>
where
    T: Clone + PartialEq + DeserializeOwned,
{
    let count = count.min(offered.len());
    match parse_choice(reply, field, offered, count) {
        Some(chosen) => Selection {
            chosen,
            fallback: false,
        },
        None => Selection {
            chosen: rng.sample(offered, count),
            fallback: true,
        },
    }
}

/// Single-item form of [`select`]. `None` only when nothing was offered.
pub fn select_one<T>(reply: &Reply, field: &str, offered: &[T], rng: &mut GameRng) -> Option<T>
where
    T: Clone + PartialEq + DeserializeOwned,
{
    select(reply, field, offered, 1, rng).chosen.into_iter().next()
}

/// Yes/no decision. Anything but an explicit `true` means no.
#[must_use]
pub fn confirm(reply: &Reply, field: &str) -> bool {
    reply
        .answer()
        .and_then(|v| v.get(field))
        .and_then(Value::as_bool)
        .unwrap_or(false)
}

fn parse_choice<T>(reply: &Reply, field: &str, offered: &[T], count: usize) -> Option<Vec<T>>
where
    T: PartialEq + DeserializeOwned,
{
    let raw = reply.answer()?.get(field)?;
    let raw = match raw {
        Value::Array(_) => raw.clone(),
        scalar => Value::Array(vec![scalar.clone()]),
    };
    let chosen: Vec<T> = serde_json::from_value(raw).ok()?;
    if chosen.len() != count {
        return None;
    }
    for (i, item) in chosen.iter().enumerate() {
        if !offered.contains(item) || chosen[..i].contains(item) {
            return None;
        }
    }
    Some(chosen)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::CardUid;
    use serde_json::json;

    fn offered() -> Vec<CardUid> {
        (1..=5).map(CardUid).collect()
    }

    #[test]
    fn test_valid_answer_is_used() {
        let mut rng = GameRng::new(1);
        let reply = Reply::Answered(json!({ "cards": [4, 2] }));

        let sel = select(&reply, "cards", &offered(), 2, &mut rng);
        assert_eq!(sel, Selection { chosen: vec![CardUid(4), CardUid(2)], fallback: false });
    }

    #[test]
    fn test_invalid_answers_fall_back_with_right_cardinality() {
        let mut rng = GameRng::new(1);
        let bad = [
            Reply::TimedOut,
            Reply::Cancelled,
            Reply::Answered(json!({ "cards": [1] })),
            Reply::Answered(json!({ "cards": [1, 1] })),
            Reply::Answered(json!({ "cards": [1, 99] })),
            Reply::Answered(json!({ "cards": "x" })),
            Reply::Answered(json!({ "other": [1, 2] })),
        ];

        for reply in &bad {
            let sel = select(reply, "cards", &offered(), 2, &mut rng);
            assert!(sel.fallback, "{reply:?} should fall back");
            assert_eq!(sel.chosen.len(), 2);
            assert_ne!(sel.chosen[0], sel.chosen[1]);
            assert!(sel.chosen.iter().all(|c| offered().contains(c)));
        }
    }

    #[test]
    fn test_count_is_capped_by_offer() {
        let mut rng = GameRng::new(1);
        let sel = select(&Reply::TimedOut, "cards", &[CardUid(7)], 2, &mut rng);
        assert_eq!(sel.chosen, vec![CardUid(7)]);
    }

    #[test]
    fn test_select_one_accepts_scalar() {
        let mut rng = GameRng::new(1);
        let recipes = vec!["a".to_string(), "b".to_string()];

        let reply = Reply::Answered(json!({ "recipe_id": "b" }));
        assert_eq!(select_one(&reply, "recipe_id", &recipes, &mut rng), Some("b".to_string()));

        let picked = select_one(&Reply::TimedOut, "recipe_id", &recipes, &mut rng);
        assert!(picked.map_or(false, |p| recipes.contains(&p)));

        assert_eq!(select_one::<String>(&Reply::TimedOut, "recipe_id", &[], &mut rng), None);
    }

    #[test]
    fn test_confirm() {
        assert!(confirm(&Reply::Answered(json!({ "defend": true })), "defend"));
        assert!(!confirm(&Reply::Answered(json!({ "defend": "yes" })), "defend"));
        assert!(!confirm(&Reply::TimedOut, "defend"));
    }
}
