//! Ordered card containers.
//!
//! A `Pile` owns its cards. Moving a card between piles moves the value, so
//! a card is always in exactly one place and the total number of cards in a
//! session never changes. The top of a pile is the end of the vector.
//!
//! ```
//! use ccg_session::core::{CardUid, Identified};
//! use ccg_session::zones::{Pile, PilePosition};
//!
//! #[derive(Debug, Clone)]
//! struct Token(u32);
//! impl Identified for Token {
//!     fn uid(&self) -> CardUid { CardUid(self.0) }
//! }
//!
//! let mut deck = Pile::from_cards(vec![Token(1), Token(2)]);
//! let mut hand = Pile::new();
//!
//! let top = deck.pop_top().unwrap();
//! hand.insert(top, PilePosition::Top);
//! assert_eq!(hand.uids(), vec![CardUid(2)]);
//! assert_eq!(deck.len() + hand.len(), 2);
//! ```

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::core::{CardUid, GameRng, Identified};

/// Position for inserting a card into a pile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PilePosition {
    /// Add on top (drawn next).
    Top,
    /// Add at the bottom.
    Bottom,
    /// Insert at a specific index (0 = bottom).
    Index(usize),
}

/// Short list of uids, as sent in most move payloads.
pub type UidList = SmallVec<[CardUid; 4]>;

/// An ordered multiset of cards.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pile<C> {
    cards: Vec<C>,
}

impl<C> Default for Pile<C> {
    fn default() -> Self {
        Self { cards: Vec::new() }
    }
}

impl<C: Identified> Pile<C> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a pile from cards, the last element ending up on top.
    #[must_use]
    pub fn from_cards(cards: Vec<C>) -> Self {
        Self { cards }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cards.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &C> {
        self.cards.iter()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[C] {
        &self.cards
    }

    #[must_use]
    pub fn uids(&self) -> Vec<CardUid> {
        self.cards.iter().map(Identified::uid).collect()
    }

    #[must_use]
    pub fn contains(&self, uid: CardUid) -> bool {
        self.cards.iter().any(|c| c.uid() == uid)
    }

    #[must_use]
    pub fn get(&self, uid: CardUid) -> Option<&C> {
        self.cards.iter().find(|c| c.uid() == uid)
    }

    #[must_use]
    pub fn top(&self) -> Option<&C> {
        self.cards.last()
    }

    pub fn insert(&mut self, card: C, position: PilePosition) {
        match position {
            PilePosition::Top => self.cards.push(card),
            PilePosition::Bottom => self.cards.insert(0, card),
            PilePosition::Index(i) => {
                let idx = i.min(self.cards.len());
                self.cards.insert(idx, card);
            }
        }
    }

    /// Put cards on top, the last one ending up topmost.
    pub fn extend(&mut self, cards: impl IntoIterator<Item = C>) {
        self.cards.extend(cards);
    }

    pub fn pop_top(&mut self) -> Option<C> {
        self.cards.pop()
    }

    /// Remove a specific card.
    pub fn take(&mut self, uid: CardUid) -> Option<C> {
        let idx = self.cards.iter().position(|c| c.uid() == uid)?;
        Some(self.cards.remove(idx))
    }

    /// Remove several cards at once, or none of them.
    ///
    /// Fails without touching the pile when a uid is missing or listed twice.
    pub fn take_all(&mut self, uids: &[CardUid]) -> Option<Vec<C>> {
        if !self.holds_all(uids) {
            return None;
        }
        Some(uids.iter().filter_map(|&uid| self.take(uid)).collect())
    }

    /// True when every uid is present and none is listed twice.
    #[must_use]
    pub fn holds_all(&self, uids: &[CardUid]) -> bool {
        let mut seen: UidList = SmallVec::new();
        for &uid in uids {
            if seen.contains(&uid) || !self.contains(uid) {
                return false;
            }
            seen.push(uid);
        }
        true
    }

    /// Remove and return every card matching `pred`, keeping the order of
    /// the rest.
    pub fn take_where(&mut self, mut pred: impl FnMut(&C) -> bool) -> Vec<C> {
        let mut taken = Vec::new();
        let mut kept = Vec::with_capacity(self.cards.len());
        for card in self.cards.drain(..) {
            if pred(&card) {
                taken.push(card);
            } else {
                kept.push(card);
            }
        }
        self.cards = kept;
        taken
    }

    /// Empty the pile, bottom card first.
    pub fn drain_all(&mut self) -> Vec<C> {
        std::mem::take(&mut self.cards)
    }

    pub fn shuffle(&mut self, rng: &mut GameRng) {
        rng.shuffle(&mut self.cards);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Token(u32);

    impl Identified for Token {
        fn uid(&self) -> CardUid {
            CardUid(self.0)
        }
    }

    fn pile(ids: &[u32]) -> Pile<Token> {
        Pile::from_cards(ids.iter().copied().map(Token).collect())
    }

    fn raw(p: &Pile<Token>) -> Vec<u32> {
        p.iter().map(|t| t.0).collect()
    }

    #[test]
    fn test_insert_positions() {
        let mut p = pile(&[1, 2]);
        p.insert(Token(3), PilePosition::Top);
        p.insert(Token(0), PilePosition::Bottom);
        p.insert(Token(9), PilePosition::Index(2));
        p.insert(Token(8), PilePosition::Index(100));

        assert_eq!(raw(&p), vec![0, 1, 9, 2, 3, 8]);
        assert_eq!(p.top().map(|t| t.0), Some(8));
    }

    #[test]
    fn test_take_specific_card() {
        let mut p = pile(&[1, 2, 3]);

        assert_eq!(p.take(CardUid(2)), Some(Token(2)));
        assert_eq!(p.take(CardUid(2)), None);
        assert_eq!(raw(&p), vec![1, 3]);
    }

    #[test]
    fn test_take_all_is_atomic() {
        let mut p = pile(&[1, 2, 3]);

        assert!(p.take_all(&[CardUid(1), CardUid(7)]).is_none());
        assert!(p.take_all(&[CardUid(1), CardUid(1)]).is_none());
        assert_eq!(p.len(), 3);

        let taken = p.take_all(&[CardUid(3), CardUid(1)]).unwrap();
        assert_eq!(taken, vec![Token(3), Token(1)]);
        assert_eq!(raw(&p), vec![2]);
    }

    #[test]
    fn test_take_where_keeps_order() {
        let mut p = pile(&[1, 2, 3, 4, 5]);
        let evens = p.take_where(|t| t.0 % 2 == 0);

        assert_eq!(evens, vec![Token(2), Token(4)]);
        assert_eq!(raw(&p), vec![1, 3, 5]);
    }

    #[test]
    fn test_pop_and_drain() {
        let mut p = pile(&[1, 2]);
        assert_eq!(p.pop_top(), Some(Token(2)));

        let rest = p.drain_all();
        assert_eq!(rest, vec![Token(1)]);
        assert!(p.is_empty());
        assert_eq!(p.pop_top(), None);
    }

    #[test]
    fn test_shuffle_keeps_cards() {
        let mut rng = GameRng::new(42);
        let mut p = pile(&(1..=20).collect::<Vec<_>>());

        p.shuffle(&mut rng);
        assert_eq!(p.len(), 20);
        assert_ne!(raw(&p), (1..=20).collect::<Vec<_>>());

        let mut sorted = raw(&p);
        sorted.sort_unstable();
        assert_eq!(sorted, (1..=20).collect::<Vec<_>>());
    }
}
