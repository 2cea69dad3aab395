//! The shared card economy: deck, market, discard and staged events.
//!
//! Cards flow deck → hands/market → discard and back into the deck when it
//! runs dry. Event cards never reach a hand: a draw diverts them into the
//! `events` staging pile, where they wait until the current move settles.
//! Once resolved they sit in the discard pile for good, since a reshuffle
//! only recycles non-event cards.

use serde::{Deserialize, Serialize};

use super::pile::Pile;
use crate::core::{CardUid, GameRng, Identified, MoveError};

/// What the economy needs to know about a card.
pub trait EconomyCard: Identified {
    /// Event cards are diverted on draw and never reshuffled.
    fn is_event(&self) -> bool;
    /// Exchange value.
    fn cost(&self) -> u32;
    /// Name shared by all copies of the same card.
    fn label(&self) -> &str;
}

/// Shared piles of one session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Economy<C> {
    pub deck: Pile<C>,
    pub market: Pile<C>,
    pub discard: Pile<C>,
    /// Event cards drawn but not yet resolved.
    pub events: Pile<C>,
}

impl<C: EconomyCard> Economy<C> {
    /// Start with every card in the deck, last card on top.
    #[must_use]
    pub fn new(deck: Vec<C>) -> Self {
        Self {
            deck: Pile::from_cards(deck),
            market: Pile::new(),
            discard: Pile::new(),
            events: Pile::new(),
        }
    }

    /// Number of cards in the shared area (everything not in a player's
    /// hand or tableau).
    #[must_use]
    pub fn shared_count(&self) -> usize {
        self.deck.len() + self.market.len() + self.discard.len() + self.events.len()
    }

    /// True if at least one non-event card could still be drawn.
    #[must_use]
    pub fn can_draw(&self) -> bool {
        self.deck.iter().any(|c| !c.is_event()) || self.discard.iter().any(|c| !c.is_event())
    }

    /// Draw up to `n` non-event cards.
    ///
    /// Event cards met on the way go to the staging pile and do not count
    /// toward `n`. An empty deck is refilled from the discard pile; if that
    /// yields nothing the result is short.
    pub fn draw(&mut self, n: usize, rng: &mut GameRng) -> Vec<C> {
        let mut drawn = Vec::with_capacity(n);
        while drawn.len() < n {
            match self.deck.pop_top() {
                Some(card) if card.is_event() => self.events.insert(card, super::PilePosition::Top),
                Some(card) => drawn.push(card),
                None => {
                    if self.reshuffle(rng) == 0 {
                        break;
                    }
                }
            }
        }
        drawn
    }

    /// Lift the non-event cards among the top `n` of the deck, top first.
    ///
    /// Nothing is reshuffled and event cards in that range stay where they
    /// are, so looking at the deck never triggers an event.
    pub fn take_top(&mut self, n: usize) -> Vec<C> {
        let uids: Vec<CardUid> = self
            .deck
            .iter()
            .rev()
            .take(n)
            .filter(|c| !c.is_event())
            .map(Identified::uid)
            .collect();
        uids.into_iter().filter_map(|uid| self.deck.take(uid)).collect()
    }

    /// Move the non-event discard back into the deck and shuffle it.
    ///
    /// Returns the number of cards recycled.
    pub fn reshuffle(&mut self, rng: &mut GameRng) -> usize {
        let recycled = self.discard.take_where(|c| !c.is_event());
        let count = recycled.len();
        if count > 0 {
            self.deck.extend(recycled);
            self.deck.shuffle(rng);
            tracing::debug!(target: "zones::economy", recycled = count, "discard reshuffled into deck");
        }
        count
    }

    /// Top the market up to `capacity`. Returns the number of cards added.
    pub fn refill_market(&mut self, capacity: usize, rng: &mut GameRng) -> usize {
        let missing = capacity.saturating_sub(self.market.len());
        if missing == 0 {
            return 0;
        }
        let cards = self.draw(missing, rng);
        let added = cards.len();
        self.market.extend(cards);
        added
    }

    /// Discard the whole market and lay out a fresh one.
    pub fn refresh_market(&mut self, capacity: usize, rng: &mut GameRng) {
        let old = self.market.drain_all();
        self.discard.extend(old);
        self.refill_market(capacity, rng);
    }

    /// Cards above capacity that must be trimmed.
    #[must_use]
    pub fn market_excess(&self, capacity: usize) -> usize {
        self.market.len().saturating_sub(capacity)
    }

    /// A label present at least `copies` times in the market, if any.
    #[must_use]
    pub fn repeated_in_market(&self, copies: usize) -> Option<&str> {
        self.market
            .iter()
            .map(EconomyCard::label)
            .find(|label| self.market.iter().filter(|c| c.label() == *label).count() >= copies)
    }

    pub fn discard_cards(&mut self, cards: impl IntoIterator<Item = C>) {
        self.discard.extend(cards);
    }

    /// Hand over staged events for resolution, oldest first.
    pub fn take_staged_events(&mut self) -> Vec<C> {
        self.events.drain_all()
    }
}

/// Why an exchange is illegal.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExchangeError {
    #[error("both sides of an exchange need at least one card")]
    EmptySide,
    #[error("exchange must be one card for many or many cards for one")]
    NotOneToMany,
    #[error("offered value {offered} is below the required {required}")]
    InsufficientValue { offered: u32, required: u32 },
}

impl From<ExchangeError> for MoveError {
    fn from(err: ExchangeError) -> Self {
        MoveError::Invalid(err.to_string())
    }
}

/// Legality of swapping `offered` hand cards for `requested` market cards.
///
/// Legal when one side holds a single card and the offered cost covers the
/// requested cost plus `tax`.
pub fn check_exchange<C: EconomyCard>(
    offered: &[&C],
    requested: &[&C],
    tax: u32,
) -> Result<(), ExchangeError> {
    if offered.is_empty() || requested.is_empty() {
        return Err(ExchangeError::EmptySide);
    }
    if offered.len() > 1 && requested.len() > 1 {
        return Err(ExchangeError::NotOneToMany);
    }
    let offered_cost: u32 = offered.iter().map(|c| c.cost()).sum();
    let required: u32 = requested.iter().map(|c| c.cost()).sum::<u32>() + tax;
    if offered_cost < required {
        return Err(ExchangeError::InsufficientValue {
            offered: offered_cost,
            required,
        });
    }
    Ok(())
}
