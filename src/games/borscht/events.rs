//! Event cards: the dispatch table and the standing modifiers.
//!
//! Events are drawn incidentally and staged by the economy. Once the move
//! that drew them settles, each staged card is looked up in the
//! [`EventTable`] and applied. Standing events register a [`Modifier`] that
//! later decisions consult, one-shot events act immediately.

use futures::future::join_all;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::cards::Card;
use super::Borscht;
use crate::core::{CardUid, Seat, SessionError};
use crate::protocol::select;
use crate::session::{Table, TurnState};

const LOG_TARGET: &str = "games::borscht::events";

/// A rule change that stays in force for the rest of the game.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Modifier {
    ExchangeTax(u32),
    HandLimit(i32),
    MarketCapacity(i32),
    RevealGoals,
    DefenseCost(u32),
}

impl Modifier {
    fn describe(self) -> String {
        match self {
            Modifier::ExchangeTax(n) => format!("exchange tax +{n}"),
            Modifier::HandLimit(n) => format!("hand limit {n:+}"),
            Modifier::MarketCapacity(n) => format!("market capacity {n:+}"),
            Modifier::RevealGoals => "recipes revealed".to_string(),
            Modifier::DefenseCost(n) => format!("defense cost +{n}"),
        }
    }
}

/// Active standing modifiers, in the order they were drawn.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modifiers {
    active: Vec<Modifier>,
}

impl Modifiers {
    pub fn push(&mut self, modifier: Modifier) {
        self.active.push(modifier);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Modifier> {
        self.active.iter()
    }

    #[must_use]
    pub fn exchange_tax(&self, base: u32) -> u32 {
        base + self
            .active
            .iter()
            .map(|m| match m {
                Modifier::ExchangeTax(n) => *n,
                _ => 0,
            })
            .sum::<u32>()
    }

    /// Never below one card.
    #[must_use]
    pub fn hand_limit(&self, base: usize) -> usize {
        Self::adjust(base, self.active.iter().map(|m| match m {
            Modifier::HandLimit(n) => *n,
            _ => 0,
        }))
    }

    /// Never below one card.
    #[must_use]
    pub fn market_capacity(&self, base: usize) -> usize {
        Self::adjust(base, self.active.iter().map(|m| match m {
            Modifier::MarketCapacity(n) => *n,
            _ => 0,
        }))
    }

    #[must_use]
    pub fn goals_revealed(&self) -> bool {
        self.active.contains(&Modifier::RevealGoals)
    }

    #[must_use]
    pub fn defense_cost(&self, base: u32) -> u32 {
        base + self
            .active
            .iter()
            .map(|m| match m {
                Modifier::DefenseCost(n) => *n,
                _ => 0,
            })
            .sum::<u32>()
    }

    pub fn to_json(&self) -> Value {
        Value::Array(self.active.iter().map(|m| json!(m.describe())).collect())
    }

    fn adjust(base: usize, deltas: impl Iterator<Item = i32>) -> usize {
        let total = base as i64 + deltas.map(i64::from).sum::<i64>();
        total.max(1) as usize
    }
}

/// What an event card does.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventRule {
    Standing(Modifier),
    /// Discard the market and lay out a new one.
    SpoilMarket,
    /// Every player still in play discards a card of their choice.
    KitchenCleanup,
}

/// Event name to rule. Saved with the game, so a custom table is still in
/// force after a restore.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventTable {
    rules: FxHashMap<String, EventRule>,
}

impl Default for EventTable {
    fn default() -> Self {
        Self::standard()
    }
}

impl EventTable {
    #[must_use]
    pub fn empty() -> Self {
        Self {
            rules: FxHashMap::default(),
        }
    }

    #[must_use]
    pub fn standard() -> Self {
        Self::empty()
            .with_rule("greedy_merchant", EventRule::Standing(Modifier::ExchangeTax(1)))
            .with_rule("tiny_pot", EventRule::Standing(Modifier::HandLimit(-2)))
            .with_rule("crowded_stall", EventRule::Standing(Modifier::MarketCapacity(-2)))
            .with_rule("talkative_cook", EventRule::Standing(Modifier::RevealGoals))
            .with_rule("sour_milk", EventRule::Standing(Modifier::DefenseCost(1)))
            .with_rule("spoiled_market", EventRule::SpoilMarket)
            .with_rule("kitchen_cleanup", EventRule::KitchenCleanup)
    }

    #[must_use]
    pub fn with_rule(mut self, name: impl Into<String>, rule: EventRule) -> Self {
        self.rules.insert(name.into(), rule);
        self
    }

    #[must_use]
    pub fn rule(&self, name: &str) -> Option<EventRule> {
        self.rules.get(name).copied()
    }

    /// Every event in `names` must have a rule.
    pub fn validate<'a>(&self, names: impl IntoIterator<Item = &'a str>) -> Result<(), SessionError> {
        for name in names {
            if !self.rules.contains_key(name) {
                return Err(SessionError::config(format!("no rule for event card `{name}`")));
            }
        }
        Ok(())
    }
}

impl Borscht {
    /// Resolve every staged event. Resolving one may stage more (a spoiled
    /// market is laid out again from the deck), so this loops until the
    /// staging pile stays empty.
    pub(super) async fn resolve_events(&mut self, table: &mut Table) {
        loop {
            let staged = self.economy.take_staged_events();
            if staged.is_empty() {
                break;
            }
            for card in staged {
                self.resolve_event(table, card).await;
            }
        }
    }

    async fn resolve_event(&mut self, table: &mut Table, card: Card) {
        let effect = match self.events.rule(&card.name) {
            Some(EventRule::Standing(modifier)) => {
                self.modifiers.push(modifier);
                modifier.describe()
            }
            Some(EventRule::SpoilMarket) => {
                let capacity = self.market_capacity();
                self.economy.refresh_market(capacity, &mut table.rng);
                "market spoiled and laid out again".to_string()
            }
            Some(EventRule::KitchenCleanup) => {
                self.kitchen_cleanup(table).await;
                "every player discarded a card".to_string()
            }
            None => {
                tracing::warn!(target: LOG_TARGET, event = %card.name, "event card without a rule");
                "no effect".to_string()
            }
        };
        tracing::debug!(target: LOG_TARGET, room = %table.room_id(), event = %card.name, %effect, "event resolved");
        let card_json = card.to_json();
        self.economy.discard_cards([card]);
        table
            .broadcast(json!({ "type": "event_resolved", "card": card_json, "effect": effect }))
            .await;
    }

    async fn kitchen_cleanup(&mut self, table: &mut Table) {
        let targets: Vec<Seat> = Seat::all(table.player_count())
            .filter(|&seat| !table.turn.is_frozen(seat) && !self.hands[seat].is_empty())
            .collect();
        if targets.is_empty() {
            return;
        }

        table.turn.enter(TurnState::WaitingForDiscard);
        let replies = {
            let shared: &Table = table;
            let hands = &self.hands;
            join_all(targets.iter().map(|&seat| {
                let cards: Vec<Value> = hands[seat].iter().map(Card::to_json).collect();
                shared.ask(
                    seat,
                    "discard_selection",
                    json!({ "reason": "kitchen_cleanup", "cards": cards, "count": 1 }),
                )
            }))
            .await
        };
        table.turn.restore();

        for (seat, reply) in targets.into_iter().zip(replies) {
            let offered: Vec<CardUid> = self.hands[seat].uids();
            let selection = select(&reply, "cards", &offered, 1, &mut table.rng);
            let discarded = self.hands[seat].take_all(&selection.chosen).unwrap_or_default();
            let count = discarded.len();
            self.economy.discard_cards(discarded);
            table
                .broadcast(json!({
                    "type": "cards_discarded",
                    "player": table.player(seat),
                    "reason": "kitchen_cleanup",
                    "count": count,
                }))
                .await;
        }
    }
}
