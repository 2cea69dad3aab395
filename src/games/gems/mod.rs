//! Gems: buy development cards with gem tokens, attract nobles.
//!
//! Players take tokens from a shared bank, reserve cards for later and buy
//! cards whose permanent bonuses discount every later purchase. Nobles
//! visit whoever owns enough bonuses. Reaching the prestige target starts
//! the final round.
//!
//! Follow-up decisions are move-driven: a player over the token limit is
//! left in `WaitingForDiscard` until they send `return_tokens`, and a
//! player eligible for more than one noble is left in
//! `WaitingForSelection` until they send `select_noble`.
//!
//! ## Moves
//!
//! | action | legal while |
//! |---|---|
//! | `take_different_gems` | normal turn |
//! | `take_same_gems` | normal turn |
//! | `reserve_card` | normal turn |
//! | `purchase_card` | normal turn |
//! | `return_tokens` | waiting for discard |
//! | `select_noble` | waiting for selection |

pub mod catalog;
mod rules;
pub mod tokens;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::core::{MoveError, PlayerMap, Seat, SessionError, UidAllocator};
use crate::session::{MoveOutcome, MoveTable, Standing, Table, TurnState, Variant};
use crate::zones::Pile;

pub use catalog::{GemCard, Noble};
pub use tokens::{Gem, TokenSet};

const LOG_TARGET: &str = "games::gems";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GemsSettings {
    /// Most tokens a player may hold at the end of a turn.
    pub token_limit: u32,
    pub prestige_to_win: i32,
    /// Face-up cards per level.
    pub visible_cards: usize,
    pub gold_tokens: u32,
    pub max_reserved: usize,
}

impl Default for GemsSettings {
    fn default() -> Self {
        Self {
            token_limit: 10,
            prestige_to_win: 15,
            visible_cards: 4,
            gold_tokens: 5,
            max_reserved: 3,
        }
    }
}

impl GemsSettings {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_prestige_to_win(mut self, prestige: i32) -> Self {
        self.prestige_to_win = prestige;
        self
    }

    #[must_use]
    pub fn with_token_limit(mut self, limit: u32) -> Self {
        self.token_limit = limit;
        self
    }

    pub fn validate(&self) -> Result<(), SessionError> {
        if self.token_limit < 3 {
            return Err(SessionError::config("token limit must allow taking three gems"));
        }
        if self.prestige_to_win <= 0 || self.visible_cards == 0 {
            return Err(SessionError::config("prestige target and visible cards must be positive"));
        }
        Ok(())
    }
}

/// Tokens of each color in the bank for a table of `players`.
#[must_use]
pub fn gems_per_color(players: usize) -> u32 {
    match players {
        0..=2 => 4,
        3 => 5,
        _ => 7,
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GemsAction {
    TakeDifferentGems,
    TakeSameGems,
    ReserveCard,
    PurchaseCard,
    ReturnTokens,
    SelectNoble,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Gems {
    settings: GemsSettings,
    bank: TokenSet,
    /// Face-down decks, level 1 first.
    decks: Vec<Pile<GemCard>>,
    /// Face-up rows. A bought card is replaced in place.
    rows: Vec<Vec<GemCard>>,
    nobles: Vec<Noble>,
    tokens: PlayerMap<TokenSet>,
    reserved: PlayerMap<Vec<GemCard>>,
    purchased: PlayerMap<Vec<GemCard>>,
    visitors: PlayerMap<Vec<Noble>>,
    card_total: usize,
    token_total: u32,
}

impl Gems {
    #[must_use]
    pub fn settings(&self) -> &GemsSettings {
        &self.settings
    }

    #[must_use]
    pub fn bank(&self) -> &TokenSet {
        &self.bank
    }

    #[must_use]
    pub fn tokens(&self, seat: Seat) -> &TokenSet {
        &self.tokens[seat]
    }

    /// Face-up cards of `level` (1 to 3).
    #[must_use]
    pub fn row(&self, level: usize) -> &[GemCard] {
        &self.rows[level - 1]
    }

    #[must_use]
    pub fn deck_len(&self, level: usize) -> usize {
        self.decks[level - 1].len()
    }

    #[must_use]
    pub fn reserved(&self, seat: Seat) -> &[GemCard] {
        &self.reserved[seat]
    }

    #[must_use]
    pub fn purchased(&self, seat: Seat) -> &[GemCard] {
        &self.purchased[seat]
    }

    /// Nobles still on the table.
    #[must_use]
    pub fn nobles(&self) -> &[Noble] {
        &self.nobles
    }

    #[must_use]
    pub fn visitors(&self, seat: Seat) -> &[Noble] {
        &self.visitors[seat]
    }

    /// Permanent discount per color from bought cards.
    #[must_use]
    pub fn bonuses(&self, seat: Seat) -> TokenSet {
        self.purchased[seat]
            .iter()
            .fold(TokenSet::new(), |set, card| set.with(card.bonus, 1))
    }

    #[must_use]
    pub fn prestige(&self, seat: Seat) -> i32 {
        let cards: i32 = self.purchased[seat].iter().map(|c| c.points).sum();
        let nobles: i32 = self.visitors[seat].iter().map(|n| n.points).sum();
        cards + nobles
    }

    #[must_use]
    pub fn card_total(&self) -> usize {
        self.card_total
    }

    #[must_use]
    pub fn cards_in_play(&self) -> usize {
        self.decks.iter().map(Pile::len).sum::<usize>()
            + self.rows.iter().map(Vec::len).sum::<usize>()
            + self.reserved.values().map(Vec::len).sum::<usize>()
            + self.purchased.values().map(Vec::len).sum::<usize>()
    }

    #[must_use]
    pub fn tokens_in_play(&self) -> u32 {
        self.bank.total() + self.tokens.values().map(TokenSet::total).sum::<u32>()
    }

    fn excess_tokens(&self, seat: Seat) -> u32 {
        self.tokens[seat].total().saturating_sub(self.settings.token_limit)
    }

    fn return_prompt(&self, seat: Seat) -> Value {
        json!({
            "type": "token_return_required",
            "tokens_to_return": self.excess_tokens(seat),
            "tokens": self.tokens[seat].to_json(),
        })
    }

    fn noble_prompt(&self, seat: Seat) -> Value {
        let eligible: Vec<Value> = self
            .nobles
            .iter()
            .filter(|n| self.bonuses(seat).covers(&n.requires))
            .map(Noble::to_json)
            .collect();
        json!({ "type": "noble_selection_required", "nobles": eligible })
    }

    fn seat_json(&self, table: &Table, seat: Seat, viewer: Seat) -> Value {
        let reserved: Value = if seat == viewer {
            self.reserved[seat].iter().map(GemCard::to_json).collect()
        } else {
            Value::Null
        };
        json!({
            "player": table.player(seat),
            "tokens": self.tokens[seat].to_json(),
            "token_count": self.tokens[seat].total(),
            "bonuses": self.bonuses(seat).to_json(),
            "prestige": self.prestige(seat),
            "purchased_count": self.purchased[seat].len(),
            "reserved_count": self.reserved[seat].len(),
            "reserved": reserved,
            "nobles": self.visitors[seat].iter().map(|n| n.id.as_str()).collect::<Vec<_>>(),
        })
    }
}

#[async_trait]
impl Variant for Gems {
    type Action = GemsAction;
    type Settings = GemsSettings;

    const NAME: &'static str = "gems";
    const MIN_PLAYERS: usize = 2;
    const MAX_PLAYERS: usize = 4;

    fn move_table() -> MoveTable<GemsAction> {
        use TurnState::{NormalTurn, WaitingForDiscard, WaitingForSelection};
        MoveTable::new()
            .with("take_different_gems", GemsAction::TakeDifferentGems, &[NormalTurn])
            .with("take_same_gems", GemsAction::TakeSameGems, &[NormalTurn])
            .with("reserve_card", GemsAction::ReserveCard, &[NormalTurn])
            .with("purchase_card", GemsAction::PurchaseCard, &[NormalTurn])
            .with("return_tokens", GemsAction::ReturnTokens, &[WaitingForDiscard])
            .with("select_noble", GemsAction::SelectNoble, &[WaitingForSelection])
    }

    fn setup(settings: GemsSettings, table: &mut Table) -> Result<Self, SessionError> {
        settings.validate()?;
        let players = table.player_count();
        let mut uids = UidAllocator::new();

        let mut decks = Vec::with_capacity(catalog::LEVELS);
        let mut rows: Vec<Vec<GemCard>> = Vec::with_capacity(catalog::LEVELS);
        for level in 1..=catalog::LEVELS as u8 {
            let mut cards = catalog::level_cards(level, &mut uids);
            table.rng.shuffle(&mut cards);
            let mut deck = Pile::from_cards(cards);
            rows.push((0..settings.visible_cards).filter_map(|_| deck.pop_top()).collect());
            decks.push(deck);
        }

        let mut nobles = catalog::nobles();
        table.rng.shuffle(&mut nobles);
        nobles.truncate(players + 1);

        let bank = TokenSet::of_colors(gems_per_color(players)).with(Gem::Gold, settings.gold_tokens);
        Ok(Self {
            token_total: bank.total(),
            bank,
            decks,
            rows,
            nobles,
            tokens: PlayerMap::with_default(players),
            reserved: PlayerMap::with_default(players),
            purchased: PlayerMap::with_default(players),
            visitors: PlayerMap::with_default(players),
            card_total: uids.allocated() as usize,
            settings,
        })
    }

    fn validate(&self) -> Result<(), SessionError> {
        if self.cards_in_play() != self.card_total {
            return Err(SessionError::snapshot(format!(
                "{} cards in play, expected {}",
                self.cards_in_play(),
                self.card_total
            )));
        }
        if self.tokens_in_play() != self.token_total {
            return Err(SessionError::snapshot(format!(
                "{} tokens in play, expected {}",
                self.tokens_in_play(),
                self.token_total
            )));
        }
        Ok(())
    }

    async fn handle(
        &mut self,
        table: &mut Table,
        seat: Seat,
        action: GemsAction,
        payload: &Value,
    ) -> Result<MoveOutcome, MoveError> {
        match action {
            GemsAction::TakeDifferentGems => self.take_different(table, seat, payload).await,
            GemsAction::TakeSameGems => self.take_same(table, seat, payload).await,
            GemsAction::ReserveCard => self.reserve(table, seat, payload).await,
            GemsAction::PurchaseCard => self.purchase(table, seat, payload).await,
            GemsAction::ReturnTokens => self.return_tokens(table, seat, payload).await,
            GemsAction::SelectNoble => self.select_noble(table, seat, payload).await,
        }
    }

    fn is_complete(&self, seat: Seat) -> bool {
        self.prestige(seat) >= self.settings.prestige_to_win
    }

    /// Prestige first, then fewer bought cards.
    fn standings(&self, table: &Table) -> Vec<Standing> {
        let mut seats: Vec<Seat> = Seat::all(table.player_count()).collect();
        seats.sort_by_key(|&seat| {
            (
                std::cmp::Reverse(self.prestige(seat)),
                self.purchased[seat].len(),
                seat,
            )
        });
        seats
            .into_iter()
            .map(|seat| {
                let card_points: i32 = self.purchased[seat].iter().map(|c| c.points).sum();
                Standing {
                    seat,
                    player: table.player(seat),
                    score: self.prestige(seat),
                    breakdown: json!({
                        "card_points": card_points,
                        "noble_points": self.prestige(seat) - card_points,
                        "cards_purchased": self.purchased[seat].len(),
                        "nobles": self.visitors[seat].len(),
                    }),
                }
            })
            .collect()
    }

    fn view(&self, table: &Table, viewer: Seat) -> Value {
        let rows: Vec<Vec<Value>> = self
            .rows
            .iter()
            .map(|row| row.iter().map(GemCard::to_json).collect())
            .collect();
        let seats: Vec<Value> = Seat::all(table.player_count())
            .map(|seat| self.seat_json(table, seat, viewer))
            .collect();
        json!({
            "bank": self.bank.to_json(),
            "decks": self.decks.iter().map(Pile::len).collect::<Vec<_>>(),
            "rows": rows,
            "nobles": self.nobles.iter().map(Noble::to_json).collect::<Vec<_>>(),
            "token_limit": self.settings.token_limit,
            "prestige_to_win": self.settings.prestige_to_win,
            "tokens": self.tokens[viewer].to_json(),
            "reserved": self.reserved[viewer].iter().map(GemCard::to_json).collect::<Vec<_>>(),
            "seats": seats,
        })
    }

    fn prompts(&self, table: &Table, seat: Seat) -> Vec<Value> {
        if table.turn.current() != seat {
            return Vec::new();
        }
        match table.turn.state() {
            TurnState::WaitingForDiscard => vec![self.return_prompt(seat)],
            TurnState::WaitingForSelection => vec![self.noble_prompt(seat)],
            _ => Vec::new(),
        }
    }

    async fn on_restore(&mut self, table: &mut Table) -> bool {
        let seat = table.turn.current();
        match table.turn.state() {
            TurnState::WaitingForDiscard => {
                self.return_random_tokens(table, seat).await;
                table.turn.restore();
                self.award_random_noble(table, seat).await;
                true
            }
            TurnState::WaitingForSelection => {
                table.turn.restore();
                self.award_random_noble(table, seat).await;
                true
            }
            _ => false,
        }
    }
}
