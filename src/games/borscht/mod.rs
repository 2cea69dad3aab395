//! Borscht: collect the ingredients of a secret recipe.
//!
//! Each player picks one of three recipes at the start and builds a borscht
//! (their tableau) out of ingredient cards. Cards come from draws, from
//! exchanges with a shared market and from special cards played against
//! opponents. The first player whose borscht holds as many recipe-worthy
//! ingredients as the recipe lists triggers the final round.
//!
//! ## Key Types
//!
//! - `Borscht`: Variant state (economy, hands, borschts, recipes, modifiers)
//! - `BorschtSettings`: Rule knobs read from the room settings
//! - `BorschtAction`: Wire actions
//! - `Card` / `CardKind` / `Recipe`: Card model
//! - `EventTable` / `Modifiers`: Event dispatch and standing rule changes
//!
//! ## Moves
//!
//! | action | legal while |
//! |---|---|
//! | `add_ingredient` | normal turn |
//! | `draw_cards` | normal turn |
//! | `play_special` | normal turn |
//! | `exchange_ingredients` | normal turn, waiting for exchange |
//! | `skip` | normal turn, waiting for exchange |
//! | `free_market_refresh` | normal turn |

pub mod cards;
pub mod catalog;
mod effects;
pub mod events;
mod rules;
pub mod scoring;
mod view;

use async_trait::async_trait;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::core::{CardUid, MoveError, PlayerMap, Seat, SessionError, UidAllocator};
use crate::protocol::{select_one, Reply};
use crate::session::{MoveOutcome, MoveTable, Standing, Table, TurnState, Variant};
use crate::zones::{Economy, Pile, PilePosition};

pub use cards::{Card, CardKind, Effect, Recipe};
pub use events::{EventRule, EventTable, Modifier, Modifiers};
pub use scoring::ScoreBreakdown;

const LOG_TARGET: &str = "games::borscht";

/// Rule settings. Every field has a default, so a room may set any subset.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BorschtSettings {
    /// Recipes offered to each player at the start.
    pub recipe_options: usize,
    pub market_capacity: usize,
    pub hand_limit: usize,
    pub starting_hand: usize,
    /// Extra value an exchange must cover on top of the requested cards.
    pub exchange_tax: u32,
    pub draw_count: usize,
    /// Sour creams consumed by one defense.
    pub defense_cost: u32,
    pub first_finisher_bonus: i32,
    /// Shuffle event cards into the deck.
    pub event_cards: bool,
}

impl Default for BorschtSettings {
    fn default() -> Self {
        Self {
            recipe_options: 3,
            market_capacity: 8,
            hand_limit: 8,
            starting_hand: 5,
            exchange_tax: 0,
            draw_count: 2,
            defense_cost: 1,
            first_finisher_bonus: 2,
            event_cards: true,
        }
    }
}

impl BorschtSettings {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_market_capacity(mut self, capacity: usize) -> Self {
        self.market_capacity = capacity;
        self
    }

    #[must_use]
    pub fn with_hand_limit(mut self, limit: usize) -> Self {
        self.hand_limit = limit;
        self
    }

    #[must_use]
    pub fn with_starting_hand(mut self, cards: usize) -> Self {
        self.starting_hand = cards;
        self
    }

    #[must_use]
    pub fn with_exchange_tax(mut self, tax: u32) -> Self {
        self.exchange_tax = tax;
        self
    }

    #[must_use]
    pub fn with_event_cards(mut self, enabled: bool) -> Self {
        self.event_cards = enabled;
        self
    }

    pub fn validate(&self) -> Result<(), SessionError> {
        if self.recipe_options == 0 {
            return Err(SessionError::config("at least one recipe must be offered"));
        }
        if self.market_capacity == 0 || self.hand_limit == 0 {
            return Err(SessionError::config("market capacity and hand limit must be positive"));
        }
        if self.starting_hand > self.hand_limit {
            return Err(SessionError::config("starting hand exceeds the hand limit"));
        }
        if self.draw_count == 0 || self.defense_cost == 0 {
            return Err(SessionError::config("draw count and defense cost must be positive"));
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BorschtAction {
    AddIngredient,
    DrawCards,
    PlaySpecial,
    ExchangeIngredients,
    Skip,
    FreeMarketRefresh,
}

/// Variant state of one Borscht game.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Borscht {
    settings: BorschtSettings,
    economy: Economy<Card>,
    hands: PlayerMap<Pile<Card>>,
    tableaus: PlayerMap<Pile<Card>>,
    recipes: PlayerMap<Option<Recipe>>,
    /// Recipes offered and not yet chosen from.
    offers: PlayerMap<Vec<Recipe>>,
    modifiers: Modifiers,
    /// Turn number in which the free market refresh was last used.
    free_refresh_turn: Option<u32>,
    card_total: usize,
    #[serde(default)]
    events: EventTable,
}

impl Borscht {
    #[must_use]
    pub fn settings(&self) -> &BorschtSettings {
        &self.settings
    }

    #[must_use]
    pub fn economy(&self) -> &Economy<Card> {
        &self.economy
    }

    #[must_use]
    pub fn hand(&self, seat: Seat) -> &Pile<Card> {
        &self.hands[seat]
    }

    #[must_use]
    pub fn tableau(&self, seat: Seat) -> &Pile<Card> {
        &self.tableaus[seat]
    }

    #[must_use]
    pub fn recipe(&self, seat: Seat) -> Option<&Recipe> {
        self.recipes[seat].as_ref()
    }

    #[must_use]
    pub fn modifiers(&self) -> &Modifiers {
        &self.modifiers
    }

    /// Cards created at setup.
    #[must_use]
    pub fn card_total(&self) -> usize {
        self.card_total
    }

    /// Cards currently held anywhere. Always equals `card_total`.
    #[must_use]
    pub fn cards_in_play(&self) -> usize {
        self.economy.shared_count()
            + self.hands.values().map(Pile::len).sum::<usize>()
            + self.tableaus.values().map(Pile::len).sum::<usize>()
    }

    /// Replace the event dispatch table.
    #[must_use]
    pub fn with_events(mut self, events: EventTable) -> Self {
        self.events = events;
        self
    }

    /// Assign a recipe directly, skipping the selection request.
    pub fn set_recipe(&mut self, seat: Seat, recipe: Recipe) {
        self.offers[seat].clear();
        self.recipes[seat] = Some(recipe);
    }

    /// Move the first shared copy of `name` (deck, then market, then
    /// discard) into the hand of `seat`. Used to script games.
    pub fn give_card(&mut self, seat: Seat, name: &str) -> Option<CardUid> {
        let economy = &mut self.economy;
        let card = [&mut economy.deck, &mut economy.market, &mut economy.discard]
            .into_iter()
            .find_map(|pile| {
                let uid = pile.iter().find(|c| c.name == name)?.uid;
                pile.take(uid)
            })?;
        let uid = card.uid;
        self.hands[seat].insert(card, PilePosition::Top);
        Some(uid)
    }

    pub(crate) fn market_capacity(&self) -> usize {
        self.modifiers.market_capacity(self.settings.market_capacity)
    }

    pub(crate) fn hand_limit(&self) -> usize {
        self.modifiers.hand_limit(self.settings.hand_limit)
    }

    pub(crate) fn exchange_tax(&self) -> u32 {
        self.modifiers.exchange_tax(self.settings.exchange_tax)
    }

    fn defense_cost(&self) -> usize {
        self.modifiers.defense_cost(self.settings.defense_cost) as usize
    }

    fn require_recipe(&self, seat: Seat) -> Result<&Recipe, MoveError> {
        self.recipe(seat)
            .ok_or_else(|| MoveError::invalid("No recipe chosen yet"))
    }

    /// Apply a recipe choice, or pick one at random from the offer.
    fn choose_recipe(&mut self, seat: Seat, reply: &Reply, table: &mut Table) -> Option<Recipe> {
        let offer = std::mem::take(&mut self.offers[seat]);
        let ids: Vec<String> = offer.iter().map(|r| r.id.clone()).collect();
        let chosen = select_one(reply, "recipe_id", &ids, &mut table.rng)?;
        let recipe = offer.into_iter().find(|r| r.id == chosen)?;
        self.recipes[seat] = Some(recipe.clone());
        Some(recipe)
    }

    async fn announce_recipe(table: &mut Table, seat: Seat, recipe: &Recipe) {
        table
            .send(seat, json!({ "type": "recipe_selected", "recipe": recipe.to_json() }))
            .await;
    }
}

/// `payload[field]` as a card uid.
pub(crate) fn uid_field(payload: &Value, field: &str) -> Result<CardUid, MoveError> {
    payload
        .get(field)
        .and_then(Value::as_u64)
        .and_then(|n| u32::try_from(n).ok())
        .map(CardUid)
        .ok_or_else(|| MoveError::invalid(format!("{field} required")))
}

/// `payload[field]` as a list of distinct card uids.
pub(crate) fn uid_list(payload: &Value, field: &str) -> Result<Vec<CardUid>, MoveError> {
    let uids: Vec<CardUid> = payload
        .get(field)
        .cloned()
        .and_then(|v| serde_json::from_value(v).ok())
        .ok_or_else(|| MoveError::invalid(format!("{field} must be a list of card ids")))?;
    let mut seen = uids.clone();
    seen.sort_unstable();
    seen.dedup();
    if seen.len() != uids.len() {
        return Err(MoveError::invalid(format!("{field} names a card twice")));
    }
    Ok(uids)
}

pub(crate) fn cards_json<'a>(cards: impl IntoIterator<Item = &'a Card>) -> Vec<Value> {
    cards.into_iter().map(Card::to_json).collect()
}

#[async_trait]
impl Variant for Borscht {
    type Action = BorschtAction;
    type Settings = BorschtSettings;

    const NAME: &'static str = "borscht";
    const MIN_PLAYERS: usize = 2;
    const MAX_PLAYERS: usize = 5;

    fn move_table() -> MoveTable<BorschtAction> {
        use TurnState::{NormalTurn, WaitingForExchange};
        MoveTable::new()
            .with("add_ingredient", BorschtAction::AddIngredient, &[NormalTurn])
            .with("draw_cards", BorschtAction::DrawCards, &[NormalTurn])
            .with("play_special", BorschtAction::PlaySpecial, &[NormalTurn])
            .with(
                "exchange_ingredients",
                BorschtAction::ExchangeIngredients,
                &[NormalTurn, WaitingForExchange],
            )
            .with("skip", BorschtAction::Skip, &[NormalTurn, WaitingForExchange])
            .with("free_market_refresh", BorschtAction::FreeMarketRefresh, &[NormalTurn])
    }

    fn setup(settings: BorschtSettings, table: &mut Table) -> Result<Self, SessionError> {
        settings.validate()?;
        let players = table.player_count();
        let mut uids = UidAllocator::new();

        let mut deck = catalog::ingredient_cards(&mut uids);
        table.rng.shuffle(&mut deck);
        let mut economy = Economy::new(deck);

        let mut hands = PlayerMap::new(players, |_| Pile::new());
        for seat in Seat::all(players) {
            let dealt = economy.draw(settings.starting_hand, &mut table.rng);
            hands[seat].extend(dealt);
        }
        economy.refill_market(settings.market_capacity, &mut table.rng);

        if settings.event_cards {
            economy.deck.extend(catalog::event_cards(&mut uids));
            economy.deck.shuffle(&mut table.rng);
        }

        let mut pool = catalog::recipes();
        if pool.len() < players * settings.recipe_options {
            return Err(SessionError::config(format!(
                "{} recipes cannot offer {} to each of {players} players",
                pool.len(),
                settings.recipe_options
            )));
        }
        table.rng.shuffle(&mut pool);
        let mut pool = pool.into_iter();
        let offers = PlayerMap::new(players, |_| pool.by_ref().take(settings.recipe_options).collect());

        Ok(Self {
            economy,
            hands,
            tableaus: PlayerMap::new(players, |_| Pile::new()),
            recipes: PlayerMap::with_value(players, None),
            offers,
            modifiers: Modifiers::default(),
            free_refresh_turn: None,
            card_total: uids.allocated() as usize,
            events: EventTable::standard(),
            settings,
        })
    }

    fn validate(&self) -> Result<(), SessionError> {
        let economy = &self.economy;
        let events = [&economy.deck, &economy.market, &economy.discard, &economy.events]
            .into_iter()
            .flat_map(|pile| pile.iter())
            .filter(|c| matches!(c.kind, CardKind::Event))
            .map(|c| c.name.as_str());
        self.events.validate(events)?;
        if self.cards_in_play() != self.card_total {
            return Err(SessionError::snapshot(format!(
                "{} cards in play, expected {}",
                self.cards_in_play(),
                self.card_total
            )));
        }
        Ok(())
    }

    async fn start(&mut self, table: &mut Table) {
        let choosers: Vec<Seat> = Seat::all(table.player_count())
            .filter(|&seat| self.recipes[seat].is_none())
            .collect();
        let replies = {
            let shared: &Table = table;
            let offers = &self.offers;
            join_all(choosers.iter().map(|&seat| {
                let recipes: Vec<Value> = offers[seat].iter().map(Recipe::to_json).collect();
                shared.ask(seat, "recipe_selection", json!({ "recipes": recipes }))
            }))
            .await
        };

        for (seat, reply) in choosers.into_iter().zip(replies) {
            if let Some(recipe) = self.choose_recipe(seat, &reply, table) {
                tracing::debug!(
                    target: LOG_TARGET,
                    room = %table.room_id(),
                    player = %table.player(seat),
                    recipe = %recipe.id,
                    answered = reply.is_answered(),
                    "recipe chosen"
                );
                Self::announce_recipe(table, seat, &recipe).await;
            }
        }
    }

    async fn handle(
        &mut self,
        table: &mut Table,
        seat: Seat,
        action: BorschtAction,
        payload: &Value,
    ) -> Result<MoveOutcome, MoveError> {
        match action {
            BorschtAction::AddIngredient => self.add_ingredient(table, seat, payload).await,
            BorschtAction::DrawCards => self.draw_cards(table, seat).await,
            BorschtAction::PlaySpecial => self.play_special(table, seat, payload).await,
            BorschtAction::ExchangeIngredients => self.exchange(table, seat, payload).await,
            BorschtAction::Skip => self.skip(table, seat).await,
            BorschtAction::FreeMarketRefresh => self.free_market_refresh(table, seat).await,
        }
    }

    async fn settle(&mut self, table: &mut Table, seat: Seat) {
        self.enforce_hand_limit(table, seat).await;
        self.resolve_events(table).await;
    }

    fn is_complete(&self, seat: Seat) -> bool {
        self.recipe(seat)
            .is_some_and(|recipe| scoring::is_complete(&self.tableaus[seat], recipe))
    }

    fn standings(&self, table: &Table) -> Vec<Standing> {
        let contenders = Seat::all(table.player_count())
            .map(|seat| {
                let first = table.turn.first_finisher() == Some(seat);
                let breakdown = scoring::score(
                    &self.tableaus[seat],
                    self.recipe(seat),
                    first,
                    self.settings.first_finisher_bonus,
                );
                scoring::Contender {
                    seat,
                    score: breakdown.total,
                    hand_cost: self.hands[seat].iter().map(Card::cost).sum(),
                    first_finisher: first,
                    moves: table.moves(seat),
                    breakdown,
                }
            })
            .collect();
        scoring::rank(contenders)
            .into_iter()
            .map(|c| Standing {
                seat: c.seat,
                player: table.player(c.seat),
                score: c.score,
                breakdown: json!({
                    "ingredient_points": c.breakdown.ingredient_points,
                    "recipe_bonus": c.breakdown.recipe_bonus,
                    "first_finisher_bonus": c.breakdown.first_finisher_bonus,
                    "ingredients_collected": c.breakdown.collected,
                    "hand_cost": c.hand_cost,
                }),
            })
            .collect()
    }

    fn view(&self, table: &Table, viewer: Seat) -> Value {
        view::render(self, table, viewer)
    }

    async fn on_restore(&mut self, table: &mut Table) -> bool {
        for seat in Seat::all(table.player_count()) {
            if self.recipes[seat].is_none() && !self.offers[seat].is_empty() {
                if let Some(recipe) = self.choose_recipe(seat, &Reply::TimedOut, table) {
                    Self::announce_recipe(table, seat, &recipe).await;
                }
            }
        }
        match table.turn.state() {
            TurnState::WaitingForExchange => {
                table.turn.restore();
                let player = table.player(table.turn.current());
                table.broadcast(json!({ "type": "turn_skipped", "player": player })).await;
                true
            }
            state if state.is_waiting() => {
                tracing::warn!(target: LOG_TARGET, room = %table.room_id(), %state, "restored mid-request");
                table.turn.restore();
                false
            }
            _ => false,
        }
    }
}
