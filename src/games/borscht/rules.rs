//! Core move handlers, hand and market limits.
//!
//! Handlers check everything before the first mutation; after that they
//! cannot fail.

use serde_json::{json, Value};

use super::cards::Card;
use super::{cards_json, uid_field, uid_list, Borscht, LOG_TARGET};
use crate::core::{CardUid, MoveError, Seat};
use crate::protocol::select;
use crate::session::{MoveOutcome, Table, TurnState};
use crate::zones::{check_exchange, PilePosition};

/// Ask `seat` to pick `count` of the offered cards to discard.
///
/// Runs inside `WAITING_FOR_DISCARD`; a timeout or an invalid answer picks
/// at random.
pub(super) async fn choose_discards(
    table: &mut Table,
    seat: Seat,
    reason: &str,
    offered: &[&Card],
    count: usize,
) -> Vec<CardUid> {
    let uids: Vec<CardUid> = offered.iter().map(|c| c.uid).collect();
    let cards: Vec<Value> = offered.iter().map(|c| c.to_json()).collect();

    table.turn.enter(TurnState::WaitingForDiscard);
    let reply = table
        .ask(
            seat,
            "discard_selection",
            json!({ "reason": reason, "cards": cards, "count": count }),
        )
        .await;
    table.turn.restore();

    let selection = select(&reply, "cards", &uids, count, &mut table.rng);
    if selection.fallback {
        tracing::debug!(target: LOG_TARGET, player = %table.player(seat), reason, "random discard");
    }
    selection.chosen
}

impl Borscht {
    pub(super) async fn add_ingredient(
        &mut self,
        table: &mut Table,
        seat: Seat,
        payload: &Value,
    ) -> Result<MoveOutcome, MoveError> {
        let uid = uid_field(payload, "card_id")?;
        let recipe = self.require_recipe(seat)?;
        let card = self.hands[seat]
            .get(uid)
            .ok_or_else(|| MoveError::invalid("Card not in hand"))?;
        if card.is_special() {
            return Err(MoveError::invalid("Special ingredients cannot be added to borscht"));
        }
        if card.is_recipe_ingredient() && !recipe.contains(&card.name) {
            return Err(MoveError::invalid("Ingredient is not in your recipe"));
        }
        if self.tableaus[seat].iter().any(|c| c.name == card.name) {
            return Err(MoveError::invalid("You already have this ingredient in your borscht"));
        }

        let Some(card) = self.hands[seat].take(uid) else {
            return Err(MoveError::invalid("Card not in hand"));
        };
        let card_json = card.to_json();
        self.tableaus[seat].insert(card, PilePosition::Top);
        table
            .broadcast(json!({ "type": "ingredient_added", "player": table.player(seat), "card": card_json }))
            .await;
        Ok(MoveOutcome::ends_turn())
    }

    pub(super) async fn draw_cards(&mut self, table: &mut Table, seat: Seat) -> Result<MoveOutcome, MoveError> {
        if !self.economy.can_draw() {
            return Err(MoveError::invalid("No cards left to draw"));
        }
        let drawn = self.economy.draw(self.settings.draw_count, &mut table.rng);
        let cards = cards_json(&drawn);
        let count = drawn.len();
        self.hands[seat].extend(drawn);

        table.send(seat, json!({ "type": "cards_received", "cards": cards })).await;
        table
            .broadcast(json!({ "type": "cards_drawn", "player": table.player(seat), "count": count }))
            .await;
        Ok(MoveOutcome::ends_turn())
    }

    pub(super) async fn exchange(
        &mut self,
        table: &mut Table,
        seat: Seat,
        payload: &Value,
    ) -> Result<MoveOutcome, MoveError> {
        let offered = uid_list(payload, "hand_cards")?;
        let requested = uid_list(payload, "market_cards")?;
        if !self.hands[seat].holds_all(&offered) {
            return Err(MoveError::invalid("Cards not in hand"));
        }
        if !self.economy.market.holds_all(&requested) {
            return Err(MoveError::invalid("Cards not in market"));
        }
        {
            let give: Vec<&Card> = offered.iter().filter_map(|&u| self.hands[seat].get(u)).collect();
            let take: Vec<&Card> = requested.iter().filter_map(|&u| self.economy.market.get(u)).collect();
            check_exchange(&give, &take, self.exchange_tax())?;
        }

        let given = self.hands[seat].take_all(&offered).unwrap_or_default();
        let taken = self.economy.market.take_all(&requested).unwrap_or_default();
        let (given_json, taken_json) = (cards_json(&given), cards_json(&taken));
        self.economy.market.extend(given);
        self.hands[seat].extend(taken);

        table
            .broadcast(json!({
                "type": "exchange_made",
                "player": table.player(seat),
                "given": given_json,
                "taken": taken_json,
            }))
            .await;

        self.balance_market(table, seat).await;
        if table.turn.state() == TurnState::WaitingForExchange {
            table.turn.restore();
        }
        Ok(MoveOutcome::ends_turn())
    }

    pub(super) async fn skip(&mut self, table: &mut Table, seat: Seat) -> Result<MoveOutcome, MoveError> {
        if table.turn.state() == TurnState::WaitingForExchange {
            table.turn.restore();
        }
        table
            .broadcast(json!({ "type": "turn_skipped", "player": table.player(seat) }))
            .await;
        Ok(MoveOutcome::ends_turn())
    }

    pub(super) async fn free_market_refresh(
        &mut self,
        table: &mut Table,
        seat: Seat,
    ) -> Result<MoveOutcome, MoveError> {
        if !self.free_refresh_available(table, seat)? {
            return Err(MoveError::invalid(
                "Free market refresh needs a market without your recipe's ingredients, once per turn",
            ));
        }
        self.free_refresh_turn = Some(table.turn.turn_number());
        self.refresh_market(table).await;
        Ok(MoveOutcome::continues())
    }

    pub(super) fn free_refresh_available(&self, table: &Table, seat: Seat) -> Result<bool, MoveError> {
        let recipe = self.require_recipe(seat)?;
        let used = self.free_refresh_turn == Some(table.turn.turn_number());
        let useful = self
            .economy
            .market
            .iter()
            .any(|c| c.is_recipe_ingredient() && recipe.contains(&c.name));
        Ok(!used && !useful)
    }

    /// Discard and lay out the market; lay it out once more if it comes up
    /// with three copies of one ingredient.
    pub(super) async fn refresh_market(&mut self, table: &mut Table) {
        let capacity = self.market_capacity();
        self.economy.refresh_market(capacity, &mut table.rng);
        if let Some(name) = self.economy.repeated_in_market(3) {
            tracing::debug!(target: LOG_TARGET, ingredient = name, "market flooded, refreshing again");
            self.economy.refresh_market(capacity, &mut table.rng);
        }
        let market = cards_json(self.economy.market.iter());
        table
            .broadcast(json!({ "type": "market_refreshed", "market": market }))
            .await;
    }

    /// Trim the market back to capacity (the acting player chooses) or
    /// refill it.
    pub(super) async fn balance_market(&mut self, table: &mut Table, seat: Seat) {
        let capacity = self.market_capacity();
        let excess = self.economy.market_excess(capacity);
        if excess == 0 {
            self.economy.refill_market(capacity, &mut table.rng);
            return;
        }
        let chosen = {
            let offered: Vec<&Card> = self.economy.market.iter().collect();
            choose_discards(table, seat, "market_limit", &offered, excess).await
        };
        let trimmed = self.economy.market.take_all(&chosen).unwrap_or_default();
        let trimmed_json = cards_json(&trimmed);
        self.economy.discard_cards(trimmed);
        table
            .broadcast(json!({ "type": "market_trimmed", "player": table.player(seat), "cards": trimmed_json }))
            .await;
    }

    /// Cut the hand of `seat` down to the current limit.
    pub(super) async fn enforce_hand_limit(&mut self, table: &mut Table, seat: Seat) {
        let limit = self.hand_limit();
        let excess = self.hands[seat].len().saturating_sub(limit);
        if excess == 0 {
            return;
        }
        let chosen = {
            let offered: Vec<&Card> = self.hands[seat].iter().collect();
            choose_discards(table, seat, "hand_limit", &offered, excess).await
        };
        let discarded = self.hands[seat].take_all(&chosen).unwrap_or_default();
        let count = discarded.len();
        self.economy.discard_cards(discarded);
        table
            .broadcast(json!({
                "type": "cards_discarded",
                "player": table.player(seat),
                "reason": "hand_limit",
                "count": count,
            }))
            .await;
    }
}
