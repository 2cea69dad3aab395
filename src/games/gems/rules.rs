//! Move handlers. Each validates fully before touching the table.

use serde_json::{json, Value};

use super::{Gem, GemCard, Gems, TokenSet, LOG_TARGET};
use crate::core::{MoveError, Seat};
use crate::session::{MoveOutcome, Table, TurnState};

/// Gems in the bank needed before two of one color may be taken.
const SAME_COLOR_MINIMUM: u32 = 4;
const DIFFERENT_COLORS: usize = 3;

/// Where a card to buy sits.
#[derive(Clone, Copy, Debug)]
enum Source {
    Row { level: usize, position: usize },
    Reserved(usize),
}

fn color_field(name: &str) -> Result<Gem, MoveError> {
    Gem::parse(name)
        .filter(|g| g.is_color())
        .ok_or_else(|| MoveError::invalid(format!("Invalid gem color: {name}")))
}

fn index_field(payload: &Value, field: &str) -> Result<usize, MoveError> {
    payload
        .get(field)
        .and_then(Value::as_u64)
        .and_then(|n| usize::try_from(n).ok())
        .ok_or_else(|| MoveError::invalid(format!("{field} required")))
}

/// `card_level` as a 0-based row index.
fn level_field(payload: &Value) -> Result<usize, MoveError> {
    match payload.get("card_level").and_then(Value::as_u64) {
        Some(level @ 1..=3) => Ok(level as usize - 1),
        _ => Err(MoveError::invalid("card_level must be 1, 2 or 3")),
    }
}

fn flag(payload: &Value, field: &str) -> bool {
    payload.get(field).and_then(Value::as_bool).unwrap_or(false)
}

impl Gems {
    pub(super) async fn take_different(
        &mut self,
        table: &mut Table,
        seat: Seat,
        payload: &Value,
    ) -> Result<MoveOutcome, MoveError> {
        let names: Vec<String> = payload
            .get("gems")
            .cloned()
            .and_then(|v| serde_json::from_value(v).ok())
            .ok_or_else(|| MoveError::invalid("gems must be a list of colors"))?;
        if names.len() != DIFFERENT_COLORS {
            return Err(MoveError::invalid("Must take exactly 3 different gems"));
        }
        let gems = names
            .iter()
            .map(|n| color_field(n))
            .collect::<Result<Vec<_>, _>>()?;
        let taken = TokenSet::from_units(&gems);
        if Gem::COLORS.iter().any(|&g| taken[g] > 1) {
            return Err(MoveError::invalid("Gems must be different colors"));
        }
        if let Some(gem) = gems.iter().find(|&&g| self.bank[g] == 0) {
            return Err(MoveError::invalid(format!("No {} gems available", gem.as_str())));
        }

        self.bank.transfer(&mut self.tokens[seat], &taken);
        table
            .broadcast(json!({ "type": "gems_taken", "player": table.player(seat), "gems": taken.to_json() }))
            .await;
        Ok(self.after_action(table, seat).await)
    }

    pub(super) async fn take_same(
        &mut self,
        table: &mut Table,
        seat: Seat,
        payload: &Value,
    ) -> Result<MoveOutcome, MoveError> {
        let name = payload
            .get("gem_color")
            .and_then(Value::as_str)
            .ok_or_else(|| MoveError::invalid("gem_color required"))?;
        let gem = color_field(name)?;
        if self.bank[gem] < SAME_COLOR_MINIMUM {
            return Err(MoveError::invalid(format!(
                "Need at least {SAME_COLOR_MINIMUM} {name} gems in the bank to take two"
            )));
        }

        let taken = TokenSet::new().with(gem, 2);
        self.bank.transfer(&mut self.tokens[seat], &taken);
        table
            .broadcast(json!({ "type": "gems_taken", "player": table.player(seat), "gems": taken.to_json() }))
            .await;
        Ok(self.after_action(table, seat).await)
    }

    pub(super) async fn reserve(
        &mut self,
        table: &mut Table,
        seat: Seat,
        payload: &Value,
    ) -> Result<MoveOutcome, MoveError> {
        if self.reserved[seat].len() >= self.settings.max_reserved {
            return Err(MoveError::invalid(format!(
                "Cannot reserve more than {} cards",
                self.settings.max_reserved
            )));
        }
        let level = level_field(payload)?;
        let from_deck = flag(payload, "from_deck");
        let card = if from_deck {
            self.decks[level]
                .pop_top()
                .ok_or_else(|| MoveError::invalid("Deck is empty"))?
        } else {
            let position = index_field(payload, "card_position")?;
            if position >= self.rows[level].len() {
                return Err(MoveError::invalid("Invalid card position"));
            }
            self.take_from_row(level, position)
        };

        let gold = self.bank[Gem::Gold] > 0;
        if gold {
            self.bank.transfer(&mut self.tokens[seat], &TokenSet::new().with(Gem::Gold, 1));
        }
        // A card drawn blind stays hidden from the other players.
        let shown = if from_deck { Value::Null } else { card.to_json() };
        table
            .broadcast(json!({
                "type": "card_reserved",
                "player": table.player(seat),
                "level": level + 1,
                "card": shown,
                "gold_received": gold,
            }))
            .await;
        self.reserved[seat].push(card);
        Ok(self.after_action(table, seat).await)
    }

    pub(super) async fn purchase(
        &mut self,
        table: &mut Table,
        seat: Seat,
        payload: &Value,
    ) -> Result<MoveOutcome, MoveError> {
        let source = if flag(payload, "from_reserved") {
            let index = index_field(payload, "card_index")?;
            if index >= self.reserved[seat].len() {
                return Err(MoveError::invalid("Invalid reserved card index"));
            }
            Source::Reserved(index)
        } else {
            let level = level_field(payload)?;
            let position = index_field(payload, "card_position")?;
            if position >= self.rows[level].len() {
                return Err(MoveError::invalid("Invalid card position"));
            }
            Source::Row { level, position }
        };
        let cost = match source {
            Source::Reserved(index) => self.reserved[seat][index].cost,
            Source::Row { level, position } => self.rows[level][position].cost,
        };
        let payment = self
            .payment(seat, &cost)
            .ok_or_else(|| MoveError::invalid("Cannot afford this card"))?;

        let card = match source {
            Source::Reserved(index) => self.reserved[seat].remove(index),
            Source::Row { level, position } => self.take_from_row(level, position),
        };
        self.tokens[seat].transfer(&mut self.bank, &payment);
        table
            .broadcast(json!({
                "type": "card_purchased",
                "player": table.player(seat),
                "card": card.to_json(),
                "paid": payment.to_json(),
            }))
            .await;
        self.purchased[seat].push(card);
        Ok(self.after_action(table, seat).await)
    }

    pub(super) async fn return_tokens(
        &mut self,
        table: &mut Table,
        seat: Seat,
        payload: &Value,
    ) -> Result<MoveOutcome, MoveError> {
        let returned = payload
            .get("tokens")
            .and_then(TokenSet::from_json)
            .ok_or_else(|| MoveError::invalid("tokens must map gem colors to counts"))?;
        let excess = self.excess_tokens(seat);
        if returned.total() != excess {
            return Err(MoveError::invalid(format!("Must return exactly {excess} tokens")));
        }
        if !self.tokens[seat].covers(&returned) {
            return Err(MoveError::invalid("You do not have those tokens"));
        }

        self.tokens[seat].transfer(&mut self.bank, &returned);
        table.turn.restore();
        table
            .broadcast(json!({ "type": "tokens_returned", "player": table.player(seat), "tokens": returned.to_json() }))
            .await;
        Ok(self.visit_nobles(table, seat).await)
    }

    pub(super) async fn select_noble(
        &mut self,
        table: &mut Table,
        seat: Seat,
        payload: &Value,
    ) -> Result<MoveOutcome, MoveError> {
        let id = payload
            .get("noble_id")
            .and_then(Value::as_str)
            .ok_or_else(|| MoveError::invalid("noble_id required"))?;
        if !self.eligible_nobles(seat).iter().any(|n| n == id) {
            return Err(MoveError::invalid("That noble cannot visit you"));
        }
        table.turn.restore();
        self.award_noble(table, seat, id).await;
        Ok(MoveOutcome::ends_turn())
    }

    /// Tokens to hand over for `cost`, spending gold only on the shortfall.
    pub(super) fn payment(&self, seat: Seat, cost: &TokenSet) -> Option<TokenSet> {
        let bonuses = self.bonuses(seat);
        let held = &self.tokens[seat];
        let mut payment = TokenSet::new();
        let mut shortfall = 0;
        for gem in Gem::COLORS {
            let due = cost[gem].saturating_sub(bonuses[gem]);
            let paid = due.min(held[gem]);
            payment[gem] = paid;
            shortfall += due - paid;
        }
        (held[Gem::Gold] >= shortfall).then(|| payment.with(Gem::Gold, shortfall))
    }

    /// Remove a face-up card and deal its replacement into the same slot.
    fn take_from_row(&mut self, level: usize, position: usize) -> GemCard {
        let card = self.rows[level].remove(position);
        if let Some(next) = self.decks[level].pop_top() {
            self.rows[level].insert(position, next);
        }
        card
    }

    /// Token limit first, then nobles.
    async fn after_action(&mut self, table: &mut Table, seat: Seat) -> MoveOutcome {
        if self.excess_tokens(seat) > 0 {
            table.turn.enter(TurnState::WaitingForDiscard);
            table.send(seat, self.return_prompt(seat)).await;
            return MoveOutcome::continues();
        }
        self.visit_nobles(table, seat).await
    }

    async fn visit_nobles(&mut self, table: &mut Table, seat: Seat) -> MoveOutcome {
        match self.eligible_nobles(seat).as_slice() {
            [] => MoveOutcome::ends_turn(),
            [only] => {
                self.award_noble(table, seat, only).await;
                MoveOutcome::ends_turn()
            }
            _ => {
                table.turn.enter(TurnState::WaitingForSelection);
                table.send(seat, self.noble_prompt(seat)).await;
                MoveOutcome::continues()
            }
        }
    }

    pub(super) fn eligible_nobles(&self, seat: Seat) -> Vec<String> {
        let bonuses = self.bonuses(seat);
        self.nobles
            .iter()
            .filter(|n| bonuses.covers(&n.requires))
            .map(|n| n.id.clone())
            .collect()
    }

    async fn award_noble(&mut self, table: &mut Table, seat: Seat, id: &str) {
        let Some(index) = self.nobles.iter().position(|n| n.id == id) else {
            return;
        };
        let noble = self.nobles.remove(index);
        tracing::debug!(target: LOG_TARGET, room = %table.room_id(), player = %table.player(seat), noble = %noble.id, "noble visit");
        table
            .broadcast(json!({ "type": "noble_visited", "player": table.player(seat), "noble": noble.to_json() }))
            .await;
        self.visitors[seat].push(noble);
    }

    pub(super) async fn award_random_noble(&mut self, table: &mut Table, seat: Seat) {
        let eligible = self.eligible_nobles(seat);
        if let Some(id) = table.rng.choose(&eligible).cloned() {
            self.award_noble(table, seat, &id).await;
        }
    }

    /// Bring `seat` back to the token limit with a uniform random pick.
    pub(super) async fn return_random_tokens(&mut self, table: &mut Table, seat: Seat) {
        let excess = self.excess_tokens(seat) as usize;
        let units = self.tokens[seat].units();
        let returned = TokenSet::from_units(&table.rng.sample(&units, excess));
        self.tokens[seat].transfer(&mut self.bank, &returned);
        table
            .broadcast(json!({
                "type": "tokens_returned",
                "player": table.player(seat),
                "tokens": returned.to_json(),
                "fallback": true,
            }))
            .await;
    }
}
