//! Special cards.
//!
//! Every special follows the same sequence: validate the targets and
//! selections, move the special to the discard pile, broadcast
//! `special_effect`, open a defense window for attacked players, apply the
//! effect to whoever did not defend, broadcast `special_played`.

use futures::future::join_all;
use rustc_hash::FxHashMap;
use serde_json::{json, Value};

use super::cards::{Card, Effect};
use super::{cards_json, uid_field, uid_list, Borscht, LOG_TARGET};
use crate::core::{CardUid, MoveError, PlayerId, Seat};
use crate::protocol::{confirm, select};
use crate::session::{MoveOutcome, Table, TurnState};
use crate::zones::PilePosition;

/// Cards olive oil reveals, and how many of them are kept.
const LOOK_AT: usize = 5;
const KEEP: usize = 2;
/// Market cards ginger takes.
const GINGER_TAKES: usize = 2;

impl Borscht {
    pub(super) async fn play_special(
        &mut self,
        table: &mut Table,
        seat: Seat,
        payload: &Value,
    ) -> Result<MoveOutcome, MoveError> {
        let uid = uid_field(payload, "card_id")?;
        let effect = self.hands[seat]
            .get(uid)
            .ok_or_else(|| MoveError::invalid("Card not in hand"))?
            .effect()
            .ok_or_else(|| MoveError::invalid("Card is not a special ingredient"))?;

        match effect {
            Effect::StealOrDiscard => self.chili_pepper(table, seat, uid, payload).await,
            Effect::DiscardOrTake => self.black_pepper(table, seat, uid, payload).await,
            Effect::Defense => Err(MoveError::invalid("Sour cream is only played to defend")),
            Effect::TakeMarket => self.ginger(table, seat, uid, payload).await,
            Effect::TakeDiscard => self.cinnamon(table, seat, uid, payload).await,
            Effect::LookTopFive => self.olive_oil(table, seat, uid).await,
            Effect::RefreshMarket => self.paprika(table, seat, uid).await,
        }
    }

    /// Discard the played special and announce the intent.
    async fn spend_special(&mut self, table: &mut Table, seat: Seat, uid: CardUid, intent: Value) -> Option<Effect> {
        let card = self.hands[seat].take(uid)?;
        let effect = card.effect();
        let card_json = card.to_json();
        self.economy.discard_cards([card]);
        table
            .broadcast(json!({
                "type": "special_effect",
                "player": table.player(seat),
                "card": card_json,
                "intent": intent,
            }))
            .await;
        effect
    }

    async fn announce_result(table: &mut Table, seat: Seat, effect: Effect, result: Value) {
        table
            .broadcast(json!({
                "type": "special_played",
                "player": table.player(seat),
                "effect": effect.as_str(),
                "result": result,
            }))
            .await;
    }

    /// Offer every target holding enough sour cream the chance to cancel
    /// the attack. Returns, per target, whether it defended.
    async fn defense_window(&mut self, table: &mut Table, attacker: Seat, effect: Effect, targets: &[Seat]) -> Vec<bool> {
        let cost = self.defense_cost();
        let eligible: Vec<Seat> = targets
            .iter()
            .copied()
            .filter(|&t| self.sour_creams(t).len() >= cost)
            .collect();
        let mut defended = vec![false; targets.len()];
        if eligible.is_empty() {
            return defended;
        }

        table.turn.enter(TurnState::WaitingForDefense);
        let replies = {
            let shared: &Table = table;
            let payload = json!({
                "attacker": shared.player(attacker),
                "effect": effect.as_str(),
                "cost": cost,
            });
            join_all(eligible.iter().map(|&t| shared.ask(t, "defense_request", payload.clone()))).await
        };
        table.turn.restore();

        for (target, reply) in eligible.into_iter().zip(replies) {
            if !confirm(&reply, "defend") {
                continue;
            }
            let creams: Vec<CardUid> = self.sour_creams(target).into_iter().take(cost).collect();
            let spent = self.hands[target].take_all(&creams).unwrap_or_default();
            self.economy.discard_cards(spent);
            if let Some(slot) = targets.iter().position(|&t| t == target) {
                defended[slot] = true;
            }
            tracing::debug!(target: LOG_TARGET, player = %table.player(target), "attack defended");
            table
                .broadcast(json!({
                    "type": "card_defended",
                    "player": table.player(target),
                    "attacker": table.player(attacker),
                    "effect": effect.as_str(),
                }))
                .await;
        }
        defended
    }

    fn sour_creams(&self, seat: Seat) -> Vec<CardUid> {
        self.hands[seat]
            .iter()
            .filter(|c| c.effect() == Some(Effect::Defense))
            .map(|c| c.uid)
            .collect()
    }

    async fn chili_pepper(
        &mut self,
        table: &mut Table,
        seat: Seat,
        uid: CardUid,
        payload: &Value,
    ) -> Result<MoveOutcome, MoveError> {
        let target = table.seat_in_payload(payload, "target_player")?;
        if target == seat {
            return Err(MoveError::invalid("Cannot target yourself"));
        }
        if table.turn.is_frozen(target) {
            return Err(MoveError::FrozenTarget);
        }
        let target_uid = uid_field(payload, "target_card")?;
        let steal = match payload.get("action_type").and_then(Value::as_str) {
            Some("steal") => true,
            Some("discard") => false,
            _ => return Err(MoveError::invalid("action_type must be steal or discard")),
        };
        let card = self.tableaus[target]
            .get(target_uid)
            .ok_or_else(|| MoveError::invalid("Card not in target's borscht"))?;
        if steal {
            if self.tableaus[seat].iter().any(|c| c.name == card.name) {
                return Err(MoveError::invalid("You already have this ingredient in your borscht"));
            }
            let recipe = self.require_recipe(seat)?;
            if card.is_recipe_ingredient() && !recipe.contains(&card.name) {
                return Err(MoveError::invalid("Ingredient is not in your recipe"));
            }
        }

        let intent = json!({
            "target_player": table.player(target),
            "target_card": target_uid,
            "action_type": if steal { "steal" } else { "discard" },
        });
        let Some(effect) = self.spend_special(table, seat, uid, intent).await else {
            return Ok(MoveOutcome::ends_turn());
        };
        let defended = self.defense_window(table, seat, effect, &[target]).await;
        if defended.first() == Some(&true) {
            Self::announce_result(table, seat, effect, json!({ "defended": [table.player(target)] })).await;
            return Ok(MoveOutcome::ends_turn());
        }

        let result = match self.tableaus[target].take(target_uid) {
            Some(card) if steal => {
                let card_json = card.to_json();
                self.tableaus[seat].insert(card, PilePosition::Top);
                json!({ "stolen": card_json, "from": table.player(target) })
            }
            Some(card) => {
                let card_json = card.to_json();
                self.economy.discard_cards([card]);
                json!({ "discarded": card_json, "from": table.player(target) })
            }
            None => json!({}),
        };
        Self::announce_result(table, seat, effect, result).await;
        Ok(MoveOutcome::ends_turn())
    }

    async fn black_pepper(
        &mut self,
        table: &mut Table,
        seat: Seat,
        uid: CardUid,
        payload: &Value,
    ) -> Result<MoveOutcome, MoveError> {
        let from_borscht = match payload.get("effect_choice").and_then(Value::as_str) {
            Some("discard_from_borscht") => true,
            Some("take_from_hand") => false,
            _ => return Err(MoveError::invalid("effect_choice must be discard_from_borscht or take_from_hand")),
        };
        let targets: Vec<Seat> = Seat::all(table.player_count())
            .filter(|&t| t != seat && !table.turn.is_frozen(t))
            .filter(|&t| {
                if from_borscht {
                    !self.tableaus[t].is_empty()
                } else {
                    !self.hands[t].is_empty()
                }
            })
            .collect();
        if targets.is_empty() {
            return Err(MoveError::invalid("No opponent can be affected"));
        }
        let requested = requested_cards(payload);

        let intent = json!({ "effect_choice": if from_borscht { "discard_from_borscht" } else { "take_from_hand" } });
        let Some(effect) = self.spend_special(table, seat, uid, intent).await else {
            return Ok(MoveOutcome::ends_turn());
        };
        let defended = self.defense_window(table, seat, effect, &targets).await;

        let mut outcomes = Vec::with_capacity(targets.len());
        for (&target, defended) in targets.iter().zip(defended) {
            let player = table.player(target);
            if defended {
                outcomes.push(json!({ "player": player, "defended": true }));
                continue;
            }
            if from_borscht {
                let pile = &mut self.tableaus[target];
                let pick = requested
                    .get(&player)
                    .copied()
                    .filter(|u| pile.contains(*u))
                    .or_else(|| table.rng.choose(&pile.uids()).copied());
                if let Some(card) = pick.and_then(|u| pile.take(u)) {
                    outcomes.push(json!({ "player": player, "discarded": card.to_json() }));
                    self.economy.discard_cards([card]);
                }
            } else {
                let pick = table.rng.choose(&self.hands[target].uids()).copied();
                if let Some(card) = pick.and_then(|u| self.hands[target].take(u)) {
                    outcomes.push(json!({ "player": player, "taken": 1 }));
                    table
                        .send(seat, json!({ "type": "cards_received", "cards": [card.to_json()] }))
                        .await;
                    self.hands[seat].insert(card, PilePosition::Top);
                }
            }
        }
        Self::announce_result(table, seat, effect, json!({ "targets": outcomes })).await;
        Ok(MoveOutcome::ends_turn())
    }

    async fn ginger(
        &mut self,
        table: &mut Table,
        seat: Seat,
        uid: CardUid,
        payload: &Value,
    ) -> Result<MoveOutcome, MoveError> {
        let picks = uid_list(payload, "market_cards")?;
        let wanted = GINGER_TAKES.min(self.economy.market.len());
        if wanted == 0 {
            return Err(MoveError::invalid("Market is empty"));
        }
        if picks.len() != wanted || !self.economy.market.holds_all(&picks) {
            return Err(MoveError::invalid(format!("Pick {wanted} different cards from the market")));
        }

        let intent = json!({ "market_cards": picks });
        let Some(effect) = self.spend_special(table, seat, uid, intent).await else {
            return Ok(MoveOutcome::ends_turn());
        };
        let taken = self.economy.market.take_all(&picks).unwrap_or_default();
        let taken_json = cards_json(&taken);
        self.hands[seat].extend(taken);
        let capacity = self.market_capacity();
        self.economy.refill_market(capacity, &mut table.rng);
        Self::announce_result(table, seat, effect, json!({ "taken": taken_json })).await;
        Ok(MoveOutcome::ends_turn())
    }

    async fn cinnamon(
        &mut self,
        table: &mut Table,
        seat: Seat,
        uid: CardUid,
        payload: &Value,
    ) -> Result<MoveOutcome, MoveError> {
        if !self.economy.discard.iter().any(|c| !c.is_event()) {
            return Err(MoveError::invalid("Discard pile has no ingredients"));
        }
        let pick = uid_field(payload, "discard_card")?;
        match self.economy.discard.get(pick) {
            None => return Err(MoveError::invalid("Card not in discard pile")),
            Some(card) if card.is_event() => return Err(MoveError::invalid("Event cards cannot be taken")),
            Some(_) => {}
        }

        let intent = json!({ "discard_card": pick });
        let Some(effect) = self.spend_special(table, seat, uid, intent).await else {
            return Ok(MoveOutcome::ends_turn());
        };
        let result = match self.economy.discard.take(pick) {
            Some(card) => {
                let card_json = card.to_json();
                self.hands[seat].insert(card, PilePosition::Top);
                json!({ "taken": card_json })
            }
            None => json!({}),
        };
        Self::announce_result(table, seat, effect, result).await;
        Ok(MoveOutcome::ends_turn())
    }

    async fn olive_oil(&mut self, table: &mut Table, seat: Seat, uid: CardUid) -> Result<MoveOutcome, MoveError> {
        if !self.economy.can_draw() {
            return Err(MoveError::invalid("Deck is empty"));
        }
        // The oil is still in hand, so it cannot be recycled into the deck.
        if self.economy.deck.len() < LOOK_AT {
            self.economy.reshuffle(&mut table.rng);
        }
        let Some(effect) = self.spend_special(table, seat, uid, json!({})).await else {
            return Ok(MoveOutcome::ends_turn());
        };

        // Top first.
        let revealed = self.economy.take_top(LOOK_AT);
        let keep = KEEP.min(revealed.len());
        let uids: Vec<CardUid> = revealed.iter().map(|c| c.uid).collect();

        table.turn.enter(TurnState::WaitingForSelection);
        let reply = table
            .ask(
                seat,
                "top_cards_selection",
                json!({ "cards": cards_json(&revealed), "count": keep }),
            )
            .await;
        table.turn.restore();
        let selection = select(&reply, "cards", &uids, keep, &mut table.rng);

        let (kept, returned): (Vec<Card>, Vec<Card>) =
            revealed.into_iter().partition(|c| selection.chosen.contains(&c.uid));
        let returned_count = returned.len();
        for card in returned.into_iter().rev() {
            self.economy.deck.insert(card, PilePosition::Top);
        }
        let kept_json = cards_json(&kept);
        self.hands[seat].extend(kept);

        table.send(seat, json!({ "type": "cards_received", "cards": kept_json })).await;
        Self::announce_result(
            table,
            seat,
            effect,
            json!({ "kept": kept_json.len(), "returned": returned_count }),
        )
        .await;
        Ok(MoveOutcome::ends_turn())
    }

    async fn paprika(&mut self, table: &mut Table, seat: Seat, uid: CardUid) -> Result<MoveOutcome, MoveError> {
        let Some(effect) = self.spend_special(table, seat, uid, json!({})).await else {
            return Ok(MoveOutcome::ends_turn());
        };
        self.refresh_market(table).await;
        table.turn.enter(TurnState::WaitingForExchange);
        Self::announce_result(table, seat, effect, json!({ "exchange_available": true })).await;
        Ok(MoveOutcome::continues())
    }
}

/// `target_cards: {"<player id>": <card uid>}` for black pepper.
fn requested_cards(payload: &Value) -> FxHashMap<PlayerId, CardUid> {
    let Some(entries) = payload.get("target_cards").and_then(Value::as_object) else {
        return FxHashMap::default();
    };
    entries
        .iter()
        .filter_map(|(player, uid)| {
            let player = player.parse::<u64>().ok()?;
            let uid = u32::try_from(uid.as_u64()?).ok()?;
            Some((PlayerId(player), CardUid(uid)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requested_cards_ignores_garbage() {
        let parsed = requested_cards(&json!({
            "target_cards": { "7": 12, "x": 3, "9": "nope" }
        }));
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed.get(&PlayerId(7)), Some(&CardUid(12)));
        assert!(requested_cards(&json!({})).is_empty());
    }
}
