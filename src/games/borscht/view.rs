//! Player-scoped view of a Borscht game.
//!
//! The viewer sees their own hand and recipe. Other players show their
//! borscht in full and their hand as a count; their recipe stays hidden
//! until a standing modifier reveals it or the game ends.

use serde_json::{json, Value};

use super::cards::Recipe;
use super::{cards_json, scoring, Borscht};
use crate::core::Seat;
use crate::session::Table;

pub(super) fn render(game: &Borscht, table: &Table, viewer: Seat) -> Value {
    let revealed = game.modifiers.goals_revealed() || table.turn.is_over();
    let seats: Vec<Value> = Seat::all(table.player_count())
        .map(|seat| {
            let show_recipe = revealed || seat == viewer;
            json!({
                "player": table.player(seat),
                "hand_count": game.hands[seat].len(),
                "borscht": cards_json(game.tableaus[seat].iter()),
                "goal_cards": scoring::goal_count(&game.tableaus[seat]),
                "recipe": game.recipes[seat].as_ref().filter(|_| show_recipe).map(Recipe::to_json),
                "frozen": table.turn.is_frozen(seat),
            })
        })
        .collect();

    let own_turn = table.turn.current() == viewer && !table.turn.is_over();
    let free_refresh = own_turn && game.free_refresh_available(table, viewer).unwrap_or(false);
    let offers: Vec<Value> = game.offers[viewer].iter().map(Recipe::to_json).collect();

    json!({
        "hand": cards_json(game.hands[viewer].iter()),
        "recipe": game.recipes[viewer].as_ref().map(Recipe::to_json),
        "recipe_offers": offers,
        "market": cards_json(game.economy.market.iter()),
        "deck_count": game.economy.deck.len(),
        "discard_count": game.economy.discard.len(),
        "discard_top": game.economy.discard.top().map(|c| c.to_json()),
        "modifiers": game.modifiers.to_json(),
        "hand_limit": game.hand_limit(),
        "market_capacity": game.market_capacity(),
        "exchange_tax": game.exchange_tax(),
        "free_market_refresh_available": free_refresh,
        "seats": seats,
    })
}
