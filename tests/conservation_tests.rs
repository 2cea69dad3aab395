//! Card conservation under random move sequences.
//!
//! Moves are drawn at random, legal or not. Rejected moves must leave the
//! game untouched, and no accepted move may create or destroy a card.

use std::sync::Arc;
use std::time::Duration;

use proptest::prelude::*;
use serde_json::{json, Value};

use ccg_session::games::borscht::{Borscht, BorschtSettings};
use ccg_session::games::gems::{Gems, GemsSettings};
use ccg_session::protocol::RecordingTransport;
use ccg_session::session::{Session, Variant};
use ccg_session::{PlayerId, Seat, SessionConfig};

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .start_paused(true)
        .build()
        .unwrap()
}

fn new_session<V: Variant>(players: usize, settings: V::Settings, seed: u64) -> Session<V> {
    Session::new(
        "prop",
        (1..=players as u64).map(PlayerId).collect(),
        settings,
        SessionConfig::new().with_request_timeout(Duration::from_secs(1)),
        seed,
        Arc::new(RecordingTransport::new()),
    )
    .unwrap()
}

/// A Borscht move built from two random picks against the current state.
fn borscht_move(session: &Session<Borscht>, kind: u8, pick: usize) -> (&'static str, Value) {
    let game = session.variant();
    let seat = session.table().turn.current();
    let hand = game.hand(seat).uids();
    let market = game.economy().market.uids();
    let from_hand = hand.get(pick % hand.len().max(1)).copied();
    match kind % 6 {
        0 => ("draw_cards", json!({})),
        1 => ("skip", json!({})),
        2 => ("add_ingredient", json!({ "card_id": from_hand })),
        3 => (
            "exchange_ingredients",
            json!({
                "hand_cards": from_hand.into_iter().collect::<Vec<_>>(),
                "market_cards": market.get(pick % market.len().max(1)).into_iter().collect::<Vec<_>>(),
            }),
        ),
        4 => {
            let target = session.table().player(Seat(((seat.0 as usize + 1 + pick) % 3) as u8));
            ("play_special", json!({ "card_id": from_hand, "target_player": target, "action_type": "discard" }))
        }
        _ => ("free_market_refresh", json!({})),
    }
}

fn gems_move(kind: u8, pick: usize) -> (&'static str, Value) {
    const COLORS: [&str; 5] = ["white", "blue", "green", "red", "black"];
    match kind % 6 {
        0 => (
            "take_different_gems",
            json!({ "gems": [COLORS[pick % 5], COLORS[(pick + 1) % 5], COLORS[(pick + 2) % 5]] }),
        ),
        1 => ("take_same_gems", json!({ "gem_color": COLORS[pick % 5] })),
        2 => ("reserve_card", json!({ "card_level": pick % 3 + 1, "card_position": pick % 4 })),
        3 => ("purchase_card", json!({ "card_level": pick % 3 + 1, "card_position": pick % 4 })),
        4 => ("return_tokens", json!({ "tokens": { COLORS[pick % 5]: 1, "gold": pick % 2 } })),
        _ => ("purchase_card", json!({ "from_reserved": true, "card_index": pick % 3 })),
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn borscht_conserves_cards(seed in 0u64..1_000, moves in prop::collection::vec((0u8..6, 0usize..64), 1..40)) {
        let rt = runtime();
        rt.block_on(async {
            let mut session = new_session::<Borscht>(3, BorschtSettings::new(), seed);
            session.initialize().await.unwrap();
            let total = session.variant().card_total();

            for (kind, pick) in moves {
                if session.is_over() {
                    break;
                }
                let player = session.current_player();
                let (action, payload) = borscht_move(&session, kind, pick);
                let before = session.dump();
                if session.process_move(player, action, payload).await.is_err() {
                    assert_eq!(session.dump(), before);
                }
                assert_eq!(session.variant().cards_in_play(), total);
            }
        });
    }

    #[test]
    fn gems_conserves_cards_and_tokens(seed in 0u64..1_000, moves in prop::collection::vec((0u8..6, 0usize..64), 1..60)) {
        let rt = runtime();
        rt.block_on(async {
            let mut session = new_session::<Gems>(2, GemsSettings::new(), seed);
            session.initialize().await.unwrap();
            let cards = session.variant().card_total();
            let tokens = session.variant().tokens_in_play();

            for (kind, pick) in moves {
                if session.is_over() {
                    break;
                }
                let player = session.current_player();
                let (action, payload) = gems_move(kind, pick);
                let before = session.dump();
                if session.process_move(player, action, payload).await.is_err() {
                    assert_eq!(session.dump(), before);
                }
                let game = session.variant();
                assert_eq!(game.cards_in_play(), cards);
                assert_eq!(game.tokens_in_play(), tokens);
                for seat in Seat::all(2) {
                    if session.table().turn.current() != seat || !session.turn_state().is_waiting() {
                        assert!(game.tokens(seat).total() <= game.settings().token_limit);
                    }
                }
            }
        });
    }
}
