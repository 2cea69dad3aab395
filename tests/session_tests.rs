//! Session shell behavior driven through the Borscht variant.

use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::{json, Value};

use ccg_session::games::borscht::{Borscht, BorschtSettings, Recipe};
use ccg_session::protocol::{RecordingTransport, RequestBroker};
use ccg_session::session::{MemoryRoomStore, Session, SessionRegistry, SessionSnapshot, TurnState};
use ccg_session::{MoveError, PlayerId, Seat, SessionConfig, SessionError};

const A: PlayerId = PlayerId(101);
const B: PlayerId = PlayerId(102);
const C: PlayerId = PlayerId(103);

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("ccg_session=debug")
        .with_test_writer()
        .try_init();
}

fn recipe(id: &str, ingredients: &[&str]) -> Recipe {
    Recipe {
        id: id.into(),
        name: id.into(),
        ingredients: ingredients.iter().map(|i| i.to_string()).collect(),
        levels: vec![(ingredients.len(), 5)],
    }
}

fn session(transport: Arc<RecordingTransport>) -> Session<Borscht> {
    Session::new(
        "room-7",
        vec![A, B, C],
        BorschtSettings::new().with_event_cards(false),
        SessionConfig::new().with_request_timeout(Duration::from_secs(30)),
        2024,
        transport,
    )
    .unwrap()
}

/// Session with every recipe assigned, so `initialize` asks nothing.
async fn started(transport: Arc<RecordingTransport>) -> Session<Borscht> {
    let mut session = session(transport);
    for seat in Seat::all(3) {
        session
            .variant_mut()
            .set_recipe(seat, recipe("long", &["onion", "potato", "carrot", "beet", "cabbage"]));
    }
    session.initialize().await.unwrap();
    session
}

/// Answer the first `recipe_selection` sent to `player` with the second
/// offered recipe. Returns the chosen id.
async fn pick_second_recipe(broker: &RequestBroker, player: PlayerId) -> String {
    loop {
        let pending = broker.replay(player);
        if let Some(request) = pending.iter().find(|r| r["type"] == "recipe_selection") {
            let id = request["recipes"][1]["id"].as_str().unwrap().to_string();
            let response = json!({ "request_id": request["request_id"].clone(), "recipe_id": id });
            broker.resolve(player, response).unwrap();
            return id;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

#[tokio::test(start_paused = true)]
async fn test_unanswered_recipe_selection_times_out_once() {
    init_tracing();
    let transport = Arc::new(RecordingTransport::new());
    let mut session = session(transport.clone());
    let broker = session.broker();
    let began = tokio::time::Instant::now();

    let (result, chosen) = tokio::join!(session.initialize(), pick_second_recipe(&broker, B));
    result.unwrap();

    let waited = began.elapsed();
    assert!(waited >= Duration::from_secs(30) && waited < Duration::from_secs(31));
    assert_eq!(session.variant().recipe(Seat(1)).unwrap().id, chosen);
    for seat in Seat::all(3) {
        assert!(session.variant().recipe(seat).is_some());
    }
    assert_eq!(broker.outstanding(), 0);
    assert_eq!(transport.sent_to(A, "recipe_selected").len(), 1);
    assert_eq!(transport.broadcasts("new_turn")[0]["player"], json!(A));
}

#[tokio::test]
async fn test_out_of_turn_move_changes_nothing() {
    let transport = Arc::new(RecordingTransport::new());
    let mut session = started(transport.clone()).await;
    let before = session.dump();

    let err = session.process_move(B, "draw_cards", json!({})).await.unwrap_err();

    assert_eq!(err, MoveError::NotYourTurn);
    assert_eq!(session.dump(), before);
    let rejected = transport.sent_to(B, "move_rejected");
    assert_eq!(rejected[0]["error"], "not your turn");
    assert!(transport.broadcasts("move_rejected").is_empty());
}

#[tokio::test]
async fn test_gate_errors() {
    let transport = Arc::new(RecordingTransport::new());
    let mut fresh = session(transport.clone());
    assert_eq!(
        fresh.process_move(A, "skip", json!({})).await.unwrap_err(),
        MoveError::NotStarted
    );

    let mut session = started(transport).await;
    assert_eq!(
        session.process_move(PlayerId(9), "skip", json!({})).await.unwrap_err(),
        MoveError::UnknownPlayer
    );
    assert_eq!(
        session.process_move(A, "fly", json!({})).await.unwrap_err(),
        MoveError::UnknownAction("fly".into())
    );
    assert!(matches!(
        session.process_move(A, "add_ingredient", json!({ "card_id": 99_999 })).await,
        Err(MoveError::Invalid(_))
    ));
    assert_eq!(session.current_player(), A);
    assert_eq!(session.moves_made()[Seat(0)], 0);
}

#[tokio::test]
async fn test_turns_rotate_and_count_moves() {
    let transport = Arc::new(RecordingTransport::new());
    let mut session = started(transport.clone()).await;

    session.process_move(A, "draw_cards", json!({})).await.unwrap();
    session.process_move(B, "skip", json!({})).await.unwrap();

    assert_eq!(session.current_player(), C);
    assert_eq!(session.turn_state(), TurnState::NormalTurn);
    assert_eq!(session.table().turn.turn_number(), 3);
    assert_eq!(session.moves_made()[Seat(0)], 1);
    assert_eq!(session.variant().hand(Seat(0)).len(), 7);

    let state = transport.sent_to(C, "game_state").pop().unwrap();
    assert_eq!(state["state"]["current_player"], json!(C));
    assert_eq!(state["state"]["hand"].as_array().unwrap().len(), 5);
}

#[tokio::test]
async fn test_state_lists_legal_actions_of_the_current_player() {
    let transport = Arc::new(RecordingTransport::new());
    let session = started(transport).await;

    let state = session.get_state(A).unwrap();
    let actions: Vec<&str> = state["legal_actions"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(Value::as_str)
        .collect();
    assert!(actions.contains(&"draw_cards"));
    assert!(actions.contains(&"exchange_ingredients"));
    assert_eq!(session.get_state(B).unwrap()["legal_actions"], json!([]));
}

#[tokio::test]
async fn test_dump_and_load_round_trip() {
    let transport = Arc::new(RecordingTransport::new());
    let mut session = started(transport.clone()).await;
    session.process_move(A, "draw_cards", json!({})).await.unwrap();
    let snapshot = session.dump();

    let json = SessionSnapshot::<Borscht>::from_json(&snapshot.to_json().unwrap()).unwrap();
    let bytes = SessionSnapshot::<Borscht>::from_bytes(&snapshot.to_bytes().unwrap()).unwrap();
    assert_eq!(json, snapshot);
    assert_eq!(bytes, snapshot);

    let mut restored = Session::load(bytes, transport.clone()).await.unwrap();
    assert_eq!(restored.dump(), snapshot);

    // Both copies continue the same random stream.
    session.process_move(B, "draw_cards", json!({})).await.unwrap();
    restored.process_move(B, "draw_cards", json!({})).await.unwrap();
    assert_eq!(restored.variant().hand(Seat(1)), session.variant().hand(Seat(1)));
}

#[tokio::test]
async fn test_load_rejects_counters_for_another_roster() {
    let transport = Arc::new(RecordingTransport::new());
    let session = started(transport.clone()).await;
    let mut snapshot = session.dump();
    snapshot.moves = ccg_session::PlayerMap::with_value(2, 0);

    let err = Session::load(snapshot, transport).await.unwrap_err();
    assert!(matches!(err, SessionError::Snapshot(_)));
}

#[tokio::test]
async fn test_stats_only_after_game_over() {
    let transport = Arc::new(RecordingTransport::new());
    let session = started(transport).await;

    assert!(matches!(session.get_game_stats(), Err(SessionError::NotFinished)));
}

#[tokio::test]
async fn test_reconnect_replays_history_and_state() {
    let transport = Arc::new(RecordingTransport::new());
    let mut session = started(transport.clone()).await;
    session.process_move(A, "skip", json!({})).await.unwrap();
    transport.clear();

    session.reconnect(C).await;

    assert_eq!(transport.sent_to(C, "turn_skipped").len(), 1);
    assert_eq!(transport.sent_to(C, "game_started").len(), 1);
    assert_eq!(transport.sent_to(C, "game_state").len(), 1);
    assert!(transport.sent_to(A, "game_state").is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_reconnect_while_recipes_are_being_chosen() {
    let transport = Arc::new(RecordingTransport::new());
    let registry = SessionRegistry::<Borscht>::new(Arc::new(MemoryRoomStore::new()), transport.clone());
    let settings = json!({ "event_cards": false });

    let rejoin = async {
        tokio::time::sleep(Duration::from_secs(1)).await;
        let handle = registry.get("room-9").unwrap();
        assert!(handle.session.try_lock().is_err());
        transport.clear();

        registry.reconnect("room-9", B).await.unwrap();

        assert_eq!(transport.sent_to(B, "game_started").len(), 1);
        assert_eq!(transport.sent_to(B, "recipe_selection").len(), 1);
        let states = transport.sent_to(B, "game_state");
        assert_eq!(states.len(), 1);
        assert_eq!(states[0]["state"]["you"], json!(B));
        assert!(transport.sent_to(A, "game_state").is_empty());
    };
    let (started, ()) = tokio::join!(registry.start("room-9", vec![A, B, C], &settings, 11), rejoin);

    let handle = started.unwrap();
    assert!(handle.session.lock().await.is_started());
}

#[tokio::test]
async fn test_three_player_game_to_the_end() {
    init_tracing();
    let transport = Arc::new(RecordingTransport::new());
    let mut session = session(transport.clone());
    let game = session.variant_mut();
    game.set_recipe(Seat(0), recipe("quick", &["onion", "potato"]));
    game.set_recipe(Seat(1), recipe("slow", &["onion", "potato", "carrot", "beet"]));
    game.set_recipe(Seat(2), recipe("slow", &["onion", "potato", "carrot", "beet"]));
    let onion = game.give_card(Seat(0), "onion").unwrap();
    let potato = game.give_card(Seat(0), "potato").unwrap();
    session.initialize().await.unwrap();

    session
        .process_move(A, "add_ingredient", json!({ "card_id": onion }))
        .await
        .unwrap();
    session.process_move(B, "skip", json!({})).await.unwrap();
    session.process_move(C, "skip", json!({})).await.unwrap();
    assert_eq!(session.first_finisher(), None);

    session
        .process_move(A, "add_ingredient", json!({ "card_id": potato }))
        .await
        .unwrap();
    assert_eq!(session.first_finisher(), Some(A));
    assert_eq!(transport.broadcasts("goal_completed")[0]["player"], json!(A));

    // A is frozen for the final round.
    let err = session
        .process_move(B, "play_special", json!({ "card_id": 0, "target_player": A.0 }))
        .await
        .unwrap_err();
    assert_eq!(err, MoveError::FrozenTarget);

    session.process_move(B, "skip", json!({})).await.unwrap();
    assert!(!session.is_over());
    session.process_move(C, "skip", json!({})).await.unwrap();

    assert!(session.is_over());
    assert_eq!(session.turn_state(), TurnState::GameOver);
    assert_eq!(session.process_move(A, "skip", json!({})).await.unwrap_err(), MoveError::GameOver);

    let stats = session.get_game_stats().unwrap();
    assert_eq!(stats.winner, Some(A));
    assert_eq!(stats.first_finisher, Some(A));
    assert_eq!(stats.total_moves, 6);
    assert_eq!(stats.players[0].player, A);
    // onion 1 + potato 0 + recipe 5 + first finisher 2
    assert_eq!(stats.players[0].score, 8);
    assert_eq!(stats.players[0].breakdown["first_finisher_bonus"], 2);

    let over = transport.broadcasts("game_over");
    assert_eq!(over.len(), 1);
    assert_eq!(over[0]["winner"], json!(A));

    let state: Value = session.get_state(B).unwrap();
    assert_eq!(state["game_over"], true);
    assert_eq!(state["winner"], json!(A));
    assert_eq!(state["seats"][0]["recipe"]["id"], "quick");
}
