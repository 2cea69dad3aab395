//! Grid games and the session registry.

use std::sync::Arc;

use pretty_assertions::assert_eq;
use serde_json::json;

use ccg_session::games::grid::Grid;
use ccg_session::protocol::RecordingTransport;
use ccg_session::session::{MemoryRoomStore, PlayerStatus, RoomStatus, SessionRegistry};
use ccg_session::{MoveError, PlayerId, SessionError};

const X: PlayerId = PlayerId(5);
const O: PlayerId = PlayerId(6);

fn registry() -> (SessionRegistry<Grid>, Arc<MemoryRoomStore>, Arc<RecordingTransport>) {
    let store = Arc::new(MemoryRoomStore::new());
    let transport = Arc::new(RecordingTransport::new());
    (SessionRegistry::new(store.clone(), transport.clone()), store, transport)
}

async fn play(registry: &SessionRegistry<Grid>, room: &str, positions: &[u64]) {
    for (i, &position) in positions.iter().enumerate() {
        let player = if i % 2 == 0 { X } else { O };
        registry
            .submit_move(room, player, "place", json!({ "position": position }))
            .await
            .unwrap()
            .unwrap();
    }
}

#[tokio::test]
async fn test_line_ends_the_game_at_once() {
    let (registry, store, transport) = registry();
    registry.start("g1", vec![X, O], &json!(null), 3).await.unwrap();
    assert_eq!(store.room_status("g1"), Some(RoomStatus::InProgress));
    assert_eq!(store.player_status("g1", O), Some(PlayerStatus::Playing));

    play(&registry, "g1", &[0, 3, 1, 4, 2]).await;

    let handle = registry.get("g1").unwrap();
    let session = handle.session.lock().await;
    assert!(session.is_over());
    assert_eq!(session.first_finisher(), Some(X));
    let stats = session.get_game_stats().unwrap();
    assert_eq!(stats.winner, Some(X));
    assert_eq!(stats.players[0].breakdown["marks"], 3);

    assert_eq!(store.room_status("g1"), Some(RoomStatus::Finished));
    assert_eq!(store.player_status("g1", X), Some(PlayerStatus::Won));
    assert_eq!(store.player_status("g1", O), Some(PlayerStatus::Lost));
    assert_eq!(transport.broadcasts("game_over")[0]["winner"], json!(X));
}

#[tokio::test]
async fn test_full_board_is_a_draw() {
    let (registry, store, _) = registry();
    registry.start("g2", vec![X, O], &json!({}), 3).await.unwrap();

    // X O X / X O O / O X X
    play(&registry, "g2", &[0, 1, 2, 4, 3, 5, 7, 6, 8]).await;

    let handle = registry.get("g2").unwrap();
    let session = handle.session.lock().await;
    assert!(session.is_over());
    assert_eq!(session.get_game_stats().unwrap().winner, None);
    assert_eq!(store.player_status("g2", X), Some(PlayerStatus::Lost));
}

#[tokio::test]
async fn test_registry_errors() {
    let (registry, _, _) = registry();
    registry.start("g3", vec![X, O], &json!(null), 3).await.unwrap();

    assert!(matches!(
        registry.start("g3", vec![X, O], &json!(null), 3).await,
        Err(SessionError::RoomExists(_))
    ));
    assert!(matches!(
        registry.submit_move("nope", X, "place", json!({ "position": 0 })).await,
        Err(SessionError::RoomNotFound(_))
    ));
    assert!(matches!(
        registry.start("g4", vec![X], &json!(null), 3).await,
        Err(SessionError::Config(_))
    ));

    let rejected = registry
        .submit_move("g3", O, "place", json!({ "position": 0 }))
        .await
        .unwrap();
    assert_eq!(rejected.unwrap_err(), MoveError::NotYourTurn);
    assert!(registry.respond("g3", X, json!({ "request_id": "missing" })).is_err());
}

#[tokio::test]
async fn test_remove_marks_unfinished_room() {
    let (registry, store, _) = registry();
    registry.start("g5", vec![X, O], &json!(null), 3).await.unwrap();
    play(&registry, "g5", &[4]).await;

    registry.remove("g5").await.unwrap();

    assert!(registry.is_empty());
    assert_eq!(store.room_status("g5"), Some(RoomStatus::Finished));
    assert!(matches!(registry.remove("g5").await, Err(SessionError::RoomNotFound(_))));
}

#[tokio::test]
async fn test_registry_reconnect_sends_state() {
    let (registry, _, transport) = registry();
    registry.start("g6", vec![X, O], &json!(null), 3).await.unwrap();
    play(&registry, "g6", &[8]).await;
    transport.clear();

    registry.reconnect("g6", O).await.unwrap();

    let states = transport.sent_to(O, "game_state");
    assert_eq!(states.len(), 1);
    assert_eq!(states[0]["state"]["board"][8], "X");
    assert_eq!(transport.sent_to(O, "mark_placed").len(), 1);
}
