//! End-to-end command handling against an in-memory store.

mod common;

use chess_core::{Board, Color, Game, Move, PieceType};
use common::{mv, sq, Client, Harness};
use server::db::{GameStore, GameUpdate};
use server::session::{CommandType, ServerMessage, UserGameCommand};

async fn set_position(h: &Harness, fen: &str, side: Color) {
    let board: Board = fen.parse().unwrap();
    h.store
        .update(h.game_id, GameUpdate::State(Game::from_board(board, Some(side))))
        .await
        .unwrap();
}

/// alice (white), bob (black) and carol (observer), all connected.
async fn full_table(h: &Harness) -> (Client, Client, Client) {
    let mut alice = Client::new("alice");
    let mut bob = Client::new("bob");
    let mut carol = Client::new("carol");
    h.connect(&mut alice).await;
    h.connect(&mut bob).await;
    h.connect(&mut carol).await;
    alice.drain();
    bob.drain();
    (alice, bob, carol)
}

#[tokio::test]
async fn test_connect_announces_role() {
    let h = Harness::new().await;
    let mut alice = Client::new("alice");
    let mut bob = Client::new("bob");
    let mut carol = Client::new("carol");

    h.send(&alice, CommandType::Connect, None).await;
    let msgs = alice.drain();
    assert_eq!(msgs, vec![ServerMessage::load_game(&Game::new())]);

    h.send(&bob, CommandType::Connect, None).await;
    assert_eq!(bob.texts(), vec!["LOAD_GAME"]);
    assert_eq!(alice.texts(), vec!["bob has joined the game as black!"]);

    h.send(&carol, CommandType::Connect, None).await;
    assert_eq!(carol.texts(), vec!["LOAD_GAME"]);
    assert_eq!(alice.texts(), vec!["carol has joined the game as an observer!"]);
    assert_eq!(bob.texts(), vec!["carol has joined the game as an observer!"]);

    assert_eq!(h.coordinator.registry().connection_count(h.game_id), 3);
}

#[tokio::test]
async fn test_move_is_persisted_and_broadcast() {
    let h = Harness::new().await;
    let (mut alice, mut bob, mut carol) = full_table(&h).await;

    h.send(&alice, CommandType::MakeMove, mv("e2", "e4")).await;

    assert_eq!(alice.texts(), vec!["LOAD_GAME"]);
    let expected = vec![
        "LOAD_GAME".to_string(),
        "alice moved the pawn at e2 to e4.".to_string(),
    ];
    assert_eq!(bob.texts(), expected);
    assert_eq!(carol.texts(), expected);

    let stored = h.store.get(h.game_id).await.unwrap();
    assert_eq!(stored.game.side_to_move(), Some(Color::Black));
    assert!(stored.game.board().is_empty_at(sq("e2")));
    assert!(!stored.game.board().is_empty_at(sq("e4")));
}

#[tokio::test]
async fn test_rejected_moves_only_reach_sender() {
    let h = Harness::new().await;
    let (mut alice, mut bob, mut carol) = full_table(&h).await;

    let cases = [
        (&bob, mv("e7", "e5"), "Error: Move cannot be made, wait for your next turn."),
        (&carol, mv("e2", "e4"), "Error: Move cannot be made, you are not joined in the game."),
        (&alice, mv("e7", "e5"), "Error: Move cannot be made, the requested piece is not your team color's."),
        (&alice, mv("e4", "e5"), "Error: Move cannot be made, no piece in that space."),
        (&alice, mv("e2", "e5"), "Error: Invalid move entered, please try again."),
        (&alice, None, "Error: No move provided."),
    ];
    for (client, requested, _) in &cases {
        h.send(client, CommandType::MakeMove, *requested).await;
    }

    let mut expected: Vec<String> = cases.iter().map(|(_, _, e)| e.to_string()).collect();
    let mut seen = alice.texts();
    seen.extend(bob.texts());
    seen.extend(carol.texts());
    seen.sort();
    expected.sort();
    assert_eq!(seen, expected);

    let stored = h.store.get(h.game_id).await.unwrap();
    assert_eq!(stored.game, Game::new());
}

#[tokio::test]
async fn test_promotion_must_be_named() {
    let h = Harness::new().await;
    set_position(&h, "7k/P7/8/8/8/8/8/K7", Color::White).await;
    let (mut alice, mut bob, _carol) = full_table(&h).await;

    h.send(&alice, CommandType::MakeMove, mv("a7", "a8")).await;
    assert_eq!(
        alice.texts(),
        vec!["Error: This pawn needs to be promoted to either a rook, knight, bishop or queen, please specify which one."]
    );
    assert!(bob.texts().is_empty());

    let promote = Move::with_promotion(sq("a7"), sq("a8"), PieceType::Queen);
    h.send(&alice, CommandType::MakeMove, Some(promote)).await;
    assert_eq!(alice.texts(), vec!["LOAD_GAME", "bob is in check!"]);
    assert_eq!(
        bob.texts(),
        vec!["LOAD_GAME", "alice moved the pawn at a7 to a8.", "bob is in check!"]
    );

    let stored = h.store.get(h.game_id).await.unwrap();
    let queen = stored.game.board().get(sq("a8")).unwrap();
    assert_eq!(queen.piece_type, PieceType::Queen);
    assert_eq!(stored.game.side_to_move(), Some(Color::Black));
}

#[tokio::test]
async fn test_checkmate_ends_game() {
    let h = Harness::new().await;
    let (mut alice, mut bob, mut carol) = full_table(&h).await;

    h.send(&alice, CommandType::MakeMove, mv("f2", "f3")).await;
    h.send(&bob, CommandType::MakeMove, mv("e7", "e5")).await;
    h.send(&alice, CommandType::MakeMove, mv("g2", "g4")).await;
    alice.drain();
    bob.drain();
    carol.drain();

    h.send(&bob, CommandType::MakeMove, mv("d8", "h4")).await;

    let msgs = alice.drain();
    assert!(matches!(msgs[0], ServerMessage::LoadGame { ended: true, .. }));
    assert_eq!(
        msgs[1..],
        [
            ServerMessage::notification("bob moved the queen at d8 to h4."),
            ServerMessage::notification("alice is in checkmate, game over!"),
        ]
    );
    assert_eq!(bob.texts(), vec!["LOAD_GAME", "alice is in checkmate, game over!"]);
    assert_eq!(carol.texts().len(), 3);

    let stored = h.store.get(h.game_id).await.unwrap();
    assert!(stored.game.is_ended());

    h.send(&alice, CommandType::MakeMove, mv("a2", "a3")).await;
    assert_eq!(alice.texts(), vec!["Error: Move cannot be made, game has ended."]);
    h.send(&alice, CommandType::Resign, None).await;
    assert_eq!(alice.texts(), vec!["Error: Can't resign, game has already ended."]);
}

#[tokio::test]
async fn test_stalemate_ends_game() {
    let h = Harness::new().await;
    set_position(&h, "k7/2K5/8/1Q6/8/8/8/8", Color::White).await;
    let (mut alice, mut bob, _carol) = full_table(&h).await;

    h.send(&alice, CommandType::MakeMove, mv("b5", "b6")).await;

    assert_eq!(alice.texts(), vec!["LOAD_GAME", "Stalemate, game over!"]);
    assert_eq!(
        bob.texts(),
        vec!["LOAD_GAME", "alice moved the queen at b5 to b6.", "Stalemate, game over!"]
    );
    assert!(h.store.get(h.game_id).await.unwrap().game.is_ended());
}

#[tokio::test]
async fn test_resign() {
    let h = Harness::new().await;
    let (mut alice, mut bob, mut carol) = full_table(&h).await;

    h.send(&carol, CommandType::Resign, None).await;
    assert_eq!(carol.texts(), vec!["Error: Move cannot be made, you are not joined in the game."]);
    let stored = h.store.get(h.game_id).await.unwrap();
    assert_eq!(stored.game.side_to_move(), Some(Color::White));

    h.send(&alice, CommandType::Resign, None).await;
    assert_eq!(alice.texts(), vec!["You resigned, game over!"]);
    assert_eq!(bob.texts(), vec!["alice resigned, game over!"]);
    assert_eq!(carol.texts(), vec!["alice resigned, game over!"]);
    assert!(h.store.get(h.game_id).await.unwrap().game.is_ended());

    h.send(&bob, CommandType::Resign, None).await;
    assert_eq!(bob.texts(), vec!["Error: Can't resign, game has already ended."]);
}

#[tokio::test]
async fn test_leave_frees_slot_and_connection() {
    let h = Harness::new().await;
    let (mut alice, mut bob, mut carol) = full_table(&h).await;

    h.send(&alice, CommandType::Leave, None).await;
    assert!(alice.texts().is_empty());
    assert_eq!(bob.texts(), vec!["alice has left the game"]);
    assert_eq!(carol.texts(), vec!["alice has left the game"]);
    assert_eq!(h.coordinator.registry().connection_count(h.game_id), 2);

    let stored = h.store.get(h.game_id).await.unwrap();
    assert_eq!(stored.white_username, None);
    assert_eq!(stored.black_username.as_deref(), Some("bob"));

    // An observer leaving touches no slot.
    h.send(&carol, CommandType::Leave, None).await;
    assert_eq!(bob.texts(), vec!["carol has left the game"]);
    let stored = h.store.get(h.game_id).await.unwrap();
    assert_eq!(stored.black_username.as_deref(), Some("bob"));

    // Broadcasts no longer reach those who left.
    h.send(&bob, CommandType::Resign, None).await;
    assert!(alice.texts().is_empty());
    assert!(carol.texts().is_empty());
}

#[tokio::test]
async fn test_bad_credential_is_not_registered() {
    let h = Harness::new().await;
    let mut mallory = Client::with_token("not-a-token");

    h.send(&mallory, CommandType::Connect, None).await;
    assert_eq!(mallory.texts(), vec!["Error: unauthorized"]);
    assert_eq!(h.coordinator.registry().connection_count(h.game_id), 0);

    let mut anonymous = Client::with_token("");
    h.send(&anonymous, CommandType::Connect, None).await;
    assert_eq!(anonymous.texts(), vec!["Error: unauthorized"]);
}

#[tokio::test]
async fn test_unknown_game_and_command() {
    let h = Harness::new().await;
    let mut alice = Client::new("alice");

    let cmd = alice.command(CommandType::Connect, 999, None);
    h.coordinator.handle(cmd, &alice.tx).await;
    assert_eq!(alice.texts(), vec!["Error: game 999 does not exist."]);
    assert_eq!(h.coordinator.registry().connection_count(999), 0);

    for game_id in 1000..1100 {
        let cmd = alice.command(CommandType::Connect, game_id, None);
        h.coordinator.handle(cmd, &alice.tx).await;
    }
    assert_eq!(alice.drain().len(), 100);
    assert_eq!(h.coordinator.registry().game_count(), 0);

    let raw = format!(
        r#"{{"commandType":"DANCE","authToken":"{}","gameID":{}}}"#,
        alice.token, h.game_id
    );
    let cmd: UserGameCommand = serde_json::from_str(&raw).unwrap();
    h.coordinator.handle(cmd, &alice.tx).await;
    assert_eq!(alice.texts(), vec!["Error: unknown command type"]);
}

#[tokio::test]
async fn test_missing_move_checked_after_game_state() {
    let h = Harness::new().await;
    let (mut alice, mut bob, _carol) = full_table(&h).await;

    h.send(&bob, CommandType::MakeMove, None).await;
    assert_eq!(bob.texts(), vec!["Error: Move cannot be made, wait for your next turn."]);

    h.send(&alice, CommandType::Resign, None).await;
    alice.drain();
    h.send(&alice, CommandType::MakeMove, None).await;
    assert_eq!(alice.texts(), vec!["Error: Move cannot be made, game has ended."]);
}

#[tokio::test]
async fn test_disconnect_forgets_socket() {
    let h = Harness::new().await;
    let (alice, bob, mut carol) = full_table(&h).await;
    let registry = h.coordinator.registry();
    assert_eq!(registry.connection_count(h.game_id), 3);

    // carol reconnected on a new socket; the old one closing must not drop it.
    let stale = carol.tx.clone();
    let (fresh_tx, fresh_rx) = tokio::sync::mpsc::unbounded_channel();
    carol.tx = fresh_tx;
    carol.rx = fresh_rx;
    h.connect(&mut carol).await;
    h.coordinator
        .disconnect([(h.game_id, carol.token.as_str())], &stale);
    assert_eq!(registry.connection_count(h.game_id), 3);

    for client in [&alice, &bob, &carol] {
        h.coordinator
            .disconnect([(h.game_id, client.token.as_str())], &client.tx);
    }
    assert_eq!(registry.connection_count(h.game_id), 0);
    assert_eq!(registry.game_count(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_moves_are_serialized() {
    let h = Harness::new().await;
    let (mut alice, mut bob, mut carol) = full_table(&h).await;

    let tasks: Vec<_> = [mv("e2", "e4"), mv("d2", "d4")]
        .into_iter()
        .map(|requested| {
            let coordinator = h.coordinator.clone();
            let cmd = alice.command(CommandType::MakeMove, h.game_id, requested);
            let tx = alice.tx.clone();
            tokio::spawn(async move { coordinator.handle(cmd, &tx).await })
        })
        .collect();
    for task in tasks {
        task.await.unwrap();
    }

    let stored = h.store.get(h.game_id).await.unwrap();
    assert_eq!(stored.game.side_to_move(), Some(Color::Black));
    let moved = [sq("e2"), sq("d2")]
        .iter()
        .filter(|&&pos| stored.game.board().is_empty_at(pos))
        .count();
    assert_eq!(moved, 1);

    let alice_msgs = alice.drain();
    assert_eq!(
        alice_msgs
            .iter()
            .filter(|m| **m == ServerMessage::error("Move cannot be made, wait for your next turn."))
            .count(),
        1
    );

    // Every connection saw exactly one board, and it is the stored one.
    for msgs in [alice_msgs, bob.drain(), carol.drain()] {
        let boards: Vec<&Game> = msgs
            .iter()
            .filter_map(|m| match m {
                ServerMessage::LoadGame { game, .. } => Some(game),
                _ => None,
            })
            .collect();
        assert_eq!(boards, vec![&stored.game]);
    }
}
