use std::sync::Arc;

use chess_core::{Color, Move, Position};
use server::auth::{jwt, JwtAuthResolver};
use server::db::{GameId, GameStore, GameUpdate, MemoryGameStore};
use server::session::{CommandType, Outbound, ServerMessage, SessionCoordinator, UserGameCommand};
use tokio::sync::mpsc;

pub const SECRET: &str = "test-secret";

/// A coordinator over an in-memory store holding one game with alice as
/// white and bob as black.
pub struct Harness {
    pub coordinator: Arc<SessionCoordinator>,
    pub store: Arc<MemoryGameStore>,
    pub game_id: GameId,
}

impl Harness {
    pub async fn new() -> Self {
        let store = Arc::new(MemoryGameStore::new());
        let game_id = store.create("test game");
        for (color, username) in [(Color::White, "alice"), (Color::Black, "bob")] {
            store
                .update(
                    game_id,
                    GameUpdate::Username {
                        color,
                        username: Some(username.to_string()),
                    },
                )
                .await
                .unwrap();
        }

        let coordinator = Arc::new(SessionCoordinator::new(
            Arc::new(JwtAuthResolver::new(SECRET)),
            store.clone(),
        ));
        Self {
            coordinator,
            store,
            game_id,
        }
    }

    /// Send one command from `client` and wait for it to finish.
    pub async fn send(&self, client: &Client, command_type: CommandType, mv: Option<Move>) {
        let command = client.command(command_type, self.game_id, mv);
        self.coordinator.handle(command, &client.tx).await;
    }

    pub async fn connect(&self, client: &mut Client) {
        self.send(client, CommandType::Connect, None).await;
        client.drain();
    }
}

/// One fake socket: the coordinator writes to `tx`, the test reads `rx`.
pub struct Client {
    pub token: String,
    pub tx: Outbound,
    pub rx: mpsc::UnboundedReceiver<ServerMessage>,
}

impl Client {
    pub fn new(username: &str) -> Self {
        Self::with_token(jwt::create_token(username, SECRET, 1).unwrap())
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            token: token.into(),
            tx,
            rx,
        }
    }

    pub fn command(&self, command_type: CommandType, game_id: GameId, mv: Option<Move>) -> UserGameCommand {
        UserGameCommand {
            command_type,
            auth_token: self.token.clone(),
            game_id,
            mv,
        }
    }

    /// Everything queued so far.
    pub fn drain(&mut self) -> Vec<ServerMessage> {
        let mut out = Vec::new();
        while let Ok(msg) = self.rx.try_recv() {
            out.push(msg);
        }
        out
    }

    /// Queued messages as text: `LOAD_GAME` or the message body.
    pub fn texts(&mut self) -> Vec<String> {
        self.drain()
            .into_iter()
            .map(|msg| match msg {
                ServerMessage::LoadGame { .. } => "LOAD_GAME".to_string(),
                ServerMessage::Error { message } | ServerMessage::Notification { message } => message,
            })
            .collect()
    }
}

/// Algebraic square name to position, e.g. "e4".
pub fn sq(name: &str) -> Position {
    let b = name.as_bytes();
    Position::new(b[1] - b'0', b[0] - b'a' + 1)
}

pub fn mv(from: &str, to: &str) -> Option<Move> {
    Some(Move::new(sq(from), sq(to)))
}
