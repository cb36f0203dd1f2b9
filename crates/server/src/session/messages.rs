//! Wire protocol between clients and the session coordinator.

use chess_core::{Color, Game, Move, PieceType};
use serde::{Deserialize, Serialize};

use crate::db::GameId;

// ---- Client → Server ----

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommandType {
    Connect,
    MakeMove,
    Leave,
    Resign,
    /// Any command name this server does not know.
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserGameCommand {
    pub command_type: CommandType,
    #[serde(alias = "credential")]
    pub auth_token: String,
    #[serde(rename = "gameID")]
    pub game_id: GameId,
    /// Only meaningful for `MAKE_MOVE`.
    #[serde(rename = "move", default, skip_serializing_if = "Option::is_none")]
    pub mv: Option<Move>,
}

// ---- Server → Client ----

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServerMessage {
    LoadGame { game: Game, ended: bool },
    Error { message: String },
    Notification { message: String },
}

impl ServerMessage {
    pub fn load_game(game: &Game) -> Self {
        Self::LoadGame {
            game: game.clone(),
            ended: game.is_ended(),
        }
    }

    pub fn error(message: impl std::fmt::Display) -> Self {
        Self::Error {
            message: format!("Error: {message}"),
        }
    }

    pub fn notification(message: impl Into<String>) -> Self {
        Self::Notification {
            message: message.into(),
        }
    }
}

/// Everything the coordinator announces to a game's other connections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    PlayerJoined { username: String, color: Color },
    ObserverJoined { username: String },
    MoveMade { username: String, piece: PieceType, mv: Move },
    Left { username: String },
    Resigned { username: String },
    Check { name: String },
    Checkmate { name: String },
    Stalemate,
}

impl Notification {
    pub fn text(&self) -> String {
        match self {
            Self::PlayerJoined { username, color } => match color {
                Color::White => format!("{username} has joined the game as white!"),
                Color::Black => format!("{username} has joined the game as black!"),
            },
            Self::ObserverJoined { username } => {
                format!("{username} has joined the game as an observer!")
            }
            Self::MoveMade { username, piece, mv } => {
                format!("{username} moved the {piece} at {} to {}.", mv.start, mv.end)
            }
            Self::Left { username } => format!("{username} has left the game"),
            Self::Resigned { username } => format!("{username} resigned, game over!"),
            Self::Check { name } => format!("{name} is in check!"),
            Self::Checkmate { name } => format!("{name} is in checkmate, game over!"),
            Self::Stalemate => "Stalemate, game over!".to_string(),
        }
    }
}

impl From<Notification> for ServerMessage {
    fn from(n: Notification) -> Self {
        ServerMessage::notification(n.text())
    }
}
