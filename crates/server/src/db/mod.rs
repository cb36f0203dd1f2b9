//! Game persistence.
//!
//! The coordinator treats the store as the authoritative copy of every game:
//! it reads the record at the start of each command and writes back before
//! telling anyone about the result.

pub mod games;
pub mod memory;
pub mod pool;

use async_trait::async_trait;
use chess_core::{Color, Game};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use games::PgGameStore;
pub use memory::MemoryGameStore;

pub type GameId = i32;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("game {0} not found")]
    NotFound(GameId),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// A stored game: the two player slots plus the board and turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameData {
    #[serde(rename = "gameID")]
    pub game_id: GameId,
    pub white_username: Option<String>,
    pub black_username: Option<String>,
    pub game_name: String,
    pub game: Game,
}

impl GameData {
    pub fn new(game_id: GameId, game_name: impl Into<String>) -> Self {
        Self {
            game_id,
            white_username: None,
            black_username: None,
            game_name: game_name.into(),
            game: Game::new(),
        }
    }

    pub fn username(&self, color: Color) -> Option<&str> {
        match color {
            Color::White => self.white_username.as_deref(),
            Color::Black => self.black_username.as_deref(),
        }
    }

    /// Which slot `username` occupies, white checked first.
    pub fn color_of(&self, username: &str) -> Option<Color> {
        [Color::White, Color::Black]
            .into_iter()
            .find(|&color| self.username(color) == Some(username))
    }

    /// The player's username, or the color name when the slot is empty.
    pub fn display_name(&self, color: Color) -> String {
        self.username(color)
            .map(str::to_string)
            .unwrap_or_else(|| color.to_string())
    }
}

/// One store write. A write changes a player slot or the game state, never
/// both.
#[derive(Debug, Clone)]
pub enum GameUpdate {
    /// Assign (`Some`) or clear (`None`) a player slot.
    Username {
        color: Color,
        username: Option<String>,
    },
    /// Replace board and turn.
    State(Game),
}

#[async_trait]
pub trait GameStore: Send + Sync {
    async fn get(&self, game_id: GameId) -> Result<GameData, StoreError>;

    async fn update(&self, game_id: GameId, update: GameUpdate) -> Result<(), StoreError>;
}
