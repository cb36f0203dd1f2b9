use std::collections::BTreeMap;

use async_trait::async_trait;
use chess_core::Color;
use parking_lot::Mutex;

use super::{GameData, GameId, GameStore, GameUpdate, StoreError};

/// In-memory game store for tests and local runs.
pub struct MemoryGameStore {
    inner: Mutex<Inner>,
}

struct Inner {
    games: BTreeMap<GameId, GameData>,
    next_id: GameId,
}

impl MemoryGameStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                games: BTreeMap::new(),
                next_id: 1,
            }),
        }
    }

    /// Add a fresh game in the starting position and return its id.
    pub fn create(&self, game_name: &str) -> GameId {
        let mut inner = self.inner.lock();
        let id = inner.next_id;
        inner.next_id += 1;
        inner.games.insert(id, GameData::new(id, game_name));
        id
    }
}

impl Default for MemoryGameStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GameStore for MemoryGameStore {
    async fn get(&self, game_id: GameId) -> Result<GameData, StoreError> {
        self.inner
            .lock()
            .games
            .get(&game_id)
            .cloned()
            .ok_or(StoreError::NotFound(game_id))
    }

    async fn update(&self, game_id: GameId, update: GameUpdate) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        let data = inner
            .games
            .get_mut(&game_id)
            .ok_or(StoreError::NotFound(game_id))?;
        match update {
            GameUpdate::Username { color, username } => match color {
                Color::White => data.white_username = username,
                Color::Black => data.black_username = username,
            },
            GameUpdate::State(game) => data.game = game,
        }
        Ok(())
    }
}
