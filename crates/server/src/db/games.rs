use async_trait::async_trait;
use chess_core::{Color, Game};
use sqlx::types::Json;
use sqlx::PgPool;

use super::{GameData, GameId, GameStore, GameUpdate, StoreError};

/// Postgres-backed game store. The board and turn live in a JSONB column.
#[derive(Clone)]
pub struct PgGameStore {
    pool: PgPool,
}

#[derive(sqlx::FromRow)]
struct GameRow {
    id: GameId,
    white_username: Option<String>,
    black_username: Option<String>,
    game_name: String,
    game: Json<Game>,
}

impl From<GameRow> for GameData {
    fn from(row: GameRow) -> Self {
        Self {
            game_id: row.id,
            white_username: row.white_username,
            black_username: row.black_username,
            game_name: row.game_name,
            game: row.game.0,
        }
    }
}

impl PgGameStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn username_column(color: Color) -> &'static str {
    match color {
        Color::White => "white_username",
        Color::Black => "black_username",
    }
}

#[async_trait]
impl GameStore for PgGameStore {
    async fn get(&self, game_id: GameId) -> Result<GameData, StoreError> {
        let row = sqlx::query_as::<_, GameRow>(
            "SELECT id, white_username, black_username, game_name, game FROM games WHERE id = $1",
        )
        .bind(game_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NotFound(game_id))?;

        Ok(row.into())
    }

    async fn update(&self, game_id: GameId, update: GameUpdate) -> Result<(), StoreError> {
        let result = match update {
            GameUpdate::Username { color, username } => {
                let query = format!(
                    "UPDATE games SET {} = $1, updated_at = NOW() WHERE id = $2",
                    username_column(color)
                );
                sqlx::query(&query)
                    .bind(username)
                    .bind(game_id)
                    .execute(&self.pool)
                    .await?
            }
            GameUpdate::State(game) => {
                sqlx::query("UPDATE games SET game = $1, updated_at = NOW() WHERE id = $2")
                    .bind(Json(game))
                    .bind(game_id)
                    .execute(&self.pool)
                    .await?
            }
        };

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(game_id));
        }
        Ok(())
    }
}
