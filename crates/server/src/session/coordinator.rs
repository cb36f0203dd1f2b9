//! Command handling for live games.
//!
//! Every command is authenticated, its connection (re)registered, and then
//! dispatched. Commands that read or write a game run under that game's lock,
//! so two moves against the same game are evaluated one after the other and
//! the second sees the first's result. Games never share a lock, and the
//! connection registry has locks of its own.

use std::collections::HashMap;
use std::sync::Arc;

use chess_core::{GameStatus, Move, MoveError};
use parking_lot::Mutex;
use tokio::sync::OwnedMutexGuard;
use tracing::{debug, info, warn};

use super::messages::{CommandType, Notification, ServerMessage, UserGameCommand};
use super::registry::{ConnectionRegistry, Outbound};
use crate::auth::AuthResolver;
use crate::db::{GameData, GameId, GameStore, GameUpdate};
use crate::error::SessionError;

/// One async mutex per game id. An entry lives only while some command holds
/// or waits for it.
#[derive(Default)]
struct GameLocks {
    locks: Mutex<HashMap<GameId, Arc<tokio::sync::Mutex<()>>>>,
}

impl GameLocks {
    async fn acquire(&self, game_id: GameId) -> GameGuard<'_> {
        let lock = self.locks.lock().entry(game_id).or_default().clone();
        GameGuard {
            locks: self,
            game_id,
            guard: Some(lock.lock_owned().await),
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.locks.lock().len()
    }
}

/// Held for the duration of one command on one game.
struct GameGuard<'a> {
    locks: &'a GameLocks,
    game_id: GameId,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for GameGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        // Clones are only taken under the table lock, so a count of one here
        // means nobody holds or waits for this game's mutex.
        let mut locks = self.locks.locks.lock();
        if locks
            .get(&self.game_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(&self.game_id);
        }
    }
}

/// Who sent the command being handled.
struct Caller<'a> {
    username: String,
    credential: &'a str,
    game_id: GameId,
    outbound: &'a Outbound,
}

impl Caller<'_> {
    fn reply(&self, message: ServerMessage) {
        // A failed send means the socket is already closing; nothing to do.
        let _ = self.outbound.send(message);
    }
}

pub struct SessionCoordinator {
    auth: Arc<dyn AuthResolver>,
    store: Arc<dyn GameStore>,
    registry: ConnectionRegistry,
    locks: GameLocks,
}

impl SessionCoordinator {
    pub fn new(auth: Arc<dyn AuthResolver>, store: Arc<dyn GameStore>) -> Self {
        Self {
            auth,
            store,
            registry: ConnectionRegistry::new(),
            locks: GameLocks::default(),
        }
    }

    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    /// Process one command arriving on `outbound`'s connection. Failures are
    /// answered on that connection only.
    pub async fn handle(&self, command: UserGameCommand, outbound: &Outbound) {
        let game_id = command.game_id;
        let command_type = command.command_type;
        if let Err(e) = self.dispatch(command, outbound).await {
            warn!(game_id, ?command_type, "command rejected: {e}");
            let _ = outbound.send(e.to_message());
        }
    }

    async fn dispatch(&self, command: UserGameCommand, outbound: &Outbound) -> Result<(), SessionError> {
        let username = self.auth.resolve(&command.auth_token).await?;
        self.registry
            .add(command.game_id, &command.auth_token, outbound.clone());

        let caller = Caller {
            username,
            credential: &command.auth_token,
            game_id: command.game_id,
            outbound,
        };
        debug!(game_id = caller.game_id, username = %caller.username, command = ?command.command_type, "dispatching");

        let result = match command.command_type {
            CommandType::Connect => self.connect(&caller).await,
            CommandType::MakeMove => self.make_move(&caller, command.mv).await,
            CommandType::Leave => self.leave(&caller).await,
            CommandType::Resign => self.resign(&caller).await,
            CommandType::Unknown => Err(SessionError::UnknownCommand),
        };
        if matches!(result, Err(SessionError::GameNotFound(_))) {
            self.registry.remove(caller.game_id, caller.credential);
        }
        result
    }

    /// Forget `outbound` for each `(game id, credential)` it registered under.
    /// Called once its socket has closed.
    pub fn disconnect<'a>(&self, registrations: impl IntoIterator<Item = (GameId, &'a str)>, outbound: &Outbound) {
        for (game_id, credential) in registrations {
            self.registry.remove_connection(game_id, credential, outbound);
        }
    }

    async fn connect(&self, caller: &Caller<'_>) -> Result<(), SessionError> {
        // Held so the snapshot sent here cannot arrive after a newer broadcast.
        let _guard = self.locks.acquire(caller.game_id).await;
        let data = self.store.get(caller.game_id).await?;

        let notification = match data.color_of(&caller.username) {
            Some(color) => Notification::PlayerJoined {
                username: caller.username.clone(),
                color,
            },
            None => Notification::ObserverJoined {
                username: caller.username.clone(),
            },
        };

        caller.reply(ServerMessage::load_game(&data.game));
        self.registry
            .broadcast(caller.game_id, Some(caller.credential), &notification.into());
        info!(game_id = caller.game_id, username = %caller.username, "client connected");
        Ok(())
    }

    async fn make_move(&self, caller: &Caller<'_>, mv: Option<Move>) -> Result<(), SessionError> {
        let _guard = self.locks.acquire(caller.game_id).await;
        let data = self.store.get(caller.game_id).await?;

        let side = data.game.side_to_move().ok_or(SessionError::GameEnded)?;
        let color = data
            .color_of(&caller.username)
            .ok_or(SessionError::NotParticipant)?;
        if color != side {
            return Err(SessionError::NotYourTurn);
        }
        let mv = mv.ok_or(SessionError::MissingMove)?;

        let piece = data.game.board().get(mv.start).ok_or(SessionError::NoPiece)?;
        if piece.color != color {
            return Err(SessionError::NotYourPiece);
        }

        let mut game = data.game.clone();
        game.apply_move(&mv).map_err(|e| match e {
            MoveError::GameEnded => SessionError::GameEnded,
            MoveError::NotYourTurn => SessionError::NotYourTurn,
            MoveError::IllegalMove(_) if missing_promotion(&data, &mv) => {
                SessionError::PromotionRequired
            }
            MoveError::IllegalMove(_) => SessionError::IllegalMove,
        })?;

        let opponent = color.opposite();
        let status = game.status(opponent);
        if status.is_terminal() {
            game.end();
        }

        // Persist before anyone hears about the move or the result.
        self.store
            .update(caller.game_id, GameUpdate::State(game.clone()))
            .await?;

        self.registry
            .broadcast(caller.game_id, None, &ServerMessage::load_game(&game));
        let moved = Notification::MoveMade {
            username: caller.username.clone(),
            piece: piece.piece_type,
            mv,
        };
        self.registry
            .broadcast(caller.game_id, Some(caller.credential), &moved.into());

        let name = data.display_name(opponent);
        let outcome = match status {
            GameStatus::Stalemate => Some(Notification::Stalemate),
            GameStatus::Checkmate => Some(Notification::Checkmate { name }),
            GameStatus::Check => Some(Notification::Check { name }),
            GameStatus::Ongoing => None,
        };
        if let Some(notification) = outcome {
            self.registry
                .broadcast(caller.game_id, None, &notification.into());
        }
        if status.is_terminal() {
            info!(game_id = caller.game_id, ?status, "game over");
        }
        Ok(())
    }

    async fn leave(&self, caller: &Caller<'_>) -> Result<(), SessionError> {
        let _guard = self.locks.acquire(caller.game_id).await;
        let data = self.store.get(caller.game_id).await?;

        if let Some(color) = data.color_of(&caller.username) {
            self.store
                .update(caller.game_id, GameUpdate::Username { color, username: None })
                .await?;
        }

        let left = Notification::Left {
            username: caller.username.clone(),
        };
        self.registry
            .broadcast(caller.game_id, Some(caller.credential), &left.into());
        self.registry.remove(caller.game_id, caller.credential);
        info!(game_id = caller.game_id, username = %caller.username, "client left");
        Ok(())
    }

    async fn resign(&self, caller: &Caller<'_>) -> Result<(), SessionError> {
        let _guard = self.locks.acquire(caller.game_id).await;
        let data = self.store.get(caller.game_id).await?;

        if data.game.is_ended() {
            return Err(SessionError::ResignAfterEnd);
        }
        if data.color_of(&caller.username).is_none() {
            return Err(SessionError::NotParticipant);
        }

        let mut game = data.game;
        game.end();
        self.store
            .update(caller.game_id, GameUpdate::State(game))
            .await?;

        let resigned = Notification::Resigned {
            username: caller.username.clone(),
        };
        self.registry
            .broadcast(caller.game_id, Some(caller.credential), &resigned.into());
        caller.reply(ServerMessage::notification("You resigned, game over!"));
        info!(game_id = caller.game_id, username = %caller.username, "player resigned");
        Ok(())
    }
}

/// The move names a square its pawn can only reach by promoting, but gives
/// no promotion piece.
fn missing_promotion(data: &GameData, mv: &Move) -> bool {
    mv.promotion.is_none()
        && data
            .game
            .legal_moves(mv.start)
            .unwrap_or_default()
            .iter()
            .any(|legal| legal.end == mv.end && legal.promotion.is_some())
}
