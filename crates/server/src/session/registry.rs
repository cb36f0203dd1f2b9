//! Per-game set of live client connections.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tokio::sync::mpsc;

use super::messages::ServerMessage;
use crate::db::GameId;

/// Outbound queue of one client. The socket's writer task owns the receiver;
/// once that task is gone every send fails.
pub type Outbound = mpsc::UnboundedSender<ServerMessage>;

type ConnectionSet = Arc<Mutex<HashMap<String, Outbound>>>;

/// Connections keyed by game id, then by credential.
///
/// Dead connections are not probed; they are dropped the first time a
/// broadcast fails to reach them. A game's entry disappears with its last
/// connection.
///
/// Lock order is always the game map, then a game's set. Inserting holds the
/// map's read lock and pruning its write lock, so a set is never dropped
/// while a connection is being added to it.
#[derive(Default)]
pub struct ConnectionRegistry {
    games: RwLock<HashMap<GameId, ConnectionSet>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the connection for `credential`.
    pub fn add(&self, game_id: GameId, credential: &str, outbound: Outbound) {
        {
            let games = self.games.read();
            if let Some(set) = games.get(&game_id) {
                set.lock().insert(credential.to_string(), outbound);
                return;
            }
        }
        self.games
            .write()
            .entry(game_id)
            .or_default()
            .lock()
            .insert(credential.to_string(), outbound);
    }

    pub fn remove(&self, game_id: GameId, credential: &str) {
        let set = self.games.read().get(&game_id).cloned();
        if let Some(set) = set {
            set.lock().remove(credential);
            self.prune(game_id);
        }
    }

    /// Remove `credential` only while it still maps to `outbound`'s channel.
    /// A newer socket that re-registered the same credential is left alone.
    pub fn remove_connection(&self, game_id: GameId, credential: &str, outbound: &Outbound) {
        let set = self.games.read().get(&game_id).cloned();
        if let Some(set) = set {
            {
                let mut set = set.lock();
                if set
                    .get(credential)
                    .is_some_and(|current| current.same_channel(outbound))
                {
                    set.remove(credential);
                }
            }
            self.prune(game_id);
        }
    }

    /// Send `message` to every connection on `game_id` except `exclude`.
    /// Connections whose send fails are evicted. Returns how many were reached.
    pub fn broadcast(&self, game_id: GameId, exclude: Option<&str>, message: &ServerMessage) -> usize {
        let set = self.games.read().get(&game_id).cloned();
        let Some(set) = set else {
            return 0;
        };

        let mut delivered = 0;
        let mut evicted = false;
        set.lock().retain(|credential, outbound| {
            if exclude == Some(credential.as_str()) {
                return true;
            }
            match outbound.send(message.clone()) {
                Ok(()) => {
                    delivered += 1;
                    true
                }
                Err(_) => {
                    tracing::debug!(game_id, "evicting closed connection");
                    evicted = true;
                    false
                }
            }
        });
        if evicted {
            self.prune(game_id);
        }
        delivered
    }

    /// Drop the game's entry if its set is empty. Must not be called with a
    /// set lock held.
    fn prune(&self, game_id: GameId) {
        let mut games = self.games.write();
        if games.get(&game_id).is_some_and(|set| set.lock().is_empty()) {
            games.remove(&game_id);
        }
    }

    pub fn connection_count(&self, game_id: GameId) -> usize {
        self.games
            .read()
            .get(&game_id)
            .map_or(0, |set| set.lock().len())
    }

    /// Number of games with at least one registered connection.
    pub fn game_count(&self) -> usize {
        self.games.read().len()
    }
}
