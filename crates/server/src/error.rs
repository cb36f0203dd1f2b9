use crate::auth::AuthError;
use crate::db::{GameId, StoreError};
use crate::session::messages::ServerMessage;

/// Why a command was refused. Every variant is reported to the sending
/// connection only.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("game {0} does not exist.")]
    GameNotFound(GameId),

    #[error("Move cannot be made, game has ended.")]
    GameEnded,

    #[error("Can't resign, game has already ended.")]
    ResignAfterEnd,

    #[error("Move cannot be made, you are not joined in the game.")]
    NotParticipant,

    #[error("Move cannot be made, wait for your next turn.")]
    NotYourTurn,

    #[error("No move provided.")]
    MissingMove,

    #[error("Move cannot be made, no piece in that space.")]
    NoPiece,

    #[error("Move cannot be made, the requested piece is not your team color's.")]
    NotYourPiece,

    #[error("This pawn needs to be promoted to either a rook, knight, bishop or queen, please specify which one.")]
    PromotionRequired,

    #[error("Invalid move entered, please try again.")]
    IllegalMove,

    #[error("unknown command type")]
    UnknownCommand,

    #[error("invalid message: {0}")]
    InvalidMessage(String),

    #[error(transparent)]
    Store(StoreError),

    #[error(transparent)]
    Auth(#[from] AuthError),
}

impl From<StoreError> for SessionError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(id) => SessionError::GameNotFound(id),
            other => SessionError::Store(other),
        }
    }
}

impl SessionError {
    /// The targeted `ERROR` message for the sender.
    pub fn to_message(&self) -> ServerMessage {
        match self {
            SessionError::Store(e) => {
                tracing::error!("Store error: {e}");
                ServerMessage::error("the game could not be loaded or saved, please try again.")
            }
            SessionError::Auth(_) => ServerMessage::error("unauthorized"),
            other => ServerMessage::error(other),
        }
    }
}
