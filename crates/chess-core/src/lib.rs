//! Chess rules engine.
//!
//! An 8×8 board, per-piece pseudo-legal move generation and a `Game` that
//! filters those moves for king safety, applies them and classifies check,
//! checkmate and stalemate. Castling, en passant and draw rules other than
//! stalemate are not modelled.

pub mod board;
pub mod game;
pub mod movegen;
pub mod types;

pub use board::{Board, BoardParseError};
pub use game::{is_in_check, Game, GameStatus, MoveError};
pub use movegen::pseudo_legal_moves;
pub use types::{Color, Move, Piece, PieceType, Position, PROMOTION_TYPES};
