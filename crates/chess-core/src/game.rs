//! Rules engine: legal moves, move application and check classification.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::board::Board;
use crate::movegen::pseudo_legal_moves;
use crate::types::{Color, Move, Piece, Position};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MoveError {
    #[error("game has ended")]
    GameEnded,

    #[error("not your turn")]
    NotYourTurn,

    #[error("illegal move: {0}")]
    IllegalMove(Move),
}

/// Where the side to move stands after a move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GameStatus {
    Ongoing,
    Check,
    Checkmate,
    Stalemate,
}

impl GameStatus {
    /// Checkmate and stalemate end the game.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Checkmate | Self::Stalemate)
    }
}

/// A board plus the side to move. `side_to_move == None` means the game is
/// over (checkmate, stalemate or resignation) and accepts no further moves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Game {
    board: Board,
    side_to_move: Option<Color>,
}

impl Default for Game {
    fn default() -> Self {
        Self::new()
    }
}

impl Game {
    /// Standard starting position, white to move.
    pub fn new() -> Self {
        Self {
            board: Board::standard(),
            side_to_move: Some(Color::White),
        }
    }

    pub fn from_board(board: Board, side_to_move: Option<Color>) -> Self {
        Self {
            board,
            side_to_move,
        }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn side_to_move(&self) -> Option<Color> {
        self.side_to_move
    }

    pub fn is_ended(&self) -> bool {
        self.side_to_move.is_none()
    }

    /// Terminal transition; there is no way back.
    pub fn end(&mut self) {
        self.side_to_move = None;
    }

    /// Legal moves for whatever stands on `from`, or `None` for an empty square.
    ///
    /// Each pseudo-legal move is played on a copy of the board and kept only if
    /// the mover's king is not attacked afterwards.
    pub fn legal_moves(&self, from: Position) -> Option<Vec<Move>> {
        let piece = self.board.get(from)?;
        let moves = pseudo_legal_moves(&self.board, from, piece)
            .into_iter()
            .filter(|mv| {
                let mut simulated = self.board.clone();
                simulated.place(mv.start, None);
                simulated.place(mv.end, Some(piece));
                !is_in_check(&simulated, piece.color)
            })
            .collect();
        Some(moves)
    }

    /// Validate `mv` against the legal moves of its start square and play it.
    pub fn apply_move(&mut self, mv: &Move) -> Result<(), MoveError> {
        let side = self.side_to_move.ok_or(MoveError::GameEnded)?;
        let piece = self.board.get(mv.start).ok_or(MoveError::IllegalMove(*mv))?;
        if piece.color != side {
            return Err(MoveError::NotYourTurn);
        }

        let legal = self.legal_moves(mv.start).unwrap_or_default();
        if !legal.contains(mv) {
            return Err(MoveError::IllegalMove(*mv));
        }

        let landing = match mv.promotion {
            Some(promoted) => Piece::new(piece.color, promoted),
            None => piece,
        };
        self.board.place(mv.start, None);
        self.board.place(mv.end, Some(landing));
        self.side_to_move = Some(side.opposite());
        Ok(())
    }

    pub fn is_in_check(&self, color: Color) -> bool {
        is_in_check(&self.board, color)
    }

    /// True when none of `color`'s pieces has a legal move.
    ///
    /// This does not look at whether the king is attacked, so a stalemated
    /// side also satisfies it. Use [`Game::status`] to tell the two apart.
    pub fn is_in_checkmate(&self, color: Color) -> bool {
        !self.has_legal_moves(color)
    }

    pub fn is_in_stalemate(&self, color: Color) -> bool {
        self.is_in_checkmate(color) && !self.is_in_check(color)
    }

    /// Classify `color`'s situation on the current board.
    pub fn status(&self, color: Color) -> GameStatus {
        let in_check = self.is_in_check(color);
        match (self.has_legal_moves(color), in_check) {
            (false, true) => GameStatus::Checkmate,
            (false, false) => GameStatus::Stalemate,
            (true, true) => GameStatus::Check,
            (true, false) => GameStatus::Ongoing,
        }
    }

    fn has_legal_moves(&self, color: Color) -> bool {
        self.board
            .pieces()
            .filter(|(_, p)| p.color == color)
            .any(|(pos, _)| self.legal_moves(pos).is_some_and(|moves| !moves.is_empty()))
    }
}

/// Whether any opposing piece's pseudo-legal move lands on `color`'s king.
/// A board without that king is never in check.
pub fn is_in_check(board: &Board, color: Color) -> bool {
    let Some(king) = board.locate_king(color) else {
        return false;
    };
    board
        .pieces()
        .filter(|(_, p)| p.color != color)
        .any(|(pos, piece)| {
            pseudo_legal_moves(board, pos, piece)
                .iter()
                .any(|mv| mv.end == king)
        })
}
