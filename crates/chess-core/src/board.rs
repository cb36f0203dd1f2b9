//! 8×8 board of optional pieces.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

use crate::types::{Color, Piece, PieceType, Position};

const BACK_RANK: [PieceType; 8] = [
    PieceType::Rook,
    PieceType::Knight,
    PieceType::Bishop,
    PieceType::Queen,
    PieceType::King,
    PieceType::Bishop,
    PieceType::Knight,
    PieceType::Rook,
];

/// Squares are stored row-major, row 1 first. Equality is square-by-square.
///
/// `Clone` is a full independent copy (pieces are plain values), which is
/// what move simulation relies on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Board {
    squares: [[Option<Piece>; 8]; 8],
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BoardParseError {
    #[error("expected 8 ranks, found {0}")]
    RankCount(usize),

    #[error("rank {rank} does not describe exactly 8 squares")]
    RankWidth { rank: u8 },

    #[error("unknown piece character '{0}'")]
    UnknownPiece(char),
}

impl Board {
    pub fn empty() -> Self {
        Self::default()
    }

    /// The standard starting arrangement.
    pub fn standard() -> Self {
        let mut board = Self::empty();
        for (i, piece_type) in BACK_RANK.iter().enumerate() {
            let col = i as u8 + 1;
            board.place(Position::new(1, col), Some(Piece::new(Color::White, *piece_type)));
            board.place(Position::new(2, col), Some(Piece::new(Color::White, PieceType::Pawn)));
            board.place(Position::new(7, col), Some(Piece::new(Color::Black, PieceType::Pawn)));
            board.place(Position::new(8, col), Some(Piece::new(Color::Black, *piece_type)));
        }
        board
    }

    /// Put `piece` on `pos`, or clear the square with `None`.
    pub fn place(&mut self, pos: Position, piece: Option<Piece>) {
        let (r, c) = pos.index();
        self.squares[r][c] = piece;
    }

    pub fn get(&self, pos: Position) -> Option<Piece> {
        let (r, c) = pos.index();
        self.squares[r][c]
    }

    pub fn is_empty_at(&self, pos: Position) -> bool {
        self.get(pos).is_none()
    }

    pub fn locate_king(&self, color: Color) -> Option<Position> {
        self.pieces()
            .find(|(_, p)| p.color == color && p.piece_type == PieceType::King)
            .map(|(pos, _)| pos)
    }

    /// Occupied squares in row-major order.
    pub fn pieces(&self) -> impl Iterator<Item = (Position, Piece)> + '_ {
        Position::all().filter_map(move |pos| self.get(pos).map(|p| (pos, p)))
    }
}

/// Parses the piece-placement field of a FEN string (rank 8 first), e.g.
/// `"rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR"`. Anything after the first
/// space is ignored.
impl FromStr for Board {
    type Err = BoardParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let placement = s.split_whitespace().next().unwrap_or("");
        let ranks: Vec<&str> = placement.split('/').collect();
        if ranks.len() != 8 {
            return Err(BoardParseError::RankCount(ranks.len()));
        }

        let mut board = Board::empty();
        for (i, rank) in ranks.iter().enumerate() {
            let row = 8 - i as u8;
            let mut col: u8 = 0;
            for ch in rank.chars() {
                if let Some(skip) = ch.to_digit(10) {
                    col += skip as u8;
                    if col > 8 {
                        return Err(BoardParseError::RankWidth { rank: row });
                    }
                    continue;
                }
                col += 1;
                if col > 8 {
                    return Err(BoardParseError::RankWidth { rank: row });
                }
                let piece = piece_from_char(ch).ok_or(BoardParseError::UnknownPiece(ch))?;
                board.place(Position::new(row, col), Some(piece));
            }
            if col != 8 {
                return Err(BoardParseError::RankWidth { rank: row });
            }
        }
        Ok(board)
    }
}

fn piece_from_char(ch: char) -> Option<Piece> {
    let color = if ch.is_ascii_uppercase() {
        Color::White
    } else {
        Color::Black
    };
    let piece_type = match ch.to_ascii_lowercase() {
        'k' => PieceType::King,
        'q' => PieceType::Queen,
        'r' => PieceType::Rook,
        'b' => PieceType::Bishop,
        'n' => PieceType::Knight,
        'p' => PieceType::Pawn,
        _ => return None,
    };
    Some(Piece::new(color, piece_type))
}
