//! Value types shared by the board, the move generator and the rules engine.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Side of the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Color {
    White,
    Black,
}

impl Color {
    pub const fn opposite(self) -> Self {
        match self {
            Self::White => Self::Black,
            Self::Black => Self::White,
        }
    }

    /// Row a pawn of this color starts on.
    pub const fn pawn_start_row(self) -> u8 {
        match self {
            Self::White => 2,
            Self::Black => 7,
        }
    }

    /// Farthest row from this color's side; pawns promote here.
    pub const fn promotion_row(self) -> u8 {
        match self {
            Self::White => 8,
            Self::Black => 1,
        }
    }

    /// Row direction pawns of this color advance in.
    pub const fn forward(self) -> i8 {
        match self {
            Self::White => 1,
            Self::Black => -1,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::White => "WHITE",
            Self::Black => "BLACK",
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PieceType {
    King,
    Queen,
    Rook,
    Bishop,
    Knight,
    Pawn,
}

/// Piece types a pawn may promote to, in the order moves are emitted.
pub const PROMOTION_TYPES: [PieceType; 4] = [
    PieceType::Rook,
    PieceType::Knight,
    PieceType::Bishop,
    PieceType::Queen,
];

impl PieceType {
    pub const fn name(self) -> &'static str {
        match self {
            Self::King => "king",
            Self::Queen => "queen",
            Self::Rook => "rook",
            Self::Bishop => "bishop",
            Self::Knight => "knight",
            Self::Pawn => "pawn",
        }
    }
}

impl fmt::Display for PieceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Piece {
    pub color: Color,
    #[serde(rename = "type")]
    pub piece_type: PieceType,
}

impl Piece {
    pub const fn new(color: Color, piece_type: PieceType) -> Self {
        Self { color, piece_type }
    }
}

/// A square on the 8×8 board. Rows and columns are both 1-based, row 1 is
/// white's back rank and column 1 is the a-file.
///
/// Deserialization rejects coordinates outside 1..8, so a `Position` that
/// arrived over the wire is always on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawPosition")]
pub struct Position {
    row: u8,
    col: u8,
}

#[derive(Deserialize)]
struct RawPosition {
    row: i64,
    col: i64,
}

impl TryFrom<RawPosition> for Position {
    type Error = String;

    fn try_from(raw: RawPosition) -> Result<Self, Self::Error> {
        Position::try_new(raw.row, raw.col)
            .ok_or_else(|| format!("position ({}, {}) is off the board", raw.row, raw.col))
    }
}

impl Position {
    /// Build a position from coordinates already known to be in 1..8.
    ///
    /// # Panics
    /// Panics if either coordinate is outside 1..8.
    pub const fn new(row: u8, col: u8) -> Self {
        assert!(row >= 1 && row <= 8 && col >= 1 && col <= 8, "position off the board");
        Self { row, col }
    }

    /// Checked constructor; `None` for anything off the board.
    pub fn try_new(row: i64, col: i64) -> Option<Self> {
        if (1..=8).contains(&row) && (1..=8).contains(&col) {
            Some(Self {
                row: row as u8,
                col: col as u8,
            })
        } else {
            None
        }
    }

    pub const fn row(self) -> u8 {
        self.row
    }

    pub const fn col(self) -> u8 {
        self.col
    }

    /// The square `d_row` rows and `d_col` columns away, if it is on the board.
    pub fn offset(self, d_row: i8, d_col: i8) -> Option<Self> {
        Self::try_new(
            i64::from(self.row) + i64::from(d_row),
            i64::from(self.col) + i64::from(d_col),
        )
    }

    /// Every square, row 1 first, columns a..h within a row.
    pub fn all() -> impl Iterator<Item = Position> {
        (1..=8u8).flat_map(|row| (1..=8u8).map(move |col| Position { row, col }))
    }

    pub(crate) const fn index(self) -> (usize, usize) {
        (self.row as usize - 1, self.col as usize - 1)
    }
}

/// Algebraic square name, e.g. `e4`.
impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", (b'a' + self.col - 1) as char, self.row)
    }
}

/// A move from `start` to `end`. `promotion` is set exactly when a pawn lands
/// on its promotion row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Move {
    pub start: Position,
    pub end: Position,
    #[serde(default)]
    pub promotion: Option<PieceType>,
}

impl Move {
    pub const fn new(start: Position, end: Position) -> Self {
        Self {
            start,
            end,
            promotion: None,
        }
    }

    pub const fn with_promotion(start: Position, end: Position, promotion: PieceType) -> Self {
        Self {
            start,
            end,
            promotion: Some(promotion),
        }
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.start, self.end)?;
        if let Some(p) = self.promotion {
            write!(f, "={}", p.name())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_display() {
        assert_eq!(Position::new(1, 1).to_string(), "a1");
        assert_eq!(Position::new(4, 5).to_string(), "e4");
        assert_eq!(Position::new(8, 8).to_string(), "h8");
    }

    #[test]
    fn test_offset_drops_off_board() {
        let a1 = Position::new(1, 1);
        assert_eq!(a1.offset(-1, 0), None);
        assert_eq!(a1.offset(0, -1), None);
        assert_eq!(a1.offset(2, 1), Some(Position::new(3, 2)));
        assert_eq!(Position::new(8, 8).offset(1, 1), None);
    }

    #[test]
    fn test_position_rejects_off_board_json() {
        let ok: Position = serde_json::from_str(r#"{"row":2,"col":5}"#).unwrap();
        assert_eq!(ok, Position::new(2, 5));
        assert!(serde_json::from_str::<Position>(r#"{"row":0,"col":5}"#).is_err());
        assert!(serde_json::from_str::<Position>(r#"{"row":3,"col":9}"#).is_err());
    }

    #[test]
    fn test_move_json_promotion_optional() {
        let mv: Move =
            serde_json::from_str(r#"{"start":{"row":7,"col":1},"end":{"row":8,"col":1}}"#).unwrap();
        assert_eq!(mv.promotion, None);

        let mv: Move = serde_json::from_str(
            r#"{"start":{"row":7,"col":1},"end":{"row":8,"col":1},"promotion":"QUEEN"}"#,
        )
        .unwrap();
        assert_eq!(mv.promotion, Some(PieceType::Queen));
    }

    #[test]
    fn test_all_positions() {
        assert_eq!(Position::all().count(), 64);
        assert_eq!(Position::all().next(), Some(Position::new(1, 1)));
    }
}
