//! Pseudo-legal move generation.
//!
//! Moves here follow each piece's movement pattern and the occupancy of the
//! board, nothing else: whether a move leaves the mover's king in check is the
//! rules engine's job. Every generator is a plain function of
//! `(board, square, color)`.

use crate::board::Board;
use crate::types::{Color, Move, Piece, PieceType, Position, PROMOTION_TYPES};

const ORTHOGONALS: [(i8, i8); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];
const DIAGONALS: [(i8, i8); 4] = [(1, 1), (1, -1), (-1, 1), (-1, -1)];
const ALL_DIRECTIONS: [(i8, i8); 8] = [
    (1, 0),
    (-1, 0),
    (0, 1),
    (0, -1),
    (1, 1),
    (1, -1),
    (-1, 1),
    (-1, -1),
];
const KNIGHT_OFFSETS: [(i8, i8); 8] = [
    (2, 1),
    (2, -1),
    (-2, 1),
    (-2, -1),
    (1, 2),
    (1, -2),
    (-1, 2),
    (-1, -2),
];

/// Pseudo-legal moves for `piece` standing on `from`.
pub fn pseudo_legal_moves(board: &Board, from: Position, piece: Piece) -> Vec<Move> {
    let color = piece.color;
    match piece.piece_type {
        PieceType::Bishop => slide(board, from, color, &DIAGONALS),
        PieceType::Rook => slide(board, from, color, &ORTHOGONALS),
        PieceType::Queen => slide(board, from, color, &ALL_DIRECTIONS),
        PieceType::Knight => step(board, from, color, &KNIGHT_OFFSETS),
        PieceType::King => step(board, from, color, &ALL_DIRECTIONS),
        PieceType::Pawn => pawn_moves(board, from, color),
    }
}

/// Walk each direction until the edge or the first occupied square. An enemy
/// piece on that square is a capture; a friendly one just ends the walk.
fn slide(board: &Board, from: Position, color: Color, directions: &[(i8, i8)]) -> Vec<Move> {
    let mut moves = Vec::new();
    for &(dr, dc) in directions {
        let mut current = from;
        while let Some(to) = current.offset(dr, dc) {
            match board.get(to) {
                None => moves.push(Move::new(from, to)),
                Some(other) => {
                    if other.color != color {
                        moves.push(Move::new(from, to));
                    }
                    break;
                }
            }
            current = to;
        }
    }
    moves
}

/// Single hops (knight and king): any in-bounds target not held by our own color.
fn step(board: &Board, from: Position, color: Color, offsets: &[(i8, i8)]) -> Vec<Move> {
    offsets
        .iter()
        .filter_map(|&(dr, dc)| from.offset(dr, dc))
        .filter(|&to| board.get(to).map_or(true, |p| p.color != color))
        .map(|to| Move::new(from, to))
        .collect()
}

fn pawn_moves(board: &Board, from: Position, color: Color) -> Vec<Move> {
    let forward = color.forward();
    let mut moves = Vec::new();

    if let Some(one) = from.offset(forward, 0) {
        if board.is_empty_at(one) {
            push_pawn_move(&mut moves, from, one, color);

            if from.row() == color.pawn_start_row() {
                if let Some(two) = one.offset(forward, 0) {
                    if board.is_empty_at(two) {
                        push_pawn_move(&mut moves, from, two, color);
                    }
                }
            }
        }
    }

    for side in [-1, 1] {
        if let Some(to) = from.offset(forward, side) {
            if matches!(board.get(to), Some(target) if target.color != color) {
                push_pawn_move(&mut moves, from, to, color);
            }
        }
    }

    moves
}

/// A pawn landing on its promotion row yields one move per promotion type
/// and never a plain move.
fn push_pawn_move(moves: &mut Vec<Move>, from: Position, to: Position, color: Color) {
    if to.row() == color.promotion_row() {
        moves.extend(
            PROMOTION_TYPES
                .iter()
                .map(|&promotion| Move::with_promotion(from, to, promotion)),
        );
    } else {
        moves.push(Move::new(from, to));
    }
}
