//! Pseudo-legal destination generation.
//!
//! Destinations are computed from static occupancy only. Whether a move
//! leaves the mover's king in check is not considered, castling does not
//! look at attacked squares, and en passant is inferred from pawn placement
//! instead of the previous move.

use crate::board::Board;
use crate::types::{Piece, PieceColor, PieceKind, Square};

const ORTHOGONAL: [(i8, i8); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];
const DIAGONAL: [(i8, i8); 4] = [(1, 1), (1, -1), (-1, 1), (-1, -1)];
const KNIGHT_JUMPS: [(i8, i8); 8] = [
    (1, 2),
    (2, 1),
    (2, -1),
    (1, -2),
    (-1, -2),
    (-2, -1),
    (-2, 1),
    (-1, 2),
];
const KING_FILE: u8 = 4;

/// Every square `piece` could move to on `board`.
pub fn destinations(board: &Board, piece: &Piece) -> Vec<Square> {
    let mut out = Vec::new();
    match piece.kind {
        PieceKind::King => {
            steps(board, piece, &ORTHOGONAL, &mut out);
            steps(board, piece, &DIAGONAL, &mut out);
            castling(board, piece, &mut out);
        }
        PieceKind::Queen => {
            slides(board, piece, &ORTHOGONAL, &mut out);
            slides(board, piece, &DIAGONAL, &mut out);
        }
        PieceKind::Rook => slides(board, piece, &ORTHOGONAL, &mut out),
        PieceKind::Bishop => slides(board, piece, &DIAGONAL, &mut out),
        PieceKind::Knight => steps(board, piece, &KNIGHT_JUMPS, &mut out),
        PieceKind::Pawn => pawn(board, piece, &mut out),
    }
    out
}

/// True if `piece` can reach `target` on `board`.
pub fn can_reach(board: &Board, piece: &Piece, target: Square) -> bool {
    destinations(board, piece).contains(&target)
}

fn admissible(board: &Board, color: PieceColor, sq: Square) -> bool {
    board.is_empty_at(sq) || board.is_enemy_at(sq, color)
}

fn steps(board: &Board, piece: &Piece, offsets: &[(i8, i8)], out: &mut Vec<Square>) {
    for &(df, dr) in offsets {
        if let Some(sq) = piece.square.offset(df, dr) {
            if admissible(board, piece.color, sq) {
                out.push(sq);
            }
        }
    }
}

fn slides(board: &Board, piece: &Piece, directions: &[(i8, i8)], out: &mut Vec<Square>) {
    for &(df, dr) in directions {
        let mut current = piece.square;
        while let Some(sq) = current.offset(df, dr) {
            if board.is_empty_at(sq) {
                out.push(sq);
                current = sq;
                continue;
            }
            if board.is_enemy_at(sq, piece.color) {
                out.push(sq);
            }
            break;
        }
    }
}

fn castling(board: &Board, king: &Piece, out: &mut Vec<Square>) {
    let home = king.color.home_rank();
    if Square::new(KING_FILE, home) != Some(king.square) {
        return;
    }

    // (rook file, squares that must be empty, king destination file)
    let sides: [(u8, &[u8], u8); 2] = [(7, &[5, 6], 6), (0, &[1, 2, 3], 2)];
    for (rook_file, between, dest_file) in sides {
        let rook_ok = Square::new(rook_file, home)
            .and_then(|sq| board.piece_at(sq))
            .is_some_and(|p| p.kind == PieceKind::Rook && p.color == king.color);
        let path_clear = between
            .iter()
            .filter_map(|&f| Square::new(f, home))
            .all(|sq| board.is_empty_at(sq));
        if rook_ok && path_clear {
            if let Some(dest) = Square::new(dest_file, home) {
                out.push(dest);
            }
        }
    }
}

fn pawn(board: &Board, piece: &Piece, out: &mut Vec<Square>) {
    let dir = piece.color.forward();
    let from = piece.square;

    if let Some(one) = from.offset(0, dir) {
        if board.is_empty_at(one) {
            out.push(one);
            if from.rank() == piece.color.pawn_rank() {
                if let Some(two) = from.offset(0, 2 * dir) {
                    if board.is_empty_at(two) {
                        out.push(two);
                    }
                }
            }
        }
    }

    for df in [-1, 1] {
        let Some(diag) = from.offset(df, dir) else {
            continue;
        };
        if board.is_enemy_at(diag, piece.color) {
            out.push(diag);
            continue;
        }
        if from.rank() != piece.color.en_passant_rank() || !board.is_empty_at(diag) {
            continue;
        }
        let beside_is_enemy_pawn = from
            .offset(df, 0)
            .and_then(|sq| board.piece_at(sq))
            .is_some_and(|p| p.kind == PieceKind::Pawn && p.color != piece.color);
        if beside_is_enemy_pawn {
            out.push(diag);
        }
    }
}
