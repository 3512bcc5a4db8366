//! Sparse board representation: side to move plus the occupied squares.

use std::collections::BTreeMap;

use crate::types::{Piece, PieceColor, PieceKind, Square};

const BACK_RANK: [PieceKind; 8] = [
    PieceKind::Rook,
    PieceKind::Knight,
    PieceKind::Bishop,
    PieceKind::Queen,
    PieceKind::King,
    PieceKind::Bishop,
    PieceKind::Knight,
    PieceKind::Rook,
];

/// A position. Moves never mutate a board in place; applying one yields a
/// new `Board` that owns its own copy of the piece map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    turn: PieceColor,
    pieces: BTreeMap<Square, Piece>,
}

impl Board {
    /// A board with no pieces.
    pub fn empty(turn: PieceColor) -> Self {
        Self {
            turn,
            pieces: BTreeMap::new(),
        }
    }

    /// The standard starting arrangement, White to move.
    pub fn standard() -> Self {
        let mut board = Self::empty(PieceColor::White);
        for color in [PieceColor::White, PieceColor::Black] {
            for (file, kind) in BACK_RANK.iter().enumerate() {
                if let Some(sq) = Square::new(file as u8, color.home_rank()) {
                    board.place(*kind, color, sq);
                }
                if let Some(sq) = Square::new(file as u8, color.pawn_rank()) {
                    board.place(PieceKind::Pawn, color, sq);
                }
            }
        }
        board
    }

    pub fn turn(&self) -> PieceColor {
        self.turn
    }

    pub fn set_turn(&mut self, turn: PieceColor) {
        self.turn = turn;
    }

    pub fn piece_at(&self, sq: Square) -> Option<&Piece> {
        self.pieces.get(&sq)
    }

    pub fn is_empty_at(&self, sq: Square) -> bool {
        !self.pieces.contains_key(&sq)
    }

    /// True if `sq` holds a piece of the color opposing `color`.
    pub fn is_enemy_at(&self, sq: Square, color: PieceColor) -> bool {
        self.pieces.get(&sq).is_some_and(|p| p.color != color)
    }

    /// All pieces in FEN square order.
    pub fn pieces(&self) -> impl Iterator<Item = &Piece> {
        self.pieces.values()
    }

    /// Pieces of one color and kind, in FEN square order.
    pub fn pieces_of(&self, color: PieceColor, kind: PieceKind) -> impl Iterator<Item = &Piece> {
        self.pieces
            .values()
            .filter(move |p| p.color == color && p.kind == kind)
    }

    pub fn len(&self) -> usize {
        self.pieces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pieces.is_empty()
    }

    /// Put a piece on `sq`, replacing any occupant.
    pub fn place(&mut self, kind: PieceKind, color: PieceColor, sq: Square) {
        self.pieces.insert(sq, Piece::new(kind, color, sq));
    }

    pub fn remove(&mut self, sq: Square) -> Option<Piece> {
        self.pieces.remove(&sq)
    }

    /// Move whatever stands on `from` to `to`, keeping the piece's square
    /// field in sync with its key. Returns the piece that was moved.
    pub(crate) fn relocate(&mut self, from: Square, to: Square) -> Option<Piece> {
        let mut piece = self.pieces.remove(&from)?;
        piece.square = to;
        self.pieces.insert(to, piece);
        Some(piece)
    }

    pub(crate) fn set_kind(&mut self, sq: Square, kind: PieceKind) {
        if let Some(piece) = self.pieces.get_mut(&sq) {
            piece.kind = kind;
        }
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::standard()
    }
}
