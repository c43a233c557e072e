use crate::chess::bits::*;
use crate::chess::moves::Move;
use crate::chess::position::{Castling, Color, Piece, Position};
use crate::chess::zobrist::*;

/// Everything needed to reverse one applied move exactly. The piece-list
/// slots are recorded because removal swap-removes; restoring into the same
/// slot keeps the lists bit-for-bit identical across an apply/undo pair.
#[derive(Clone, Copy, Debug)]
pub struct Undo {
    mov: Move,
    captured: Piece,
    capture_square: Option<Square>,
    captured_index: u8,
    promotion_pawn_index: u8,
    en_passant_square: Option<Square>,
    halfmove_clock: u8,
    castling_rights: u8, // 4 bits for KQkq
    zobrist: u64,
}

impl Position {
    /// The square one step behind `target` from the mover's point of view:
    /// the en-passant victim of a capture, or the en-passant target left by
    /// a double push.
    #[inline(always)]
    fn square_behind(target: Square, color: Color) -> Square {
        match color {
            Color::White => target - BOARD_WIDTH as Square,
            Color::Black => target + BOARD_WIDTH as Square,
        }
    }

    /// King target square -> the rook's route for that castle.
    #[inline(always)]
    fn castle_rook_route(king_target: Square) -> (Square, Square) {
        match king_target {
            6 => (7, 5),    // white king side,  h1 -> f1
            2 => (0, 3),    // white queen side, a1 -> d1
            62 => (63, 61), // black king side,  h8 -> f8
            58 => (56, 59), // black queen side, a8 -> d8
            _ => unreachable!("not a castling target square"),
        }
    }

    #[inline(always)]
    fn clear_rights_on_rook_square(&mut self, square: Square, color: Color) {
        self.castling_rights &= !(match (square, color) {
            (0, Color::White) => Castling::WQ,  // a1
            (7, Color::White) => Castling::WK,  // h1
            (56, Color::Black) => Castling::BQ, // a8
            (63, Color::Black) => Castling::BK, // h8
            _ => 0,
        });
    }

    /// Applies a move, mutating every bitboard, piece list, the castling
    /// rights, en-passant target, clocks, evaluation accumulator and hash,
    /// and pushes the matching undo record. Returns the square a capture
    /// removed a piece from (for en passant this differs from the target).
    ///
    /// # Preconditions
    /// - `mov` must be pseudo-legal in the current position
    pub fn apply_move(&mut self, mov: Move) -> Option<Square> {
        let origin: Square = mov.origin();
        let target: Square = mov.target();
        let piece: Piece = mov.piece();
        let color: Color = self.side_to_move;
        let enemy: Color = color.toggle();

        debug_assert!(self.pieces[origin as usize] == (piece, color));

        let old_zobrist = self.zobrist;
        let old_en_passant = self.en_passant_square;
        let old_clock = self.halfmove_clock;
        let old_rights = self.castling_rights;

        // Remove the captured piece first; its square differs from the
        // target square for en passant.
        let (capture_square, captured, captured_index) = if mov.is_en_passant() {
            let victim_square = Self::square_behind(target, color);
            let (victim, victim_color, index) = self.take_piece(victim_square);
            debug_assert!(victim == Piece::Pawn && victim_color == enemy);
            (Some(victim_square), victim, index)
        } else if mov.is_capture() {
            let (victim, victim_color, index) = self.take_piece(target);
            debug_assert!(victim_color == enemy && victim == mov.captured());
            (Some(target), victim, index)
        } else {
            (None, Piece::None, 0)
        };

        // Land the mover; a promotion retires the pawn and creates the
        // promoted piece, adjusting material, phase and positional deltas.
        let promotion_pawn_index = if mov.promotion() != Piece::None {
            let (pawn, _, index) = self.take_piece(origin);
            debug_assert!(pawn == Piece::Pawn);
            self.put_piece(target, mov.promotion(), color);
            index
        } else {
            self.move_piece(origin, target);
            0
        };

        if mov.is_castle() {
            let (rook_from, rook_to) = Self::castle_rook_route(target);
            self.move_piece(rook_from, rook_to);
        }

        // A double push exposes the passed-over square for exactly one ply.
        self.en_passant_square = if piece == Piece::Pawn
            && origin.abs_diff(target) == (2 * BOARD_WIDTH) as Square
        {
            Some(Self::square_behind(target, color))
        } else {
            None
        };

        if piece == Piece::Pawn || captured != Piece::None {
            self.halfmove_clock = 0;
        } else {
            self.halfmove_clock = old_clock + 1;
        }
        if color == Color::Black {
            self.fullmove_number += 1;
        }

        if piece == Piece::King {
            self.castling_rights &= !(match color {
                Color::White => Castling::WK | Castling::WQ,
                Color::Black => Castling::BK | Castling::BQ,
            });
        } else if piece == Piece::Rook {
            self.clear_rights_on_rook_square(origin, color);
        }
        if captured == Piece::Rook {
            self.clear_rights_on_rook_square(target, enemy);
        }

        self.side_to_move = enemy;

        // Piece placement is already hashed by put/take/move; fold in the
        // side, en-passant and castling deltas.
        self.zobrist ^= *SIDE_KEY;
        if old_en_passant != self.en_passant_square {
            if let Some(en_passant) = old_en_passant {
                self.zobrist ^= EN_PASSANT_KEYS[file_of(en_passant) as usize];
            }
            if let Some(en_passant) = self.en_passant_square {
                self.zobrist ^= EN_PASSANT_KEYS[file_of(en_passant) as usize];
            }
        }
        if old_rights != self.castling_rights {
            self.zobrist ^= CASTLING_KEYS[old_rights as usize];
            self.zobrist ^= CASTLING_KEYS[self.castling_rights as usize];
        }

        self.undo_stack.push(Undo {
            mov,
            captured,
            capture_square,
            captured_index,
            promotion_pawn_index,
            en_passant_square: old_en_passant,
            halfmove_clock: old_clock,
            castling_rights: old_rights,
            zobrist: old_zobrist,
        });

        debug_assert!(self.is_consistent());
        debug_assert_eq!(self.zobrist, self.calculate_zobrist());

        capture_square
    }

    /// Reverses the most recent `apply_move` from its undo record, never by
    /// recomputation. Returns the square the reversed capture restored.
    pub fn undo_move(&mut self) -> Option<Square> {
        let Some(undo) = self.undo_stack.pop() else {
            debug_assert!(false, "undo_move without a matching apply_move");
            return None;
        };

        let mov = undo.mov;
        let origin: Square = mov.origin();
        let target: Square = mov.target();

        self.side_to_move = self.side_to_move.toggle();
        let color = self.side_to_move;

        self.en_passant_square = undo.en_passant_square;
        self.halfmove_clock = undo.halfmove_clock;
        self.castling_rights = undo.castling_rights;
        if color == Color::Black {
            self.fullmove_number -= 1;
        }

        if mov.is_castle() {
            let (rook_from, rook_to) = Self::castle_rook_route(target);
            self.move_piece(rook_to, rook_from);
        }

        if mov.promotion() != Piece::None {
            // The promoted piece sits in its list's final slot, so this
            // take is the exact inverse of the put that created it.
            let (promoted, _, _) = self.take_piece(target);
            debug_assert!(promoted == mov.promotion());
            self.restore_piece(origin, Piece::Pawn, color, undo.promotion_pawn_index);
        } else {
            self.move_piece(target, origin);
        }

        if let Some(capture_square) = undo.capture_square {
            self.restore_piece(
                capture_square,
                undo.captured,
                color.toggle(),
                undo.captured_index,
            );
        }

        self.zobrist = undo.zobrist;

        debug_assert!(self.is_consistent());
        debug_assert_eq!(self.zobrist, self.calculate_zobrist());

        undo.capture_square
    }
}
