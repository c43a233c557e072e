#![allow(dead_code)]

use basalt::chess::*;

pub const KIWIPETE_FEN: &str =
    "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1";
pub const ROOK_ENDGAME_FEN: &str = "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1";
pub const MIRROR_FEN: &str = "r2q1rk1/pP1p2pp/Q4n2/bbp1p3/Np6/1B3NBn/pPPP1PPP/R3K2R b KQ - 0 1";
pub const PROMOTION_FEN: &str = "rnbq1k1r/pp1Pbppp/2p5/8/2B5/8/PPP1NnPP/RNBQK2R w KQ - 1 8";
pub const MIDGAME_FEN: &str =
    "r4rk1/1pp1qppp/p1np1n2/2b1p1B1/2B1P1b1/P1NP1N2/1PP1QPPP/R4RK1 w - - 0 10";

pub struct PerftCase {
    pub name: &'static str,
    pub fen: &'static str,
    pub expected: &'static [u64],
}

pub const PERFT_CASES: &[PerftCase] = &[
    PerftCase {
        name: "startpos",
        fen: STARTPOS_FEN,
        expected: &[20, 400, 8_902, 197_281],
    },
    PerftCase {
        name: "kiwipete",
        fen: KIWIPETE_FEN,
        expected: &[48, 2_039, 97_862],
    },
    PerftCase {
        name: "rook_endgame",
        fen: ROOK_ENDGAME_FEN,
        expected: &[14, 191, 2_812, 43_238],
    },
    PerftCase {
        name: "mirror",
        fen: MIRROR_FEN,
        expected: &[6, 264, 9_467],
    },
    PerftCase {
        name: "promotion",
        fen: PROMOTION_FEN,
        expected: &[44, 1_486, 62_379],
    },
    PerftCase {
        name: "midgame",
        fen: MIDGAME_FEN,
        expected: &[46, 2_079, 89_890],
    },
];

/// Looks a move up by its coordinate notation among the legal moves.
pub fn find_move(position: &mut Position, uci: &str) -> Move {
    legal_moves(position)
        .iter()
        .copied()
        .find(|mov| mov.to_uci() == uci)
        .unwrap_or_else(|| panic!("move {uci} not legal here"))
}

/// Applies a line of coordinate-notation moves.
pub fn play_line(position: &mut Position, line: &[&str]) {
    for uci in line {
        let mov = find_move(position, uci);
        position.apply_move(mov);
    }
}
