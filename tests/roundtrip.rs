mod utils;

use basalt::chess::*;
use basalt::engine::evaluation::W;

#[derive(PartialEq, Debug)]
struct Snapshot {
    bitboards: [[Bitboard; 6]; 2],
    occupancies: [Bitboard; 2],
    piece_lists: [[PieceList; 6]; 2],
    pieces: [(Piece, Color); BOARD_SIZE],
    zobrist: u64,
    en_passant_square: Option<Square>,
    castling_rights: u8,
    halfmove_clock: u8,
    fullmove_number: u16,
    side_to_move: Color,
    material: [i16; 2],
    bonus: [W; 2],
    phase: usize,
}

fn snapshot(position: &Position) -> Snapshot {
    Snapshot {
        bitboards: position.bitboards,
        occupancies: position.occupancies,
        piece_lists: position.piece_lists,
        pieces: position.pieces,
        zobrist: position.zobrist,
        en_passant_square: position.en_passant_square,
        castling_rights: position.castling_rights,
        halfmove_clock: position.halfmove_clock,
        fullmove_number: position.fullmove_number,
        side_to_move: position.side_to_move,
        material: position.material,
        bonus: position.bonus,
        phase: position.phase,
    }
}

#[test]
fn every_legal_move_round_trips_exactly() {
    for fen in [
        STARTPOS_FEN,
        utils::KIWIPETE_FEN,
        utils::ROOK_ENDGAME_FEN,
        utils::PROMOTION_FEN,
        utils::MIRROR_FEN,
    ] {
        let mut position = Position::new(fen).unwrap();
        let before = snapshot(&position);

        for mov in legal_moves(&mut position) {
            position.apply_move(mov);
            assert!(position.is_consistent(), "inconsistent after {}", mov.to_uci());
            position.undo_move();

            assert_eq!(
                snapshot(&position),
                before,
                "undo of {} did not restore {fen}",
                mov.to_uci()
            );
        }
    }
}

#[test]
fn a_long_line_unwinds_to_the_start() {
    let mut position = Position::new(STARTPOS_FEN).unwrap();
    let before = snapshot(&position);

    let mut applied = 0usize;
    for ply in 0..60 {
        let move_list = legal_moves(&mut position);
        if move_list.is_empty() {
            break;
        }
        // deterministic but varied pick
        let mov = move_list[(ply * 7 + 3) % move_list.len()];
        position.apply_move(mov);
        applied += 1;

        assert!(position.is_consistent());
    }

    assert_eq!(position.undo_depth(), applied);
    for _ in 0..applied {
        position.undo_move();
    }

    assert_eq!(snapshot(&position), before);
    assert_eq!(position.undo_depth(), 0);
}

#[test]
fn transposing_move_orders_hash_identically() {
    let mut first = Position::new(STARTPOS_FEN).unwrap();
    utils::play_line(&mut first, &["g1f3", "d7d5", "g2g3"]);

    let mut second = Position::new(STARTPOS_FEN).unwrap();
    utils::play_line(&mut second, &["g2g3", "d7d5", "g1f3"]);

    assert_eq!(first.zobrist, second.zobrist);
    assert_eq!(first.zobrist, first.calculate_zobrist());
}

#[test]
fn en_passant_target_lives_exactly_one_ply() {
    let mut position = Position::new(STARTPOS_FEN).unwrap();

    utils::play_line(&mut position, &["e2e4"]);
    assert_eq!(position.en_passant_square, Some(20)); // e3

    utils::play_line(&mut position, &["g8f6"]);
    assert_eq!(position.en_passant_square, None);

    // and the expired target no longer allows a capture later
    utils::play_line(&mut position, &["e4e5", "d7d5"]);
    assert_eq!(position.en_passant_square, Some(43)); // d6

    let capture = utils::find_move(&mut position, "e5d6");
    assert!(capture.is_en_passant());

    // the en-passant capture removes the pawn behind the target square
    assert_eq!(position.apply_move(capture), Some(35)); // d5
    assert!(position.is_consistent());
}

#[test]
fn en_passant_capture_round_trips() {
    let mut position = Position::new(STARTPOS_FEN).unwrap();
    utils::play_line(&mut position, &["e2e4", "a7a6", "e4e5", "d7d5"]);

    let before = snapshot(&position);
    let capture = utils::find_move(&mut position, "e5d6");

    position.apply_move(capture);
    position.undo_move();

    assert_eq!(snapshot(&position), before);
}

#[test]
fn castling_is_generated_only_with_rights_and_clear_path() {
    // clear path: the king-side castle exists
    let mut clear = Position::new("4k3/8/8/8/8/8/8/4K2R w K - 0 1").unwrap();
    assert!(legal_moves(&mut clear).iter().any(|m| m.to_uci() == "e1g1"));

    // no rights: same board, no castle
    let mut no_rights = Position::new("4k3/8/8/8/8/8/8/4K2R w - - 0 1").unwrap();
    assert!(!legal_moves(&mut no_rights).iter().any(|m| m.to_uci() == "e1g1"));
}

#[test]
fn castling_through_or_out_of_attack_is_illegal() {
    // rook on f3 covers the f1 transit square
    let mut through = Position::new("4k3/8/8/8/8/5r2/8/4K2R w K - 0 1").unwrap();
    assert!(!legal_moves(&mut through).iter().any(|m| m.to_uci() == "e1g1"));

    // rook on e3 gives check; castling out of check is illegal
    let mut in_check = Position::new("4k3/8/8/8/8/4r3/8/4K2R w K - 0 1").unwrap();
    assert!(in_check.in_check());
    assert!(!legal_moves(&mut in_check).iter().any(|m| m.to_uci() == "e1g1"));
}

#[test]
fn moving_king_or_rook_forfeits_the_rights() {
    let mut position = Position::new("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1").unwrap();

    // rook h1 leaves: only the white king side right dies
    let rook_move = utils::find_move(&mut position, "h1g1");
    position.apply_move(rook_move);
    assert_eq!(position.castling_rights & Castling::WK, 0);
    assert_ne!(position.castling_rights & Castling::WQ, 0);
    position.undo_move();
    assert_ne!(position.castling_rights & Castling::WK, 0);

    // the king leaves: both white rights die
    let king_move = utils::find_move(&mut position, "e1e2");
    position.apply_move(king_move);
    assert_eq!(
        position.castling_rights & (Castling::WK | Castling::WQ),
        0
    );
    position.undo_move();
}

#[test]
fn castling_relocates_the_rook_and_round_trips() {
    let mut position = Position::new("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1").unwrap();
    let before = snapshot(&position);

    let castle = utils::find_move(&mut position, "e1c1");
    assert!(castle.is_castle());

    position.apply_move(castle);
    assert_eq!(position.pieces[2].0, Piece::King); // c1
    assert_eq!(position.pieces[3].0, Piece::Rook); // d1
    assert_eq!(position.pieces[0].0, Piece::None); // a1 vacated
    assert!(position.is_consistent());

    position.undo_move();
    assert_eq!(snapshot(&position), before);
}

#[test]
fn promotions_swap_the_accumulator_exactly() {
    let mut position = Position::new(utils::PROMOTION_FEN).unwrap();
    let before = snapshot(&position);

    for uci in ["d7c8q", "d7c8r", "d7c8n"] {
        let promotion = utils::find_move(&mut position, uci);
        position.apply_move(promotion);
        assert!(position.is_consistent(), "inconsistent after {uci}");
        position.undo_move();
        assert_eq!(snapshot(&position), before, "undo of {uci}");
    }
}

#[test]
fn fifty_move_and_material_draws_are_recognised() {
    let fifty = Position::new("4k3/8/8/8/8/8/8/4K2R w - - 100 80").unwrap();
    assert!(fifty.is_fifty_move());

    let bare_kings = Position::new("4k3/8/8/8/8/8/8/4K3 w - - 0 1").unwrap();
    assert!(bare_kings.is_insufficient_material());

    let lone_knight = Position::new("4k3/8/8/8/8/8/8/4KN2 w - - 0 1").unwrap();
    assert!(lone_knight.is_insufficient_material());

    let rook_left = Position::new("4k3/8/8/8/8/8/8/4K2R w - - 0 1").unwrap();
    assert!(!rook_left.is_insufficient_material());
}
