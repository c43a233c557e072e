use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::chess::moves::Move;
use crate::engine::search::Searcher;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound {
    Exact,
    Lower,
    Upper,
}

impl Bound {
    pub fn from_score(score: i16, alpha: i16, beta: i16) -> Bound {
        if score >= beta {
            Bound::Lower // fail-high: true score >= this
        } else if score <= alpha {
            Bound::Upper // fail-low: true score <= this
        } else {
            Bound::Exact // score inside the window
        }
    }
}

/// One cached search result. `score` is stored with mate distances made
/// relative to the entry's own node, so a hit at a different ply stays
/// meaningful. The move list is kept for reordering a later, deeper visit.
#[derive(Debug, Clone)]
pub struct Entry {
    pub key: u64,
    pub depth: u8,
    pub score: i16,
    pub bound: Bound,
    pub best_move: Move,
    pub moves: Vec<Move>,
}

/// What a lookup yielded for the asking node.
#[derive(Debug)]
pub enum Probe {
    /// Nothing cached for this hash.
    Miss,
    /// Deep enough and exact: usable as the node's score directly.
    Exact(i16),
    /// Deep enough and its bound already proves a cutoff for the window.
    Refutation(i16),
    /// Present but too shallow to trust (or a bound inside the window);
    /// the remembered best move and move list still reorder the search.
    Seed { best_move: Move, moves: Vec<Move> },
}

/// Fixed-capacity hash-keyed cache. Each slot is individually locked, so a
/// table shared between searches never yields a torn entry; a racing write
/// may be lost, which is fine for a best-effort cache.
pub struct TranspositionTable {
    slots: Box<[Mutex<Option<Entry>>]>,
    used: AtomicUsize,
    mask: usize,
}

impl TranspositionTable {
    pub fn new(megabytes: usize) -> TranspositionTable {
        const MIB: usize = 1 << 20;
        // slot plus a typical cached move list's heap share
        let entry_size = std::mem::size_of::<Mutex<Option<Entry>>>() + 160;
        let requested_bytes = megabytes.max(1) * MIB;

        let entries = (requested_bytes / entry_size).next_power_of_two();

        let slots = (0..entries)
            .map(|_| Mutex::new(None))
            .collect::<Vec<_>>()
            .into_boxed_slice();

        TranspositionTable {
            slots,
            used: AtomicUsize::new(0),
            mask: entries - 1,
        }
    }

    #[inline(always)]
    fn index(&self, key: u64) -> usize {
        (key as usize) & self.mask
    }

    /// Mate scores enter the table relative to the storing node.
    fn encode_mate(score: i16, ply: usize) -> i16 {
        if score > Searcher::CHECKMATE_THRESHOLD {
            score + ply as i16
        } else if score < -Searcher::CHECKMATE_THRESHOLD {
            score - ply as i16
        } else {
            score
        }
    }

    /// ...and leave it relative to the probing node.
    fn decode_mate(score: i16, ply: usize) -> i16 {
        if score > Searcher::CHECKMATE_THRESHOLD {
            score - ply as i16
        } else if score < -Searcher::CHECKMATE_THRESHOLD {
            score + ply as i16
        } else {
            score
        }
    }

    /// Looks up `key` for a node that still needs `required_depth` plies of
    /// search below it, against the window `alpha..beta`.
    pub fn probe(
        &self,
        key: u64,
        required_depth: usize,
        alpha: i16,
        beta: i16,
        ply: usize,
    ) -> Probe {
        let slot = self.slots[self.index(key)].lock().unwrap();

        let Some(entry) = slot.as_ref() else {
            return Probe::Miss;
        };
        if entry.key != key {
            return Probe::Miss;
        }

        if (entry.depth as usize) < required_depth {
            return Probe::Seed {
                best_move: entry.best_move,
                moves: entry.moves.clone(),
            };
        }

        let score = Self::decode_mate(entry.score, ply);
        match entry.bound {
            Bound::Exact => Probe::Exact(score),
            Bound::Lower if score >= beta => Probe::Refutation(score),
            Bound::Upper if score <= alpha => Probe::Refutation(score),
            _ => Probe::Seed {
                best_move: entry.best_move,
                moves: entry.moves.clone(),
            },
        }
    }

    /// New data only displaces old when it searched at least as deep, turned
    /// a bound into an exact score, or tightened the same kind of bound.
    /// A colliding key is evicted on the same depth-preferred rule.
    pub fn store(
        &self,
        key: u64,
        depth: usize,
        score: i16,
        bound: Bound,
        best_move: Move,
        moves: &[Move],
        ply: usize,
    ) {
        let encoded = Self::encode_mate(score, ply);
        let mut slot = self.slots[self.index(key)].lock().unwrap();

        let replace = match slot.as_ref() {
            None => {
                self.used.fetch_add(1, Ordering::Relaxed);
                true
            }
            Some(old) if old.key == key => {
                depth as u8 >= old.depth
                    || (bound == Bound::Exact && old.bound != Bound::Exact)
                    || Self::tightens(old, bound, encoded)
            }
            Some(old) => depth as u8 >= old.depth,
        };

        if replace {
            *slot = Some(Entry {
                key,
                depth: depth as u8,
                score: encoded,
                bound,
                best_move,
                moves: moves.to_vec(),
            });
        }
    }

    fn tightens(old: &Entry, bound: Bound, score: i16) -> bool {
        match (old.bound, bound) {
            (Bound::Lower, Bound::Lower) => score > old.score,
            (Bound::Upper, Bound::Upper) => score < old.score,
            _ => false,
        }
    }

    /// Fill fraction in permille, for progress reporting.
    pub fn hashfull(&self) -> u16 {
        let total = self.slots.len() as u64;
        let used = (self.used.load(Ordering::Relaxed) as u64).min(total);
        ((used * 1000u64) / total) as u16
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chess::position::Piece;

    fn test_move(origin: u8, target: u8) -> Move {
        Move::new(origin, Piece::Knight, target, Piece::None, Piece::None, 0)
    }

    #[test]
    fn store_then_probe_round_trip() {
        let table = TranspositionTable::new(1);
        let best = test_move(1, 18);

        table.store(42, 5, 120, Bound::Exact, best, &[best], 0);

        match table.probe(42, 5, -1000, 1000, 0) {
            Probe::Exact(score) => assert_eq!(score, 120),
            other => panic!("expected exact hit, got {other:?}"),
        }
    }

    #[test]
    fn shallow_entries_only_seed() {
        let table = TranspositionTable::new(1);
        let best = test_move(1, 18);

        table.store(42, 3, 120, Bound::Exact, best, &[best], 0);

        match table.probe(42, 5, -1000, 1000, 0) {
            Probe::Seed { best_move, moves } => {
                assert!(best_move.same_piece_move(best));
                assert_eq!(moves.len(), 1);
            }
            other => panic!("expected seed, got {other:?}"),
        }
    }

    #[test]
    fn bounds_prove_cutoffs_only_outside_the_window() {
        let table = TranspositionTable::new(1);
        let best = test_move(1, 18);

        table.store(42, 5, 300, Bound::Lower, best, &[], 0);

        // true score >= 300 refutes a window below it
        assert!(matches!(
            table.probe(42, 5, -100, 200, 0),
            Probe::Refutation(300)
        ));
        // but only seeds a window that reaches past it
        assert!(matches!(
            table.probe(42, 5, -100, 400, 0),
            Probe::Seed { .. }
        ));
    }

    #[test]
    fn shallower_data_never_displaces_deeper() {
        let table = TranspositionTable::new(1);
        let deep = test_move(1, 18);
        let shallow = test_move(6, 21);

        table.store(42, 6, 50, Bound::Exact, deep, &[], 0);
        table.store(42, 2, 900, Bound::Exact, shallow, &[], 0);

        match table.probe(42, 6, -1000, 1000, 0) {
            Probe::Exact(score) => assert_eq!(score, 50),
            other => panic!("deep entry should survive, got {other:?}"),
        }
    }

    #[test]
    fn exact_replaces_bound_at_equal_information() {
        let table = TranspositionTable::new(1);
        let mv = test_move(1, 18);

        table.store(42, 4, 10, Bound::Upper, mv, &[], 0);
        // same depth, exact kind: takes over
        table.store(42, 4, 25, Bound::Exact, mv, &[], 0);

        match table.probe(42, 4, -1000, 1000, 0) {
            Probe::Exact(score) => assert_eq!(score, 25),
            other => panic!("expected exact hit, got {other:?}"),
        }
    }

    #[test]
    fn mate_scores_shift_with_ply() {
        let table = TranspositionTable::new(1);
        let mv = test_move(1, 18);
        let mate_in_3 = Searcher::CHECKMATE_SCORE - 3;

        // stored from a node at ply 2
        table.store(42, 5, mate_in_3, Bound::Exact, mv, &[], 2);

        // probed from a node at ply 4: two plies closer to the mate
        match table.probe(42, 5, -Searcher::INF, Searcher::INF, 4) {
            Probe::Exact(score) => assert_eq!(score, Searcher::CHECKMATE_SCORE - 5),
            other => panic!("expected exact hit, got {other:?}"),
        }
    }
}
