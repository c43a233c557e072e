use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
    time::{Duration, Instant},
};

use tinyvec::ArrayVec;

use crate::chess::attacks::movegen::{capture_moves, legal_moves};
use crate::chess::moves::{Move, MoveClass};
use crate::chess::position::{Color, Piece, Position};
use crate::engine::ordering::{OrderingContext, ScoredIter, score_moves};
use crate::engine::transposition::{Bound, Probe, TranspositionTable};

#[derive(Clone, Copy, Default, Debug)]
pub struct ClockTime {
    pub white_time_ms: u64,
    pub black_time_ms: u64,
    pub white_increment_ms: u64,
    pub black_increment_ms: u64,
}

#[derive(Clone)]
pub enum TimeControl {
    MoveTime(u64),
    Depth(usize),
    ClockTime(ClockTime),
    Infinite,
}

/// One principal-continuation buffer per ply; `update` prefixes the current
/// move onto the child's continuation.
#[derive(Clone)]
struct PvTable {
    pv: [ArrayVec<[Move; Searcher::MAX_PLY]>; Searcher::MAX_PLY],
}

impl PvTable {
    fn clear(&mut self, ply: usize) {
        self.pv[ply].clear();
    }

    fn update(&mut self, ply: usize, mov: Move) {
        self.pv[ply].clear();
        self.pv[ply].push(mov);

        // copy child PV (if any)
        if ply + 1 < Searcher::MAX_PLY && !self.pv[ply + 1].is_empty() {
            let (left, right) = self.pv.split_at_mut(ply + 1);
            let current = &mut left[ply];
            let child = &right[0];
            current.extend(child.iter().copied());
        }
    }

    fn get(&self, ply: usize) -> &[Move] {
        &self.pv[ply]
    }
}

#[derive(Clone, Copy)]
struct TimeManagement {
    hard_limit: Duration, // absolute maximum
    soft_limit: Duration, // target to finish by
    cached_elapsed: Duration,
    elapsed_clock: usize,
    start: Instant,
}

impl TimeManagement {
    const TIME_CHECKPOINT: usize = 1023;

    fn from_clock(color: Color, clock_time: &ClockTime) -> TimeManagement {
        let color_time_ms = match color {
            Color::White => clock_time.white_time_ms,
            Color::Black => clock_time.black_time_ms,
        };
        let color_increment_ms = match color {
            Color::White => clock_time.white_increment_ms,
            Color::Black => clock_time.black_increment_ms,
        };

        let base_time = color_time_ms / 20 + color_increment_ms / 2;

        TimeManagement {
            hard_limit: Duration::from_millis(
                (base_time as f64 * 1.2).min(color_time_ms as f64) as u64
            ),
            soft_limit: Duration::from_millis((base_time as f64 * 0.8) as u64),

            elapsed_clock: 0,
            cached_elapsed: Duration::ZERO,

            start: Instant::now(),
        }
    }

    fn from_millis(millis: u64) -> TimeManagement {
        TimeManagement {
            hard_limit: Duration::from_millis(millis),
            soft_limit: Duration::from_millis((millis as f64 * 0.8) as u64),

            elapsed_clock: 0,
            cached_elapsed: Duration::ZERO,

            start: Instant::now(),
        }
    }

    /// The clock is only consulted every `TIME_CHECKPOINT` polls; between
    /// checkpoints the cached reading answers.
    fn is_timeout(&mut self, is_depth_complete: bool) -> bool {
        self.elapsed_clock += 1;
        if self.elapsed_clock >= Self::TIME_CHECKPOINT {
            self.cached_elapsed = self.start.elapsed();
            self.elapsed_clock = 0;
        }

        self.cached_elapsed >= self.hard_limit
            || (self.cached_elapsed >= self.soft_limit && is_depth_complete)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportedScore {
    Centipawns(i16),
    /// Full moves to mate; negative when the engine is being mated.
    Mate(i16),
}

/// One completed-iteration progress snapshot for the sink.
pub struct SearchReport<'a> {
    pub depth: usize,
    pub seldepth: usize,
    pub score: ReportedScore,
    pub nodes: u64,
    pub nodes_per_second: u64,
    pub elapsed: Duration,
    pub hashfull: u16,
    pub pv: &'a [Move],
}

pub trait ProgressSink: Send {
    fn report(&self, report: &SearchReport<'_>);
}

/// Sink for callers that do not care about progress.
pub struct NullSink;
impl ProgressSink for NullSink {
    fn report(&self, _report: &SearchReport<'_>) {}
}

pub struct SearchOutcome {
    pub best_move: Move,
    pub mate_found: bool,
    /// Deepest fully completed iteration backing `best_move`.
    pub depth: usize,
    pub score: i16,
    pub pv: Vec<Move>,
}

pub struct Searcher {
    position: Position,
    history: ArrayVec<[u64; 1024]>, // zobrists of every reached position
    table: Arc<TranspositionTable>,

    pv_table: PvTable,
    prev_pv: ArrayVec<[Move; Searcher::MAX_PLY]>,
    killers: [[Option<Move>; 2]; Searcher::MAX_PLY],

    nodes: Arc<AtomicU64>,
    seldepth: usize,

    time: Option<TimeManagement>,
    stop: Arc<AtomicBool>,

    sink: Box<dyn ProgressSink>,
}

impl Searcher {
    pub const MAX_PLY: usize = 64;
    pub const CHECKMATE_SCORE: i16 = 30_000;
    pub const CHECKMATE_THRESHOLD: i16 = Searcher::CHECKMATE_SCORE - 2 * Searcher::MAX_PLY as i16;
    pub const INF: i16 = 32_000;

    pub fn new(
        position: Position,
        history: ArrayVec<[u64; 1024]>,
        table: &Arc<TranspositionTable>,
        stop: &Arc<AtomicBool>,
        sink: Box<dyn ProgressSink>,
    ) -> Searcher {
        Searcher {
            position,
            history,
            table: Arc::clone(table),

            pv_table: PvTable {
                pv: [ArrayVec::new(); Searcher::MAX_PLY],
            },
            prev_pv: ArrayVec::new(),
            killers: [[None; 2]; Searcher::MAX_PLY],

            nodes: Arc::new(AtomicU64::new(0)),
            seldepth: 0,

            time: None,
            stop: Arc::clone(stop),

            sink,
        }
    }

    /// Live node counter; a monitoring thread may read it while the search
    /// runs.
    pub fn node_counter(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.nodes)
    }

    /// The searcher's position. Outside a running `find_move` every apply
    /// has been undone, so this is the root position handed to `new`.
    pub fn position(&self) -> &Position {
        &self.position
    }

    fn is_three_fold_repetition(&self) -> bool {
        self.history
            .iter()
            .rev()
            .skip(2) // skip current position
            .take(self.position.halfmove_clock as usize)
            .step_by(2) // only positions with the same side to move
            .filter(|&&zobrist| zobrist == self.position.zobrist)
            .take(2)
            .count()
            >= 2
    }

    fn is_draw(&self) -> bool {
        self.position.is_fifty_move()
            || self.is_three_fold_repetition()
            || self.position.is_insufficient_material()
    }

    fn push_move(&mut self, mov: Move) {
        self.position.apply_move(mov);
        self.history.push(self.position.zobrist);
    }

    fn pop_move(&mut self) {
        self.position.undo_move();
        self.history.pop();
    }

    fn time_to_stop(&mut self, is_depth_complete: bool) -> bool {
        self.stop.load(Ordering::Relaxed)
            || self
                .time
                .as_mut()
                .is_some_and(|time| time.is_timeout(is_depth_complete))
    }

    fn get_draw_score(static_eval: i16) -> i16 {
        (-static_eval / 10).clamp(-100, 100)
    }

    fn reported_score(score: i16) -> ReportedScore {
        if score.abs() >= Searcher::CHECKMATE_THRESHOLD {
            // distance in plies, reported in full moves
            let mate_in = (Searcher::CHECKMATE_SCORE - score.abs() + 1) / 2;
            ReportedScore::Mate(if score > 0 { mate_in } else { -mate_in })
        } else {
            ReportedScore::Centipawns(score)
        }
    }

    fn report_iteration(&self, depth: usize, score: i16, elapsed: Duration) {
        let nodes = self.nodes.load(Ordering::Relaxed);
        let nodes_per_second = if elapsed.is_zero() {
            nodes
        } else {
            (nodes as f64 / elapsed.as_secs_f64()) as u64
        };

        self.sink.report(&SearchReport {
            depth,
            seldepth: self.seldepth,
            score: Self::reported_score(score),
            nodes,
            nodes_per_second,
            elapsed,
            hashfull: self.table.hashfull(),
            pv: self.pv_table.get(0),
        });
    }

    fn remember_killer(&mut self, ply: usize, mov: Move) {
        if mov.is_capture() || mov.promotion() != Piece::None {
            return; // killers are quiet refutations
        }

        if !self.killers[ply][0].is_some_and(|killer| killer.same_piece_move(mov)) {
            self.killers[ply][1] = self.killers[ply][0];
            self.killers[ply][0] = Some(mov.with_class(MoveClass::KILLER));
        }
    }

    /// Iterative deepening driver. Re-invokes the ply-0 search at growing
    /// depth, seeding each iteration with the previous one's principal
    /// variation, until the budget runs out or a forced mate is proven.
    /// Returns `None` only when the side to move has no legal move at all;
    /// otherwise the last fully completed iteration backs the answer, even
    /// after a mid-iteration stop.
    pub fn find_move(
        &mut self,
        control: TimeControl,
        previous_pv: &[Move],
    ) -> Option<SearchOutcome> {
        self.time = match control {
            TimeControl::ClockTime(ref clock) => Some(TimeManagement::from_clock(
                self.position.side_to_move,
                clock,
            )),
            TimeControl::MoveTime(millis) => Some(TimeManagement::from_millis(millis)),
            _ => None,
        };
        let depth_limit = if let TimeControl::Depth(depth) = control {
            depth.min(Searcher::MAX_PLY)
        } else {
            Searcher::MAX_PLY
        };

        self.prev_pv = previous_pv
            .iter()
            .copied()
            .take(Searcher::MAX_PLY)
            .collect();

        let move_list = legal_moves(&mut self.position);
        if move_list.is_empty() {
            self.stop.store(false, Ordering::Relaxed);
            return None;
        }

        let mut best_move: Move = move_list[0];
        let mut best_score: i16 = -Searcher::INF;
        let mut completed_depth: usize = 0;
        let mut current_depth: usize = 1;
        let search_start = Instant::now();

        loop {
            let (mut alpha, beta) = (-Searcher::INF, Searcher::INF);
            let mut step_best_move = best_move;
            let mut step_best_score = -Searcher::INF;

            // the root never short-circuits on a table hit; asking for an
            // unreachable depth demotes any entry to a reordering seed
            let (table_move, table_list) = match self.table.probe(
                self.position.zobrist,
                Searcher::MAX_PLY,
                alpha,
                beta,
                0,
            ) {
                Probe::Seed { best_move, moves } => (Some(best_move), moves),
                _ => (None, Vec::new()),
            };

            let mut scored_moves = {
                let context = OrderingContext {
                    pv_move: self.prev_pv.first().copied(),
                    table_move,
                    table_list: &table_list,
                    killers: &self.killers[0],
                };
                score_moves(&move_list, &context)
            };

            for (move_index, mov) in scored_moves.scored_iter().enumerate() {
                if current_depth > 1 && self.time_to_stop(false) {
                    break;
                }

                self.push_move(mov);
                let score = if move_index == 0 {
                    -self.search(-beta, -alpha, current_depth - 1, 1)
                } else {
                    // negascout: prove the move worse with a null window
                    let null_window = -self.search(-(alpha + 1), -alpha, current_depth - 1, 1);
                    if null_window > alpha {
                        -self.search(-beta, -alpha, current_depth - 1, 1)
                    } else {
                        null_window
                    }
                };
                self.pop_move();

                if score > step_best_score {
                    step_best_move = mov;
                    step_best_score = score;
                    self.pv_table.update(0, mov);
                }
                if score > alpha {
                    alpha = score;
                }
            }

            let elapsed = search_start.elapsed();

            if self.time_to_stop(true) {
                if current_depth <= 1 {
                    // never leave without at least the shallowest answer
                    best_move = step_best_move;
                    best_score = step_best_score;
                    completed_depth = current_depth;
                    self.prev_pv = self.pv_table.get(0).iter().copied().collect();
                    self.report_iteration(current_depth, step_best_score, elapsed);
                }
                break;
            }

            best_move = step_best_move;
            best_score = step_best_score;
            completed_depth = current_depth;

            self.report_iteration(current_depth, best_score, elapsed);
            self.prev_pv = self.pv_table.get(0).iter().copied().collect();

            // a forced mate cannot improve with depth
            if best_score.abs() >= Searcher::CHECKMATE_THRESHOLD {
                break;
            }
            if current_depth >= depth_limit {
                break;
            }

            current_depth += 1;
        }

        self.stop.store(false, Ordering::Relaxed);

        Some(SearchOutcome {
            best_move,
            mate_found: best_score >= Searcher::CHECKMATE_THRESHOLD,
            depth: completed_depth,
            score: best_score,
            // the last completed iteration's line, never a half-searched one
            pv: self.prev_pv.to_vec(),
        })
    }

    /// Negascout node, score from the side to move, in centipawns.
    fn search(&mut self, mut alpha: i16, beta: i16, depth: usize, ply: usize) -> i16 {
        if depth == 0 {
            return self.quiescence(alpha, beta, ply);
        }

        self.nodes.fetch_add(1, Ordering::Relaxed);
        if ply > self.seldepth {
            self.seldepth = ply;
        }

        let static_eval = self.position.evaluate_for_side();

        if self.is_draw() {
            self.pv_table.clear(ply);
            return Searcher::get_draw_score(static_eval);
        }
        if ply >= Searcher::MAX_PLY {
            return static_eval;
        }

        let original_alpha = alpha;

        // the required lookup depth is the depth still missing below here
        let (table_move, table_list) =
            match self
                .table
                .probe(self.position.zobrist, depth, alpha, beta, ply)
            {
                Probe::Exact(score) => {
                    self.pv_table.clear(ply);
                    return score;
                }
                Probe::Refutation(score) => return score,
                Probe::Seed { best_move, moves } => (Some(best_move), moves),
                Probe::Miss => (None, Vec::new()),
            };

        let in_check = self.position.in_check();
        let move_list = legal_moves(&mut self.position);

        if move_list.is_empty() {
            self.pv_table.clear(ply);
            return if in_check {
                // mating sooner scores higher for the winning side
                -(Searcher::CHECKMATE_SCORE - ply as i16)
            } else {
                Searcher::get_draw_score(static_eval) // stalemate
            };
        }

        let mut scored_moves = {
            let context = OrderingContext {
                pv_move: self.prev_pv.get(ply).copied(),
                table_move,
                table_list: &table_list,
                killers: &self.killers[ply],
            };
            score_moves(&move_list, &context)
        };

        let mut best_score = -Searcher::INF;
        let mut best_move = move_list[0];
        let mut cut_off = false;

        for (move_index, mov) in scored_moves.scored_iter().enumerate() {
            self.push_move(mov);
            let score = if move_index == 0 {
                -self.search(-beta, -alpha, depth - 1, ply + 1)
            } else {
                let null_window = -self.search(-(alpha + 1), -alpha, depth - 1, ply + 1);
                if null_window > alpha && null_window < beta {
                    -self.search(-beta, -alpha, depth - 1, ply + 1)
                } else {
                    null_window
                }
            };
            self.pop_move();

            if score > best_score {
                best_score = score;
                best_move = mov;
                self.pv_table.update(ply, mov);
            }
            if score > alpha {
                alpha = score;
            }
            if alpha >= beta {
                self.remember_killer(ply, mov);
                cut_off = true;
                break;
            }
            if self.time_to_stop(false) {
                // unwinding after a stop: every apply above is already
                // paired with its undo; the partial score is not cached
                return alpha;
            }
        }

        debug_assert!(!cut_off || best_score >= beta);
        let bound = Bound::from_score(best_score, original_alpha, beta);
        self.table.store(
            self.position.zobrist,
            depth,
            best_score,
            bound,
            best_move.with_class(MoveClass::BEST),
            &move_list,
            ply,
        );

        best_score
    }

    /// Extended ply past the nominal depth: captures and promotions only,
    /// or full evasion sets while in check, under a hard ply ceiling. The
    /// stand-pat score lets the side to move decline a losing flurry.
    fn quiescence(&mut self, mut alpha: i16, beta: i16, ply: usize) -> i16 {
        self.nodes.fetch_add(1, Ordering::Relaxed);
        if ply > self.seldepth {
            self.seldepth = ply;
        }

        let static_eval = self.position.evaluate_for_side();

        if self.is_draw() {
            return Searcher::get_draw_score(static_eval);
        }
        if self.time_to_stop(false) || ply >= Searcher::MAX_PLY {
            return static_eval;
        }

        let in_check = self.position.in_check();

        // standing pat means declining to capture; in check there is no
        // such option, so the stand-pat score and pruning only apply
        // outside check
        let mut best_score = -Searcher::INF;
        if !in_check {
            best_score = static_eval;
            if best_score >= beta {
                return best_score;
            }
            if best_score > alpha {
                alpha = best_score;
            }

            // no single capture can close a gap this large
            const DELTA_MARGIN: i16 = 75;
            if best_score + Position::PIECE_VALUES[Piece::Queen as usize] + DELTA_MARGIN < alpha {
                return alpha;
            }
        }

        // in check every legal move is an evasion and must be considered
        let move_list = if in_check {
            legal_moves(&mut self.position)
        } else {
            capture_moves(&mut self.position)
        };

        if in_check && move_list.is_empty() {
            return -(Searcher::CHECKMATE_SCORE - ply as i16);
        }

        let mut scored_moves = {
            let context = OrderingContext {
                pv_move: None,
                table_move: None,
                table_list: &[],
                killers: &self.killers[ply.min(Searcher::MAX_PLY - 1)],
            };
            score_moves(&move_list, &context)
        };

        for mov in scored_moves.scored_iter() {
            self.push_move(mov);
            let score = -self.quiescence(-beta, -alpha, ply + 1);
            self.pop_move();

            if score > best_score {
                best_score = score;
            }
            if score > alpha {
                alpha = score;
            }
            if alpha >= beta || self.time_to_stop(false) {
                return alpha;
            }
        }

        best_score
    }
}
