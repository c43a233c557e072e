use crate::chess::attacks::movegen::legal_moves;
use crate::chess::position::{Position, STARTPOS_FEN};
use crate::engine::search::{
    ClockTime, ProgressSink, ReportedScore, SearchReport, Searcher, TimeControl,
};
use crate::engine::transposition::TranspositionTable;
use std::str::SplitWhitespace;
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::thread::JoinHandle;
use tinyvec::ArrayVec;

#[macro_export]
macro_rules! send {
    ($($arg:tt)*) => {{
        use std::io::{self, Write};
        println!($($arg)*);
        io::stdout().flush().unwrap();
    }};
}

/// Prints progress reports as UCI `info` lines.
struct UciSink;

impl ProgressSink for UciSink {
    fn report(&self, report: &SearchReport<'_>) {
        let score_str = match report.score {
            ReportedScore::Centipawns(centipawns) => format!("cp {centipawns}"),
            ReportedScore::Mate(moves) => format!("mate {moves}"),
        };
        let elapsed_ms = report.elapsed.as_millis().max(1);

        send!(
            "info depth {} seldepth {} score {} nodes {} nps {} time {} hashfull {} pv {}",
            report.depth,
            report.seldepth,
            score_str,
            report.nodes,
            report.nodes_per_second,
            elapsed_ms,
            report.hashfull,
            report
                .pv
                .iter()
                .take(report.depth)
                .map(|mov| mov.to_uci())
                .reduce(|a, b| format!("{a} {b}"))
                .unwrap_or_default()
        );
    }
}

fn perft(position: &mut Position, depth: usize) -> u64 {
    if depth == 0 {
        return 1u64;
    }

    let mut nodes = 0u64;

    for mov in legal_moves(position) {
        position.apply_move(mov);
        nodes += perft(position, depth - 1);
        position.undo_move();
    }

    nodes
}

fn divide(position: &mut Position, depth: usize) -> u64 {
    if depth == 0 {
        return 1u64;
    }

    let mut nodes = 0u64;

    for mov in legal_moves(position) {
        position.apply_move(mov);
        let subtree_nodes = perft(position, depth - 1);
        position.undo_move();

        nodes += subtree_nodes;
        send!("{}: {}", mov.to_uci(), subtree_nodes);
    }

    nodes
}

pub struct Uci {
    // canonical position & history used when parsing `position`
    position: Position,
    history: ArrayVec<[u64; 1024]>,

    table: Arc<TranspositionTable>,
    stop: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl Uci {
    const DEFAULT_HASH_MB: usize = 16;

    pub fn new() -> Uci {
        let position = Position::new(STARTPOS_FEN).unwrap();
        let mut history = ArrayVec::new();
        history.push(position.zobrist);

        Uci {
            position,
            history,

            table: Arc::new(TranspositionTable::new(Self::DEFAULT_HASH_MB)),
            stop: Arc::new(AtomicBool::new(false)),
            worker: None,
        }
    }

    fn stop_and_join(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
        self.stop.store(false, Ordering::Relaxed);
    }

    fn handle_position(&mut self, tokens: &mut SplitWhitespace) -> Result<(), &'static str> {
        let mut has_moves = false;

        let fen: String = match tokens.next() {
            Some("startpos") => {
                has_moves = tokens.next() == Some("moves");
                STARTPOS_FEN.to_string()
            }
            Some("fen") => {
                let mut parts: Vec<&str> = Vec::new();
                for token in tokens.by_ref() {
                    if token == "moves" {
                        has_moves = true;
                        break;
                    }
                    parts.push(token);
                }
                parts.join(" ")
            }
            _ => STARTPOS_FEN.to_string(),
        };

        self.position = Position::new(&fen)?;
        self.history.clear();
        self.history.push(self.position.zobrist);

        if has_moves {
            for move_uci in tokens {
                let move_list = legal_moves(&mut self.position);
                let Some(&mov) = move_list.iter().find(|m| m.to_uci() == move_uci) else {
                    continue; // silently ignore invalid moves
                };

                self.position.apply_move(mov);
                self.history.push(self.position.zobrist);
            }
        }

        Ok(())
    }

    fn handle_setoption(&mut self, tokens: &mut SplitWhitespace) {
        // setoption name <id> value <x>
        if tokens.next() != Some("name") {
            return;
        }

        match tokens.next() {
            Some("Hash") => {
                if tokens.next() == Some("value")
                    && let Some(value) = tokens.next()
                    && let Ok(megabytes) = value.parse::<usize>()
                {
                    self.table = Arc::new(TranspositionTable::new(megabytes));
                }
            }
            _ => {}
        }
    }

    fn handle_go(&mut self, tokens: &mut SplitWhitespace) {
        let mut clock_time = ClockTime::default();
        let mut has_clock_time = false;
        let mut time_control = TimeControl::Infinite;

        while let Some(key) = tokens.next() {
            match key {
                "movetime" | "depth" | "wtime" | "btime" | "winc" | "binc" | "perft" => {
                    let Some(value) = tokens.next() else {
                        continue;
                    };
                    let Ok(value) = value.parse::<u64>() else {
                        continue;
                    };

                    match key {
                        "movetime" => time_control = TimeControl::MoveTime(value),
                        "depth" => time_control = TimeControl::Depth(value as usize),
                        "wtime" => {
                            has_clock_time = true;
                            clock_time.white_time_ms = value;
                        }
                        "btime" => {
                            has_clock_time = true;
                            clock_time.black_time_ms = value;
                        }
                        "winc" => clock_time.white_increment_ms = value,
                        "binc" => clock_time.black_increment_ms = value,
                        "perft" => {
                            send!(
                                "Nodes searched: {}",
                                divide(&mut self.position, value as usize)
                            );
                            return; // perft must not start a search
                        }
                        _ => unreachable!(),
                    }
                }
                "infinite" => time_control = TimeControl::Infinite,
                _ => {}
            }
        }

        if has_clock_time {
            time_control = TimeControl::ClockTime(clock_time);
        }

        let mut searcher = Searcher::new(
            self.position.clone(),
            self.history,
            &self.table,
            &self.stop,
            Box::new(UciSink),
        );

        self.worker = Some(std::thread::spawn(move || {
            match searcher.find_move(time_control, &[]) {
                Some(outcome) => send!("bestmove {}", outcome.best_move.to_uci()),
                None => send!("bestmove 0000"), // mated or stalemated
            }
        }));
    }

    /// returns true on `quit`
    fn execute_commands(&mut self, tokens: &mut SplitWhitespace) -> bool {
        match tokens.next() {
            Some("uci") => {
                send!("id name Basalt");
                send!("id author basalt developers");
                send!("option name Hash type spin default 16 min 1 max 1024");
                send!("uciok");
            }
            Some("debug") => {}
            Some("isready") => send!("readyok"),
            Some("setoption") => self.handle_setoption(tokens),
            Some("register") => send!("registration ok"),
            Some("ucinewgame") => {
                self.stop_and_join();

                self.position = Position::new(STARTPOS_FEN).unwrap();
                self.history.clear();
                self.history.push(self.position.zobrist);
                self.table = Arc::new(TranspositionTable::new(Self::DEFAULT_HASH_MB));
                self.worker = None;
            }
            Some("position") => {
                if let Err(e) = self.handle_position(tokens) {
                    send!("info string position error {e}");
                }
            }
            Some("go") => self.handle_go(tokens),
            Some("stop") => self.stop.store(true, Ordering::Relaxed),
            Some("quit") => {
                self.stop_and_join();
                return true;
            }
            Some("eval") => {
                send!("material: {:?}", self.position.material);
                send!("positional: {:?}", self.position.bonus);
                send!("phase: {}", self.position.phase);
                send!("static eval: {}", self.position.evaluate_for_side());
            }
            None => {}
            _ => send!("info string unknown command"),
        };

        false
    }

    pub fn run(&mut self) {
        let stdin = std::io::stdin();
        let mut input = String::new();

        loop {
            input.clear();
            if stdin.read_line(&mut input).is_err() {
                break;
            }
            if self.execute_commands(&mut input.split_whitespace()) {
                break;
            }
        }
    }
}

impl Default for Uci {
    fn default() -> Self {
        Self::new()
    }
}
