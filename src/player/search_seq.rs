use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::diagnostics::{DiagnosticSink, NullSink};
use crate::engine::{Board, Game, Move};
use crate::piece::{Piece, Points};

use super::heuristic::{LocalCache, NoCache};
use super::tree::{find_best_move, TreeBuilder};
use super::{describe_scores, Search, SearchConfig, SearchStats, SearchTree};

/// Single-threaded search with a score cache that lives as long as the
/// search itself.
pub struct SequentialSearch {
    cfg: SearchConfig,
    cache: LocalCache,
    sink: Arc<dyn DiagnosticSink>,
    stats: SearchStats,
}

impl SequentialSearch {
    pub fn new(cfg: SearchConfig) -> Self { Self::with_sink(cfg, Arc::new(NullSink)) }

    pub fn with_sink(cfg: SearchConfig, sink: Arc<dyn DiagnosticSink>) -> Self {
        Self { cfg, cache: LocalCache::default(), sink, stats: SearchStats::default() }
    }

    /// Number of distinct boards scored so far.
    pub fn cache_len(&self) -> usize { self.cache.len() }
}

impl Default for SequentialSearch {
    fn default() -> Self { Self::new(SearchConfig::default()) }
}

impl Search for SequentialSearch {
    fn calculate_moves(&mut self, board: &Board, next: Piece, depth: u32) -> Option<SearchTree> {
        let (tree, stats) = if self.cfg.cache_enabled {
            let mut builder = TreeBuilder::new(&self.cfg, &mut self.cache, self.sink.as_ref());
            (builder.calculate_moves(board, depth, Some(next)), builder.stats)
        } else {
            let mut builder = TreeBuilder::new(&self.cfg, NoCache, self.sink.as_ref());
            (builder.calculate_moves(board, depth, Some(next)), builder.stats)
        };
        self.stats = stats;
        tree
    }

    fn score_board(&mut self, previous: &Board, board: &Board) -> f64 {
        let (score, stats) = if self.cfg.cache_enabled {
            let mut builder = TreeBuilder::new(&self.cfg, &mut self.cache, self.sink.as_ref());
            (builder.score_board(previous, board), builder.stats)
        } else {
            let mut builder = TreeBuilder::new(&self.cfg, NoCache, self.sink.as_ref());
            (builder.score_board(previous, board), builder.stats)
        };
        self.stats += stats;
        score
    }

    fn config(&self) -> &SearchConfig { &self.cfg }

    fn last_stats(&self) -> SearchStats { self.stats }
}

/// Final tally of a finished game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameSummary {
    pub moves: u64,
    pub points: Points,
    pub max_value: u32,
}

/// Drives a live [`Game`] with a [`Search`]: decide, commit, repeat
/// until no direction changes the board.
pub struct Player<S: Search = SequentialSearch> {
    game: Game,
    search: S,
    rng: StdRng,
    moves_made: u64,
}

impl<S: Search> Player<S> {
    /// `tie_seed` seeds tie-breaking between equally scored directions.
    pub fn new(game: Game, search: S, tie_seed: Option<u64>) -> Self {
        let rng = match tie_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Player { game, search, rng, moves_made: 0 }
    }

    #[inline]
    pub fn game(&self) -> &Game { &self.game }

    #[inline]
    pub fn search(&self) -> &S { &self.search }

    #[inline]
    pub fn search_mut(&mut self) -> &mut S { &mut self.search }

    #[inline]
    pub fn moves_made(&self) -> u64 { self.moves_made }

    /// Search `depth` plies from the live board and pick a direction.
    /// None once the game is over.
    pub fn best_move(&mut self, depth: u32) -> Option<Move> {
        let next = self.game.next_piece_preview();
        let tree = self.search.calculate_moves(self.game.board(), next, depth)?;
        tracing::debug!(next = next.value(), scores = %describe_scores(&tree), "evaluated");
        find_best_move(&tree, &mut self.rng).map(|(dir, _)| dir)
    }

    /// Commit `dir` on the live board and count it.
    pub fn make_move(&mut self, dir: Move) -> bool {
        let moved = self.game.commit_slide(dir);
        if moved {
            self.moves_made += 1;
            let stats = self.search.last_stats();
            tracing::debug!(
                move_no = self.moves_made,
                %dir,
                points = self.game.points(),
                nodes = stats.nodes,
                evaluations = stats.evaluations,
                "move"
            );
        }
        moved
    }

    /// Play until the board is stuck, then report.
    pub fn decide_and_play(&mut self, depth: u32) -> GameSummary {
        while let Some(dir) = self.best_move(depth) {
            if !self.make_move(dir) {
                break;
            }
        }
        let summary = self.summary();
        tracing::info!(moves = summary.moves, points = summary.points, max = summary.max_value, "game over");
        summary
    }

    /// [`decide_and_play`](Self::decide_and_play) at the configured depth.
    pub fn play(&mut self) -> GameSummary {
        let depth = self.search.config().depth;
        self.decide_and_play(depth)
    }

    pub fn summary(&self) -> GameSummary {
        GameSummary {
            moves: self.moves_made,
            points: self.game.points(),
            max_value: self.game.board().max_piece_value(),
        }
    }
}
