//! Lookahead search player.
//!
//! The player expands every available slide, every spawn of the upcoming
//! piece and (past the first ply) every spawn of a 1, 2 or 3, scores the
//! resulting boards with a multiplicative heuristic and commits the
//! direction with the best average-or-deeper score.
//!
//! Two searches share the same tree shape and decision rule:
//! - [`SequentialSearch`]: single-threaded, `HashMap` score cache.
//! - [`ParallelSearch`]: rayon across root directions, `DashMap` score cache.
//!
//! Quick start
//! ```
//! use trois::engine::Game;
//! use trois::player::{Player, SequentialSearch, SearchConfig};
//!
//! let game = Game::new(4, 4, Some(42));
//! let mut player = Player::new(game, SequentialSearch::new(SearchConfig::default()), Some(42));
//! let summary = player.decide_and_play(1);
//! assert!(!player.game().playing());
//! assert_eq!(summary.points, player.game().points());
//! ```

use std::ops::AddAssign;

use crate::engine::{Board, Game};
use crate::piece::{Piece, Value};
use crate::stack::WILD_THRESHOLD;

mod heuristic;
mod search_par;
mod search_seq;
mod tree;

pub use search_par::ParallelSearch;
pub use search_seq::{GameSummary, Player, SequentialSearch};
pub use tree::{find_best_move, Branch, Outcome, SearchTree};

pub const DEFAULT_DEPTH: u32 = 3;
/// Largest supported side length.
pub const MAX_SIDE: usize = 16;

/// Knobs for the search.
///
/// - `depth`: plies to expand per decision.
/// - `early_game_max`: while the board maximum is at most this, skip
///   evaluation and follow the fixed up/left/right/down preference.
/// - `cache_enabled`: memoize heuristic scores by board signature.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    pub depth: u32,
    pub early_game_max: Value,
    pub cache_enabled: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self { depth: DEFAULT_DEPTH, early_game_max: WILD_THRESHOLD, cache_enabled: true }
    }
}

impl SearchConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.depth == 0 {
            return Err(ConfigError::ZeroDepth);
        }
        Ok(())
    }
}

/// Everything needed to start a game and a player.
#[derive(Debug, Clone)]
pub struct PlayerConfig {
    pub cols: usize,
    pub rows: usize,
    pub seed: Option<u64>,
    pub search: SearchConfig,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            cols: crate::engine::DEFAULT_COLS,
            rows: crate::engine::DEFAULT_ROWS,
            seed: None,
            search: SearchConfig::default(),
        }
    }
}

impl PlayerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for side in [self.cols, self.rows] {
            if !(2..=MAX_SIDE).contains(&side) {
                return Err(ConfigError::BoardSize { cols: self.cols, rows: self.rows });
            }
        }
        self.search.validate()
    }
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("search depth must be at least 1")]
    ZeroDepth,
    #[error("board must be between 2x2 and {max}x{max}, got {cols}x{rows}", max = MAX_SIDE)]
    BoardSize { cols: usize, rows: usize },
}

/// Counters for the last search.
///
/// `evaluations` counts heuristic computations; `cache_hits` counts
/// scores served from the cache instead.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchStats {
    pub nodes: u64,
    pub evaluations: u64,
    pub cache_hits: u64,
}

impl AddAssign for SearchStats {
    fn add_assign(&mut self, rhs: Self) {
        self.nodes += rhs.nodes;
        self.evaluations += rhs.evaluations;
        self.cache_hits += rhs.cache_hits;
    }
}

/// A tree-building search. Implementations own their score cache for
/// their whole lifetime.
pub trait Search {
    /// Expand `board` to `depth` plies, `next` being the known upcoming
    /// piece. None when `depth` is 0.
    fn calculate_moves(&mut self, board: &Board, next: Piece, depth: u32) -> Option<SearchTree>;

    /// Cached heuristic score for `board`, reached from `previous`.
    fn score_board(&mut self, previous: &Board, board: &Board) -> f64;

    /// Settings this search was built with; `depth` is the default for
    /// [`Player::play`].
    fn config(&self) -> &SearchConfig;

    fn last_stats(&self) -> SearchStats;
}

/// Per-direction best scores, for logging.
pub(crate) fn describe_scores(tree: &SearchTree) -> String {
    tree.effective_scores()
        .iter()
        .map(|(dir, score)| format!("{dir}={score:.2}"))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Bench-only: the uncached heuristic breakdown.
///
/// Enabled only with the `bench-internal` feature to keep the public API small.
#[cfg(feature = "bench-internal")]
#[inline]
pub fn heuristic_breakdown(previous: &Board, board: &Board) -> crate::diagnostics::ScoreBreakdown {
    heuristic::score_breakdown(previous, board)
}

/// Build a player from configuration.
pub fn player_from_config(cfg: &PlayerConfig) -> Result<Player<SequentialSearch>, ConfigError> {
    cfg.validate()?;
    let game = Game::new(cfg.cols, cfg.rows, cfg.seed);
    let tie_seed = cfg.seed.map(|s| s.wrapping_add(1));
    Ok(Player::new(game, SequentialSearch::new(cfg.search.clone()), tie_seed))
}

/// Like [`player_from_config`] with the parallel search.
pub fn parallel_player_from_config(cfg: &PlayerConfig) -> Result<Player<ParallelSearch>, ConfigError> {
    cfg.validate()?;
    let game = Game::new(cfg.cols, cfg.rows, cfg.seed);
    let tie_seed = cfg.seed.map(|s| s.wrapping_add(1));
    Ok(Player::new(game, ParallelSearch::new(cfg.search.clone()), tie_seed))
}
