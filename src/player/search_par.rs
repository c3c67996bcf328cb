use std::sync::Arc;

use rayon::prelude::*;

use crate::diagnostics::{DiagnosticSink, NullSink};
use crate::engine::Board;
use crate::piece::Piece;

use super::heuristic::{NoCache, SharedCache};
use super::tree::{Branch, TreeBuilder};
use super::{Search, SearchConfig, SearchStats, SearchTree};

/// Search that expands root directions on the rayon pool, sharing one
/// `DashMap` score cache across threads.
///
/// Tree shapes match [`super::SequentialSearch`]. Scores match too
/// unless the same board is reachable from different previous boards,
/// in which case whichever thread scores it first fills the cache.
pub struct ParallelSearch {
    cfg: SearchConfig,
    cache: SharedCache,
    sink: Arc<dyn DiagnosticSink>,
    stats: SearchStats,
}

impl ParallelSearch {
    pub fn new(cfg: SearchConfig) -> Self { Self::with_sink(cfg, Arc::new(NullSink)) }

    pub fn with_sink(cfg: SearchConfig, sink: Arc<dyn DiagnosticSink>) -> Self {
        Self { cfg, cache: SharedCache::default(), sink, stats: SearchStats::default() }
    }

    pub fn cache_len(&self) -> usize { self.cache.len() }
}

impl Default for ParallelSearch {
    fn default() -> Self { Self::new(SearchConfig::default()) }
}

impl Search for ParallelSearch {
    fn calculate_moves(&mut self, board: &Board, next: Piece, depth: u32) -> Option<SearchTree> {
        if depth == 0 {
            return None;
        }
        let cfg = &self.cfg;
        let cache = &self.cache;
        let sink = self.sink.as_ref();
        if let Some(tree) = TreeBuilder::new(cfg, NoCache, sink).early_game_tree(board) {
            self.stats = SearchStats::default();
            return Some(tree);
        }
        let results: Vec<(Branch, SearchStats)> = board
            .available_moves()
            .into_par_iter()
            .map(|dir| {
                if cfg.cache_enabled {
                    let mut builder = TreeBuilder::new(cfg, cache, sink);
                    (builder.expand(board, dir, depth, Some(next)), builder.stats)
                } else {
                    let mut builder = TreeBuilder::new(cfg, NoCache, sink);
                    (builder.expand(board, dir, depth, Some(next)), builder.stats)
                }
            })
            .collect();
        let mut stats = SearchStats::default();
        let mut branches = Vec::with_capacity(results.len());
        for (branch, branch_stats) in results {
            stats += branch_stats;
            branches.push(branch);
        }
        self.stats = stats;
        Some(SearchTree::new(branches))
    }

    fn score_board(&mut self, previous: &Board, board: &Board) -> f64 {
        let (score, stats) = if self.cfg.cache_enabled {
            let mut builder = TreeBuilder::new(&self.cfg, &self.cache, self.sink.as_ref());
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
