use std::collections::HashMap;

use ahash::RandomState as AHasher;
use dashmap::DashMap;

use crate::diagnostics::ScoreBreakdown;
use crate::engine::{Board, Move, Pos, Signature};
use crate::piece::{rank_of, Value};

const RIVER_WEIGHT: f64 = 0.1;
const ADJACENT_TIER_WEIGHT: f64 = 0.5;
const ADJACENT_ONE_TWO_BONUS: f64 = 1.0;
const OPENNESS_WEIGHT: f64 = 0.5;
const OPENNESS_FLOOR: f64 = 0.5;

/// Score `board`, reached by one move (plus spawn) from `previous`.
/// The total is the product of the factors; a stuck board scores 0.
pub(crate) fn score_breakdown(previous: &Board, board: &Board) -> ScoreBreakdown {
    let open_delta = board.open_cells() as f64 - previous.open_cells() as f64;
    ScoreBreakdown {
        base: board.points() as f64,
        moves: board.available_moves().len() as f64 / Move::ALL.len() as f64,
        river: 1.0 + RIVER_WEIGHT * river_length(board) as f64,
        adjacency: adjacency(board),
        openness: OPENNESS_WEIGHT * (open_delta + 1.0).max(OPENNESS_FLOOR),
    }
}

fn adjacency(board: &Board) -> f64 {
    let mut score = 1.0;
    let mut tier = board.max_piece_value();
    while tier >= 3 {
        if board.pieces_adjacent(tier, tier) {
            score *= 1.0 + ADJACENT_TIER_WEIGHT * rank_of(tier) as f64;
        }
        tier /= 2;
    }
    if board.pieces_adjacent(2, 1) {
        score *= 1.0 + ADJACENT_ONE_TWO_BONUS;
    }
    if board.pieces_adjacent(1, 2) {
        score *= 1.0 + ADJACENT_ONE_TWO_BONUS;
    }
    score
}

/// Longest chain max → max/2 → … (tiers ≥ 3) where each tier touches
/// the previous one. The maximum itself counts as one link.
pub(crate) fn river_length(board: &Board) -> usize {
    let max = board.max_piece_value();
    if max < 3 {
        return 0;
    }
    extend_river(board, max / 2, &board.positions_of(max), 1)
}

fn extend_river(board: &Board, tier: Value, frontier: &[Pos], length: usize) -> usize {
    if tier < 3 {
        return length;
    }
    let next: Vec<Pos> = frontier
        .iter()
        .flat_map(|pos| pos.neighbors())
        .filter(|&n| board.value_at(n) == Some(tier))
        .collect();
    if next.is_empty() {
        return length;
    }
    extend_river(board, tier / 2, &next, length + 1)
}

/// Memo of heuristic scores keyed by board signature.
///
/// `get_or_compute` reports whether `compute` ran, which is what search
/// statistics count.
pub trait ScoreCache {
    fn get_or_compute<F: FnOnce() -> f64>(&mut self, key: Signature, compute: F) -> (f64, bool);
}

impl<T: ScoreCache + ?Sized> ScoreCache for &mut T {
    #[inline]
    fn get_or_compute<F: FnOnce() -> f64>(&mut self, key: Signature, compute: F) -> (f64, bool) {
        (**self).get_or_compute(key, compute)
    }
}

pub type LocalCache = HashMap<Signature, f64, AHasher>;
pub type SharedCache = DashMap<Signature, f64, AHasher>;

impl ScoreCache for LocalCache {
    fn get_or_compute<F: FnOnce() -> f64>(&mut self, key: Signature, compute: F) -> (f64, bool) {
        if let Some(&score) = self.get(&key) {
            return (score, false);
        }
        let score = compute();
        self.insert(key, score);
        (score, true)
    }
}

impl ScoreCache for &SharedCache {
    fn get_or_compute<F: FnOnce() -> f64>(&mut self, key: Signature, compute: F) -> (f64, bool) {
        if let Some(score) = self.get(&key) {
            return (*score, false);
        }
        // The entry guard holds the shard lock, so each signature is computed once.
        let mut computed = false;
        let score = *self.entry(key).or_insert_with(|| {
            computed = true;
            compute()
        });
        (score, computed)
    }
}

/// Pass-through used when caching is switched off.
pub struct NoCache;

impl ScoreCache for NoCache {
    #[inline]
    fn get_or_compute<F: FnOnce() -> f64>(&mut self, _key: Signature, compute: F) -> (f64, bool) {
        (compute(), true)
    }
}
