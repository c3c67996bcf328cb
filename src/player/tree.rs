use rand::seq::SliceRandom;
use rand::Rng;

use crate::diagnostics::DiagnosticSink;
use crate::engine::{Board, Move};
use crate::piece::Piece;

use super::heuristic::{score_breakdown, ScoreCache};
use super::{SearchConfig, SearchStats};

/// Upcoming pieces assumed beyond the first ply, each equally likely.
const FUTURE_PIECES: [Piece; 3] = [Piece::new(1), Piece::new(2), Piece::new(3)];

/// Preferred order for the early-game shortcut.
const EARLY_GAME_ORDER: [Move; 4] = [Move::Up, Move::Left, Move::Right, Move::Down];

/// One scored hypothetical board.
#[derive(Debug, Clone)]
pub struct Outcome {
    pub score: f64,
    pub board: Board,
}

/// Everything explored under one direction at one node.
#[derive(Debug, Clone)]
pub struct Branch {
    pub dir: Move,
    pub outcomes: Vec<Outcome>,
    pub children: Vec<SearchTree>,
}

impl Branch {
    /// A leaf branch carrying bare scores (boards left empty).
    pub fn from_scores(dir: Move, scores: &[f64]) -> Self {
        Branch {
            dir,
            outcomes: scores.iter().map(|&score| Outcome { score, board: Board::default() }).collect(),
            children: Vec::new(),
        }
    }

    pub fn with_child(mut self, child: SearchTree) -> Self {
        self.children.push(child);
        self
    }

    /// Mean outcome score, 0 for a branch with no outcomes.
    pub fn average(&self) -> f64 {
        if self.outcomes.is_empty() {
            return 0.0;
        }
        self.outcomes.iter().map(|o| o.score).sum::<f64>() / self.outcomes.len() as f64
    }
}

/// A search node: at most one branch per direction.
#[derive(Debug, Clone, Default)]
pub struct SearchTree {
    pub branches: Vec<Branch>,
}

impl SearchTree {
    pub fn new(branches: Vec<Branch>) -> Self { SearchTree { branches } }

    #[inline]
    pub fn is_empty(&self) -> bool { self.branches.is_empty() }

    pub fn branch(&self, dir: Move) -> Option<&Branch> { self.branches.iter().find(|b| b.dir == dir) }

    /// Total outcomes across the whole tree.
    pub fn node_count(&self) -> usize {
        self.branches
            .iter()
            .map(|b| b.outcomes.len() + b.children.iter().map(SearchTree::node_count).sum::<usize>())
            .sum()
    }

    /// Best score reachable per direction at this node: its own average
    /// or anything better beneath it.
    pub fn effective_scores(&self) -> Vec<(Move, f64)> {
        self.branches
            .iter()
            .map(|branch| {
                let below = branch
                    .children
                    .iter()
                    .filter_map(|child| child.best_score())
                    .fold(f64::NEG_INFINITY, f64::max);
                (branch.dir, branch.average().max(below))
            })
            .collect()
    }

    fn best_score(&self) -> Option<f64> {
        self.effective_scores().into_iter().map(|(_, s)| s).reduce(f64::max)
    }
}

/// Pick the direction with the highest effective score, breaking exact
/// ties uniformly at random. None for an empty tree.
///
/// ```
/// use trois::engine::Move;
/// use trois::player::{find_best_move, Branch, SearchTree};
/// use rand::{rngs::StdRng, SeedableRng};
/// let tree = SearchTree::new(vec![
///     Branch::from_scores(Move::Left, &[10.0]),
///     Branch::from_scores(Move::Down, &[20.0]),
/// ]);
/// let mut rng = StdRng::seed_from_u64(0);
/// assert_eq!(find_best_move(&tree, &mut rng), Some((Move::Down, 20.0)));
/// ```
pub fn find_best_move<R: Rng + ?Sized>(tree: &SearchTree, rng: &mut R) -> Option<(Move, f64)> {
    let scored = tree.effective_scores();
    let max = scored.iter().map(|&(_, s)| s).reduce(f64::max)?;
    let tied: Vec<(Move, f64)> = scored.into_iter().filter(|&(_, s)| s == max).collect();
    tied.choose(rng).copied()
}

/// Builds search trees against one score cache.
pub(crate) struct TreeBuilder<'a, C: ScoreCache> {
    pub cfg: &'a SearchConfig,
    pub cache: C,
    pub sink: &'a dyn DiagnosticSink,
    pub stats: SearchStats,
}

impl<'a, C: ScoreCache> TreeBuilder<'a, C> {
    pub fn new(cfg: &'a SearchConfig, cache: C, sink: &'a dyn DiagnosticSink) -> Self {
        TreeBuilder { cfg, cache, sink, stats: SearchStats::default() }
    }

    /// Expand `board` to `depth` plies. `next` is the known upcoming piece
    /// on the first ply; deeper plies try 1, 2 and 3.
    pub fn calculate_moves(&mut self, board: &Board, depth: u32, next: Option<Piece>) -> Option<SearchTree> {
        if depth == 0 {
            return None;
        }
        if let Some(tree) = self.early_game_tree(board) {
            return Some(tree);
        }
        let branches = board
            .available_moves()
            .into_iter()
            .map(|dir| self.expand(board, dir, depth, next))
            .collect();
        Some(SearchTree::new(branches))
    }

    /// While the board is small, skip evaluation and take the first
    /// available of up, left, right, down.
    pub fn early_game_tree(&self, board: &Board) -> Option<SearchTree> {
        if board.max_piece_value() > self.cfg.early_game_max {
            return None;
        }
        let available = board.available_moves();
        let dir = EARLY_GAME_ORDER.into_iter().find(|dir| available.contains(dir))?;
        Some(SearchTree::new(vec![Branch::from_scores(dir, &[1.0])]))
    }

    /// Score every spawn of every candidate piece after sliding `dir`,
    /// recursing one ply deeper on each result.
    pub fn expand(&mut self, board: &Board, dir: Move, depth: u32, next: Option<Piece>) -> Branch {
        let slid = board.slide(dir);
        let lines = board.moved_lines(&slid, dir);
        let candidates: &[Piece] = match &next {
            Some(piece) => std::slice::from_ref(piece),
            None => &FUTURE_PIECES,
        };
        let mut branch = Branch { dir, outcomes: Vec::new(), children: Vec::new() };
        for piece in candidates {
            for &line in &lines {
                let mut spawned = slid.clone();
                spawned.add_piece(*piece, slid.spawn_pos(dir, line));
                let score = self.score_board(board, &spawned);
                if let Some(child) = self.calculate_moves(&spawned, depth - 1, None) {
                    branch.children.push(child);
                }
                branch.outcomes.push(Outcome { score, board: spawned });
            }
        }
        branch
    }

    /// Cached heuristic score of `board`. A cache hit skips the sink.
    pub fn score_board(&mut self, previous: &Board, board: &Board) -> f64 {
        self.stats.nodes += 1;
        let mut fresh = None;
        let (score, computed) = self.cache.get_or_compute(board.signature(), || {
            let breakdown = score_breakdown(previous, board);
            fresh = Some(breakdown);
            breakdown.total()
        });
        // recorded once the cache entry is released
        if let Some(breakdown) = fresh {
            self.sink.record(&breakdown);
        }
        if computed {
            self.stats.evaluations += 1;
        } else {
            self.stats.cache_hits += 1;
        }
        score
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;

    use crate::diagnostics::{NullSink, ScoreBreakdown};
    use crate::engine::{Pos, Signature};
    use crate::player::heuristic::LocalCache;
    use rand::{rngs::StdRng, SeedableRng};

    fn flat(left: &[f64], right: &[f64], up: &[f64], down: &[f64]) -> SearchTree {
        SearchTree::new(vec![
            Branch::from_scores(Move::Left, left),
            Branch::from_scores(Move::Right, right),
            Branch::from_scores(Move::Up, up),
            Branch::from_scores(Move::Down, down),
        ])
    }

    #[test]
    fn picks_single_highest_leaf() {
        let tree = flat(&[10.0], &[15.0], &[7.0], &[20.0]);
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(find_best_move(&tree, &mut rng), Some((Move::Down, 20.0)));
    }

    #[test]
    fn averages_sibling_outcomes() {
        let tree = flat(&[10.0, 20.0], &[25.0, 29.0], &[7.0, 17.0], &[20.0, 30.0]);
        let mut rng = StdRng::seed_from_u64(2);
        assert_eq!(find_best_move(&tree, &mut rng), Some((Move::Right, 27.0)));
    }

    #[test]
    fn deeper_scores_lift_their_root_direction() {
        let nested = SearchTree::new(vec![
            Branch::from_scores(Move::Left, &[5.0]),
            Branch::from_scores(Move::Down, &[50.0]),
        ]);
        let tree = SearchTree::new(vec![
            Branch::from_scores(Move::Left, &[10.0, 20.0]),
            Branch::from_scores(Move::Right, &[25.0, 29.0]),
            Branch::from_scores(Move::Up, &[7.0, 17.0]).with_child(nested),
            Branch::from_scores(Move::Down, &[20.0, 30.0]),
        ]);
        let mut rng = StdRng::seed_from_u64(3);
        assert_eq!(find_best_move(&tree, &mut rng), Some((Move::Up, 50.0)));
    }

    #[test]
    fn ties_are_broken_randomly() {
        let tree = flat(&[10.0], &[10.0], &[1.0], &[10.0]);
        let mut rng = StdRng::seed_from_u64(4);
        let mut seen = std::collections::HashSet::new();
        for _ in 0..200 {
            let (dir, score) = find_best_move(&tree, &mut rng).unwrap();
            assert_eq!(score, 10.0);
            seen.insert(dir);
        }
        assert_eq!(seen.len(), 3);
        assert!(!seen.contains(&Move::Up));
    }

    #[test]
    fn empty_tree_has_no_move() {
        let mut rng = StdRng::seed_from_u64(5);
        assert_eq!(find_best_move(&SearchTree::default(), &mut rng), None);
    }

    #[test]
    fn node_count_includes_children() {
        let tree = SearchTree::new(vec![
            Branch::from_scores(Move::Up, &[1.0, 2.0]).with_child(flat(&[1.0], &[1.0], &[1.0], &[1.0])),
        ]);
        assert_eq!(tree.node_count(), 6);
    }

    fn late_game_board() -> Board {
        let mut board = Board::default();
        for (pos, v) in [((0, 0), 96), ((1, 0), 48), ((2, 2), 1), ((3, 3), 2)] {
            board.add_piece(Piece::new(v), Pos::new(pos.0, pos.1));
        }
        board
    }

    #[test]
    fn early_game_prefers_up_then_left() {
        let cfg = SearchConfig::default();
        let sink = NullSink;
        let mut builder = TreeBuilder::new(&cfg, LocalCache::default(), &sink);
        let mut board = Board::default();
        board.add_piece(Piece::new(3), Pos::new(1, 1));
        let tree = builder.calculate_moves(&board, 3, Some(Piece::new(1))).unwrap();
        assert_eq!(tree.branches.len(), 1);
        assert_eq!(tree.branches[0].dir, Move::Up);
        assert_eq!(builder.stats.evaluations, 0);

        // top row only: up is blocked
        let mut top = Board::default();
        top.add_piece(Piece::new(3), Pos::new(1, 0));
        let tree = builder.calculate_moves(&top, 3, Some(Piece::new(1))).unwrap();
        assert_eq!(tree.branches[0].dir, Move::Left);
    }

    #[test]
    fn first_ply_uses_known_piece_then_all_three() {
        let cfg = SearchConfig::default();
        let sink = NullSink;
        let mut builder = TreeBuilder::new(&cfg, LocalCache::default(), &sink);
        let board = late_game_board();
        let tree = builder.calculate_moves(&board, 2, Some(Piece::new(3))).unwrap();
        assert_eq!(tree.branches.len(), board.available_moves().len());
        for branch in &tree.branches {
            let slid = board.slide(branch.dir);
            let lines = board.moved_lines(&slid, branch.dir).len();
            assert_eq!(branch.outcomes.len(), lines);
            assert_eq!(branch.children.len(), lines);
            for (outcome, child) in branch.outcomes.iter().zip(&branch.children) {
                assert_eq!(outcome.board.size(), slid.size() + 1);
                for sub in &child.branches {
                    let sub_slid = outcome.board.slide(sub.dir);
                    let sub_lines = outcome.board.moved_lines(&sub_slid, sub.dir).len();
                    assert_eq!(sub.outcomes.len(), 3 * sub_lines);
                    assert!(sub.children.is_empty());
                }
            }
        }
    }

    #[test]
    fn spawned_piece_sits_on_trailing_edge() {
        let cfg = SearchConfig::default();
        let sink = NullSink;
        let mut builder = TreeBuilder::new(&cfg, LocalCache::default(), &sink);
        let board = late_game_board();
        let branch = builder.expand(&board, Move::Down, 1, Some(Piece::new(3)));
        for outcome in &branch.outcomes {
            let top: Vec<_> = outcome.board.row(0);
            assert!(top.contains(&Some(3)));
        }
    }

    /// Cache that flags while a computation is in flight.
    struct FlaggingCache(Arc<AtomicBool>);

    impl ScoreCache for FlaggingCache {
        fn get_or_compute<F: FnOnce() -> f64>(&mut self, _key: Signature, compute: F) -> (f64, bool) {
            self.0.store(true, Ordering::SeqCst);
            let score = compute();
            self.0.store(false, Ordering::SeqCst);
            (score, true)
        }
    }

    struct OutsideCacheSink {
        busy: Arc<AtomicBool>,
        inside: AtomicUsize,
        outside: AtomicUsize,
    }

    impl DiagnosticSink for OutsideCacheSink {
        fn record(&self, _breakdown: &ScoreBreakdown) {
            let counter = if self.busy.load(Ordering::SeqCst) { &self.inside } else { &self.outside };
            counter.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn sink_runs_after_the_cache_is_released() {
        let busy = Arc::new(AtomicBool::new(false));
        let sink = OutsideCacheSink { busy: busy.clone(), inside: AtomicUsize::new(0), outside: AtomicUsize::new(0) };
        let cfg = SearchConfig::default();
        let mut builder = TreeBuilder::new(&cfg, FlaggingCache(busy), &sink);
        let tree = builder.calculate_moves(&late_game_board(), 2, Some(Piece::new(2))).unwrap();
        assert!(!tree.is_empty());
        assert_eq!(sink.inside.load(Ordering::SeqCst), 0);
        assert_eq!(sink.outside.load(Ordering::SeqCst) as u64, builder.stats.evaluations);
    }

    #[test]
    fn repeated_scoring_hits_the_cache() {
        let cfg = SearchConfig::default();
        let sink = NullSink;
        let mut builder = TreeBuilder::new(&cfg, LocalCache::default(), &sink);
        let previous = late_game_board();
        let board = previous.slide(Move::Down);
        let first = builder.score_board(&previous, &board);
        let second = builder.score_board(&previous, &board);
        assert_eq!(first, second);
        assert_eq!(builder.stats.evaluations, 1);
        assert_eq!(builder.stats.cache_hits, 1);
    }
}
