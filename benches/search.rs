use criterion::{criterion_group, criterion_main, Criterion};
use rayon::ThreadPoolBuilder;
use std::hint::black_box;
use trois::engine::{Board, Game};
use trois::piece::Piece;
use trois::player::{ParallelSearch, Player, Search, SearchConfig, SequentialSearch};

/// Late-game boards: past the early-game shortcut so the full search runs.
fn corpus() -> Vec<Board> {
    let game = Game::new(4, 4, Some(7777));
    let cfg = SearchConfig { depth: 1, ..SearchConfig::default() };
    let mut player = Player::new(game, SequentialSearch::new(cfg.clone()), Some(7777));
    let mut boards = Vec::new();
    while let Some(dir) = player.best_move(1) {
        player.make_move(dir);
        let board = player.game().board();
        if board.max_piece_value() > cfg.early_game_max {
            boards.push(board.clone());
        }
    }
    boards
}

fn bench_calculate_moves(c: &mut Criterion) {
    let boards = corpus();
    c.bench_function("search_seq/depth2_cold", |bch| {
        bch.iter(|| {
            let mut search = SequentialSearch::default();
            let mut acc = 0usize;
            for bd in &boards {
                if let Some(tree) = search.calculate_moves(bd, Piece::new(2), 2) {
                    acc += tree.node_count();
                }
            }
            black_box(acc)
        })
    });

    let pool = ThreadPoolBuilder::new().num_threads(4).build().unwrap();
    c.bench_function("search_par/depth2_cold", |bch| {
        bch.iter(|| {
            pool.install(|| {
                let mut search = ParallelSearch::default();
                let mut acc = 0usize;
                for bd in &boards {
                    if let Some(tree) = search.calculate_moves(bd, Piece::new(2), 2) {
                        acc += tree.node_count();
                    }
                }
                black_box(acc)
            })
        })
    });
}

#[cfg(feature = "bench-internal")]
fn bench_heuristic(c: &mut Criterion) {
    let boards = corpus();
    c.bench_function("heuristic/breakdown", |bch| {
        bch.iter(|| {
            let mut acc = 0f64;
            for pair in boards.windows(2) {
                acc += trois::player::heuristic_breakdown(&pair[0], &pair[1]).total();
            }
            black_box(acc)
        })
    });
}

#[cfg(not(feature = "bench-internal"))]
fn bench_heuristic(_c: &mut Criterion) {}

fn bench_e2e(c: &mut Criterion) {
    c.bench_function("e2e_seq/64_moves_depth2", |bch| {
        bch.iter(|| {
            let mut player = Player::new(Game::new(4, 4, Some(13)), SequentialSearch::default(), Some(13));
            let mut steps = 0;
            while steps < 64 {
                match player.best_move(2) {
                    Some(dir) => {
                        player.make_move(dir);
                    }
                    None => break,
                }
                steps += 1;
            }
            black_box((player.game().points(), steps))
        })
    });
}

criterion_group!(search, bench_calculate_moves, bench_heuristic, bench_e2e);
criterion_main!(search);
