use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;

use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::EnvFilter;

use trois::diagnostics::{DiagnosticSink, JsonLinesSink, NullSink, TracingSink};
use trois::engine::Game;
use trois::player::{GameSummary, ParallelSearch, Player, PlayerConfig, Search, SearchConfig, SequentialSearch};

#[derive(Parser, Debug)]
#[command(name = "trois", about = "Let the search player work through games of Threes")]
struct Args {
    /// Plies searched per move
    #[arg(long, default_value_t = 3)]
    depth: u32,
    /// Seed for piece draws and tie-breaking (random if omitted)
    #[arg(long)]
    seed: Option<u64>,
    #[arg(long, default_value_t = 4)]
    cols: usize,
    #[arg(long, default_value_t = 4)]
    rows: usize,
    /// Number of games to play
    #[arg(long, default_value_t = 1)]
    games: u32,
    /// Expand root directions in parallel
    #[arg(long)]
    parallel: bool,
    /// Disable the score cache
    #[arg(long)]
    no_cache: bool,
    /// Append one JSON score breakdown per evaluated board to this file
    #[arg(long)]
    diagnostics: Option<PathBuf>,
    /// Emit score breakdowns as trace events
    #[arg(long, conflicts_with = "diagnostics")]
    trace_scores: bool,
    /// Don't print boards
    #[arg(long, short)]
    quiet: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let cfg = PlayerConfig {
        cols: args.cols,
        rows: args.rows,
        seed: args.seed,
        search: SearchConfig { depth: args.depth, cache_enabled: !args.no_cache, ..SearchConfig::default() },
    };
    if let Err(e) = cfg.validate() {
        eprintln!("Invalid configuration: {e}");
        return ExitCode::FAILURE;
    }

    let mut json_sink: Option<Arc<JsonLinesSink>> = None;
    let sink: Arc<dyn DiagnosticSink> = match &args.diagnostics {
        Some(path) => match JsonLinesSink::create(path) {
            Ok(s) => {
                let s = Arc::new(s);
                json_sink = Some(s.clone());
                s
            }
            Err(e) => {
                eprintln!("{e}");
                return ExitCode::FAILURE;
            }
        },
        None if args.trace_scores => Arc::new(TracingSink),
        None => Arc::new(NullSink),
    };

    let start = Instant::now();
    let summaries = if args.parallel {
        run_games(&args, &cfg, || ParallelSearch::with_sink(cfg.search.clone(), sink.clone()))
    } else {
        run_games(&args, &cfg, || SequentialSearch::with_sink(cfg.search.clone(), sink.clone()))
    };
    report(&summaries, start.elapsed().as_secs_f64());

    if let Some(s) = json_sink {
        s.flush();
        if s.failures() > 0 {
            tracing::warn!(failures = s.failures(), "some score breakdowns were not written");
        }
    }
    ExitCode::SUCCESS
}

fn run_games<S, F>(args: &Args, cfg: &PlayerConfig, make_search: F) -> Vec<GameSummary>
where
    S: Search,
    F: Fn() -> S,
{
    let show_boards = !args.quiet && args.games == 1;
    let pb = if args.games > 1 && !args.quiet {
        let pb = ProgressBar::new(args.games as u64);
        if let Ok(style) = ProgressStyle::with_template("{bar:40} {pos}/{len} games | {elapsed_precise} | {msg}") {
            pb.set_style(style);
        }
        Some(pb)
    } else {
        None
    };

    let mut summaries = Vec::with_capacity(args.games as usize);
    for i in 0..args.games {
        // distinct but reproducible seeds per game
        let seed = cfg.seed.map(|s| s.wrapping_add(2 * i as u64));
        let game = Game::new(cfg.cols, cfg.rows, seed);
        let mut player = Player::new(game, make_search(), seed.map(|s| s.wrapping_add(1)));
        let summary = if show_boards { play_verbose(&mut player) } else { player.play() };
        if let Some(pb) = &pb {
            pb.inc(1);
            pb.set_message(format!("last: {} pts", summary.points));
        }
        summaries.push(summary);
    }
    if let Some(pb) = pb {
        pb.finish_and_clear();
    }
    summaries
}

fn play_verbose<S: Search>(player: &mut Player<S>) -> GameSummary {
    let depth = player.search().config().depth;
    println!("{}", player.game().board());
    while let Some(dir) = player.best_move(depth) {
        if !player.make_move(dir) {
            break;
        }
        println!("Move {}: {}\n{}", player.moves_made(), dir, player.game().board());
    }
    player.summary()
}

fn report(summaries: &[GameSummary], elapsed_s: f64) {
    if summaries.is_empty() {
        return;
    }
    let total_moves: u64 = summaries.iter().map(|s| s.moves).sum();
    let best = summaries.iter().map(|s| s.points).max().unwrap_or(0);
    let mean = summaries.iter().map(|s| s.points as f64).sum::<f64>() / summaries.len() as f64;
    if let [only] = summaries {
        println!("Final score: {} pts", only.points);
        println!("Made {} moves", only.moves);
    } else {
        let mut tiles: Vec<u32> = summaries.iter().map(|s| s.max_value).collect();
        tiles.sort_unstable();
        tiles.dedup();
        println!("Games: {}, mean points: {:.1}, best: {}", summaries.len(), mean, best);
        for tile in tiles.iter().rev() {
            let n = summaries.iter().filter(|s| s.max_value == *tile).count();
            println!("  max tile {:>5}: {:>4} games", tile, n);
        }
    }
    println!("Moves made: {}, elapsed: {:.1}s ({:.1} moves/sec)", total_moves, elapsed_s, total_moves as f64 / elapsed_s.max(1e-6));
}
